// core/src/firestore.rs
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use serde_path_to_error as spte;
use ureq::Agent;

use crate::config::FirestoreConfig;
use crate::error::StoreError;
use crate::storage::{Document, DocumentStore, UpsertOptions};

/// Firestore REST-klient – enkel blocking-versjon (ureq)
///
/// Lesing: `GET …/documents/{path}`. Skriving: én `documents:commit` med
/// `updateMask` (merge) og `REQUEST_TIME`-transform for tidsstempelet, slik at
/// hele upserten er én atomisk skriving.
pub struct FirestoreRestStore {
    agent: Agent,
    config: FirestoreConfig,
}

#[derive(Debug, Deserialize)]
struct FsDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreRestStore {
    pub fn new(config: FirestoreConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self { agent, config }
    }

    pub fn set_id_token(&mut self, token: Option<String>) {
        self.config.id_token = token;
    }

    fn doc_name(&self, path: &str) -> String {
        format!("{}/{}", self.config.documents_root(), path.trim_matches('/'))
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let req = self.agent.request(method, url);
        match &self.config.id_token {
            Some(t) => req.set("Authorization", &format!("Bearer {t}")),
            None => req,
        }
    }
}

fn status_error(code: u16, resp: ureq::Response) -> StoreError {
    StoreError::Http {
        status: code,
        body: resp.into_string().unwrap_or_default(),
    }
}

impl DocumentStore for FirestoreRestStore {
    fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let url = format!("{}/{}", self.config.base_url, self.doc_name(path));
        debug!("[Firestore] GET {}", url);

        match self.request("GET", &url).call() {
            Ok(resp) => {
                let text = resp.into_string()?;
                decode_document(&text).map(Some)
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(code, resp)) => Err(status_error(code, resp)),
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }

    fn upsert(&self, path: &str, fields: Document, opts: &UpsertOptions) -> Result<(), StoreError> {
        let url = format!("{}/{}:commit", self.config.base_url, self.config.documents_root());
        let body = commit_body(&self.doc_name(path), &fields, opts);
        debug!("[Firestore] commit {} ({} fields)", path, fields.len());

        match self.request("POST", &url).send_json(body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => Err(status_error(code, resp)),
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }
}

/// Dokument-JSON fra REST → vanlige felt.
pub fn decode_document(text: &str) -> Result<Document, StoreError> {
    let mut de = serde_json::Deserializer::from_str(text);
    let doc: FsDocument = spte::deserialize(&mut de).map_err(|e| StoreError::Decode {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })?;
    Ok(doc
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), from_firestore_value(v)))
        .collect())
}

/// Body for `documents:commit` med én skriving.
pub fn commit_body(doc_name: &str, fields: &Document, opts: &UpsertOptions) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), to_firestore_value(v)))
        .collect();

    let mut write = json!({
        "update": { "name": doc_name, "fields": encoded },
    });
    if opts.merge {
        let paths: Vec<String> = fields.keys().map(|k| quote_field_path(k)).collect();
        write["updateMask"] = json!({ "fieldPaths": paths });
    }
    if let Some(ts) = &opts.server_timestamp {
        write["updateTransforms"] = json!([
            { "fieldPath": quote_field_path(ts), "setToServerValue": "REQUEST_TIME" }
        ]);
    }
    json!({ "writes": [write] })
}

/// Enkle navn brukes som de er; alt annet må i backticks.
fn quote_field_path(key: &str) -> String {
    let mut chars = key.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

pub fn to_firestore_value(v: &Value) -> Value {
    match v {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(m) => {
            let fields: Map<String, Value> = m
                .iter()
                .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

pub fn from_firestore_value(v: &Value) -> Value {
    let Some(obj) = v.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.as_bool().map(Value::Bool).unwrap_or(Value::Null),
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            Value::Number(_) => inner.clone(),
            _ => Value::Null,
        },
        // NaN/Infinity kommer som strenger og har ingen JSON-form
        "doubleValue" => match inner {
            Value::Number(_) => inner.clone(),
            _ => Value::Null,
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(from_firestore_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|fs| {
                    fs.iter()
                        .map(|(k, v)| (k.clone(), from_firestore_value(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}
