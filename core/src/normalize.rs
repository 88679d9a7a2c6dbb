//! Normalisering av lagrede datasett på tvers av skjemaversjoner.
//!
//! Lagrede dokumenter finnes i to former:
//! - ny: `{ name, entriesBySport: { run, swim, bike }, entries? }`
//! - legacy (før flere idretter): `{ name, entries }`
//!
//! Formen avgjøres én gang i `RawShape::decode`; all forretningslogikk ser
//! bare det kanoniske `Dataset`.

use serde_json::{Map, Value};

use crate::models::{Dataset, EntriesBySport, Entry, Sport};

#[derive(Debug, Clone, Copy)]
pub enum RawShape<'a> {
    /// `entriesBySport` finnes (kan fortsatt være korrupt inni)
    Current {
        name: Option<&'a Value>,
        by_sport: &'a Value,
    },
    /// Objekt uten `entriesBySport`
    Legacy {
        name: Option<&'a Value>,
        entries: Option<&'a Value>,
    },
    /// Ikke et objekt (null, tall, streng …)
    Empty,
}

impl<'a> RawShape<'a> {
    pub fn decode(raw: &'a Value) -> RawShape<'a> {
        match raw.as_object() {
            Some(obj) => RawShape::from_map(obj),
            None => RawShape::Empty,
        }
    }

    pub fn from_map(obj: &'a Map<String, Value>) -> RawShape<'a> {
        match obj.get("entriesBySport") {
            Some(by) if is_truthy(by) => RawShape::Current {
                name: obj.get("name"),
                by_sport: by,
            },
            _ => RawShape::Legacy {
                name: obj.get("name"),
                entries: obj.get("entries"),
            },
        }
    }
}

/// `false`, `0`, `""` og `null` teller som fraværende.
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |x| x != 0.0 && !x.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Rådata → kanonisk datasett. Ren og total: feilformet input gir tomme standardverdier.
pub fn normalize(raw: &Value) -> Dataset {
    normalize_shape(RawShape::decode(raw))
}

pub fn normalize_document(doc: &Map<String, Value>) -> Dataset {
    normalize_shape(RawShape::from_map(doc))
}

fn normalize_shape(shape: RawShape<'_>) -> Dataset {
    match shape {
        RawShape::Current { name, by_sport } => {
            let mut by = EntriesBySport::default();
            for sport in Sport::ALL {
                *by.get_mut(sport) = decode_entries(by_sport.get(sport.key()));
            }
            Dataset {
                name: decode_name(name),
                entries_by_sport: by,
            }
        }
        RawShape::Legacy { name, entries } => Dataset {
            name: decode_name(name),
            entries_by_sport: EntriesBySport {
                run: decode_entries(entries),
                ..EntriesBySport::default()
            },
        },
        RawShape::Empty => Dataset::default(),
    }
}

fn decode_name(v: Option<&Value>) -> String {
    v.and_then(Value::as_str).unwrap_or("").trim().to_string()
}

/// Array → økter; alt annet → tom liste. Elementer uten dato hoppes over.
pub fn decode_entries(v: Option<&Value>) -> Vec<Entry> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(Entry::from_value).collect(),
        _ => Vec::new(),
    }
}

/// Det merge-operasjonen leser fra en lagring: normalisert datasett
/// pluss den rå legacy-listen `entries`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub dataset: Dataset,
    pub legacy: Vec<Entry>,
}

impl Snapshot {
    pub fn from_value(raw: &Value) -> Snapshot {
        Snapshot {
            dataset: normalize(raw),
            legacy: decode_entries(raw.get("entries")),
        }
    }

    pub fn from_document(doc: &Map<String, Value>) -> Snapshot {
        Snapshot {
            dataset: normalize_document(doc),
            legacy: decode_entries(doc.get("entries")),
        }
    }

    /// Legacy + alle idretter. Null betyr "ingenting å flette".
    pub fn total_entries(&self) -> usize {
        self.legacy.len() + self.dataset.total_entries()
    }
}
