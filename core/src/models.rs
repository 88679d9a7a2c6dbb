use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::pace::to_num;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Felles metrikker for alle idretter, i signatur-rekkefølge.
pub const COMMON_FIELDS: [&str; 9] = [
    "dist", "avgPace", "maxPace", "avgHR", "maxHR", "avgPower", "maxPower", "avgCad", "maxCad",
];
pub const RUN_FIELDS: [&str; 4] = ["stride", "gct", "vRatio", "vOsc"];
pub const SWIM_FIELDS: [&str; 3] = ["totalStrokes", "avgStrokeRate", "avgSwolf"];
pub const BIKE_FIELDS: [&str; 4] = ["avgBR", "minBR", "maxBR", "totalPedalStrokes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Run,
    Swim,
    Bike,
}

impl Sport {
    pub const ALL: [Sport; 3] = [Sport::Run, Sport::Swim, Sport::Bike];

    pub fn key(self) -> &'static str {
        match self {
            Sport::Run => "run",
            Sport::Swim => "swim",
            Sport::Bike => "bike",
        }
    }

    /// Idrettsspesifikke felt som kommer etter `COMMON_FIELDS` i signaturen.
    pub fn specific_fields(self) -> &'static [&'static str] {
        match self {
            Sport::Run => &RUN_FIELDS,
            Sport::Swim => &SWIM_FIELDS,
            Sport::Bike => &BIKE_FIELDS,
        }
    }
}

/// Én treningsøkt. Alle metrikker er valgfrie; `None` = ukjent.
///
/// Ukjente nøkler fra lagringen bevares i `extra` slik at nyere klienters
/// felt overlever en runde gjennom motoren.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<f64>, // km
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_pace: Option<f64>, // sek per enhet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pace: Option<f64>,
    #[serde(rename = "avgHR", skip_serializing_if = "Option::is_none")]
    pub avg_hr: Option<f64>, // bpm
    #[serde(rename = "maxHR", skip_serializing_if = "Option::is_none")]
    pub max_hr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_power: Option<f64>, // watt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_cad: Option<f64>, // rpm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cad: Option<f64>,

    // løping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stride: Option<f64>, // cm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gct: Option<f64>, // ms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_ratio: Option<f64>, // %
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_osc: Option<f64>, // cm

    // svømming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_strokes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_stroke_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_swolf: Option<f64>,

    // sykling
    #[serde(rename = "avgBR", skip_serializing_if = "Option::is_none")]
    pub avg_br: Option<f64>,
    #[serde(rename = "minBR", skip_serializing_if = "Option::is_none")]
    pub min_br: Option<f64>,
    #[serde(rename = "maxBR", skip_serializing_if = "Option::is_none")]
    pub max_br: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pedal_strokes: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    /// Tolerant dekoding av ett lagret element.
    ///
    /// Returnerer `None` hvis elementet ikke er et objekt eller mangler dato.
    /// Tall som strenger godtas. Metrikkverdier som ikke kan leses som tall
    /// (f.eks. `"5:30"`) blir liggende urørt i `extra` så de ikke går tapt
    /// når dokumentet skrives tilbake.
    pub fn from_value(v: &Value) -> Option<Entry> {
        let obj = v.as_object()?;
        let date = obj.get("date")?.as_str()?.trim();
        if date.is_empty() {
            return None;
        }

        let mut entry = Entry::new(date);
        for (key, val) in obj {
            if key == "date" {
                continue;
            }
            let parsed = numeric(val);
            let known = entry.set_metric(key, parsed);
            if !known || (parsed.is_none() && !val.is_null()) {
                entry.extra.insert(key.clone(), val.clone());
            }
        }
        Some(entry)
    }

    /// Metrikk etter lagringsnavn (`"avgHR"`, `"vOsc"` …).
    pub fn metric(&self, key: &str) -> Option<f64> {
        match key {
            "dist" => self.dist,
            "avgPace" => self.avg_pace,
            "maxPace" => self.max_pace,
            "avgHR" => self.avg_hr,
            "maxHR" => self.max_hr,
            "avgPower" => self.avg_power,
            "maxPower" => self.max_power,
            "avgCad" => self.avg_cad,
            "maxCad" => self.max_cad,
            "stride" => self.stride,
            "gct" => self.gct,
            "vRatio" => self.v_ratio,
            "vOsc" => self.v_osc,
            "totalStrokes" => self.total_strokes,
            "avgStrokeRate" => self.avg_stroke_rate,
            "avgSwolf" => self.avg_swolf,
            "avgBR" => self.avg_br,
            "minBR" => self.min_br,
            "maxBR" => self.max_br,
            "totalPedalStrokes" => self.total_pedal_strokes,
            _ => None,
        }
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<f64>> {
        let slot = match key {
            "dist" => &mut self.dist,
            "avgPace" => &mut self.avg_pace,
            "maxPace" => &mut self.max_pace,
            "avgHR" => &mut self.avg_hr,
            "maxHR" => &mut self.max_hr,
            "avgPower" => &mut self.avg_power,
            "maxPower" => &mut self.max_power,
            "avgCad" => &mut self.avg_cad,
            "maxCad" => &mut self.max_cad,
            "stride" => &mut self.stride,
            "gct" => &mut self.gct,
            "vRatio" => &mut self.v_ratio,
            "vOsc" => &mut self.v_osc,
            "totalStrokes" => &mut self.total_strokes,
            "avgStrokeRate" => &mut self.avg_stroke_rate,
            "avgSwolf" => &mut self.avg_swolf,
            "avgBR" => &mut self.avg_br,
            "minBR" => &mut self.min_br,
            "maxBR" => &mut self.max_br,
            "totalPedalStrokes" => &mut self.total_pedal_strokes,
            _ => return None,
        };
        Some(slot)
    }

    pub fn set_metric(&mut self, key: &str, value: Option<f64>) -> bool {
        match self.slot_mut(key) {
            Some(slot) => {
                *slot = value.filter(|v| v.is_finite());
                // en ny verdi erstatter rå tekst som lå igjen fra dekoding
                self.extra.remove(key);
                true
            }
            None => false,
        }
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => to_num(s),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Entry::from_value(&v)
            .ok_or_else(|| serde::de::Error::custom("entry must be an object with a non-empty date"))
    }
}

/// Sorter stigende på dato. Stabil: like datoer beholder innsettingsrekkefølgen,
/// uleselige datoer havner sist.
pub fn sort_by_date(entries: &mut [Entry]) {
    entries.sort_by(|a, b| match (a.parsed_date(), b.parsed_date()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntriesBySport {
    #[serde(default)]
    pub run: Vec<Entry>,
    #[serde(default)]
    pub swim: Vec<Entry>,
    #[serde(default)]
    pub bike: Vec<Entry>,
}

impl EntriesBySport {
    pub fn get(&self, sport: Sport) -> &[Entry] {
        match sport {
            Sport::Run => &self.run,
            Sport::Swim => &self.swim,
            Sport::Bike => &self.bike,
        }
    }

    pub fn get_mut(&mut self, sport: Sport) -> &mut Vec<Entry> {
        match sport {
            Sport::Run => &mut self.run,
            Sport::Swim => &mut self.swim,
            Sport::Bike => &mut self.bike,
        }
    }

    pub fn total(&self) -> usize {
        self.run.len() + self.swim.len() + self.bike.len()
    }
}

/// Kanonisk datasett: navn + økter per idrett.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entries_by_sport: EntriesBySport,
}

impl Dataset {
    pub fn total_entries(&self) -> usize {
        self.entries_by_sport.total()
    }

    /// Lagringsform: `name`, `entriesBySport` og legacy `entries` (= run).
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("name".into(), Value::String(self.name.clone()));
        doc.insert("entries".into(), entries_value(&self.entries_by_sport.run));
        doc.insert("entriesBySport".into(), by_sport_value(&self.entries_by_sport));
        doc
    }
}

pub(crate) fn entries_value(entries: &[Entry]) -> Value {
    Value::Array(
        entries
            .iter()
            .filter_map(|e| serde_json::to_value(e).ok())
            .collect(),
    )
}

pub(crate) fn by_sport_value(by: &EntriesBySport) -> Value {
    let mut m = Map::new();
    for sport in Sport::ALL {
        m.insert(sport.key().to_string(), entries_value(by.get(sport)));
    }
    Value::Object(m)
}

/// Innlogget bruker slik auth-laget leverer den.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Visningsnavn → lokal del av e-post → tom streng.
    pub fn fallback_name(&self) -> String {
        if let Some(d) = self.display_name.as_deref().filter(|d| !d.trim().is_empty()) {
            return d.trim().to_string();
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .unwrap_or("")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_decodes_tolerantly_and_keeps_unknown_fields() {
        let v = json!({
            "date": "2024-03-01",
            "avgPace": 300,
            "avgHR": "150",
            "maxHR": true,
            "note": "easy"
        });
        let e = Entry::from_value(&v).unwrap();
        assert_eq!(e.avg_pace, Some(300.0));
        assert_eq!(e.avg_hr, Some(150.0));
        assert_eq!(e.max_hr, None);
        assert_eq!(e.extra.get("note"), Some(&json!("easy")));

        let back = serde_json::to_value(&e).unwrap();
        assert_eq!(back["avgHR"], json!(150.0));
        assert_eq!(back["note"], json!("easy"));
        assert_eq!(back["maxHR"], json!(true));
    }

    #[test]
    fn unreadable_metric_text_survives_round_trip() {
        let v = json!({ "date": "2024-03-01", "avgPace": "5:30", "maxPace": null });
        let mut e = Entry::from_value(&v).unwrap();
        assert_eq!(e.avg_pace, None);

        let back = serde_json::to_value(&e).unwrap();
        assert_eq!(back["avgPace"], json!("5:30"));
        assert!(back.get("maxPace").is_none());

        e.set_metric("avgPace", Some(330.0));
        assert!(e.extra.get("avgPace").is_none());
        assert_eq!(serde_json::to_value(&e).unwrap()["avgPace"], json!(330.0));
    }

    #[test]
    fn entry_without_date_is_rejected() {
        assert!(Entry::from_value(&json!({"avgPace": 300})).is_none());
        assert!(Entry::from_value(&json!({"date": "  "})).is_none());
        assert!(Entry::from_value(&json!("2024-01-01")).is_none());
    }

    #[test]
    fn sort_is_stable_and_puts_bad_dates_last() {
        let mut es = vec![
            Entry::new("junk"),
            Entry::new("2024-02-01"),
            Entry { avg_hr: Some(1.0), ..Entry::new("2024-01-01") },
            Entry { avg_hr: Some(2.0), ..Entry::new("2024-01-01") },
        ];
        sort_by_date(&mut es);
        let dates: Vec<_> = es.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, ["2024-01-01", "2024-01-01", "2024-02-01", "junk"]);
        assert_eq!(es[0].avg_hr, Some(1.0));
    }

    #[test]
    fn identity_fallback_name() {
        let mut id = Identity::new("u1");
        assert_eq!(id.fallback_name(), "");
        id.email = Some("kari@example.com".into());
        assert_eq!(id.fallback_name(), "kari");
        id.display_name = Some("Kari N".into());
        assert_eq!(id.fallback_name(), "Kari N");
    }
}
