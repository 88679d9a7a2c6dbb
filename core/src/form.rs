use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::DraftError;
use crate::models::{sort_by_date, Entry, DATE_FORMAT};
use crate::pace::{parse_pace, to_num};

/// Felt som skrives inn som `mm:ss` i skjemaet.
pub const PACE_FIELDS: [&str; 2] = ["avgPace", "maxPace"];

/// Én skjemarad slik brukeren skrev den inn (rå tekst per felt).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub date: String,
    /// lagringsnavn (`"avgHR"`, `"dist"` …) → tekst
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl EntryDraft {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, text: &str) -> Self {
        self.fields.insert(key.to_string(), text.to_string());
        self
    }

    /// Pace via `parse_pace`, alt annet via `to_num`. Tomme/uleselige felt blir `None`.
    pub fn into_entry(self) -> Result<Entry, DraftError> {
        let date = self.date.trim();
        if date.is_empty() {
            return Err(DraftError::MissingDate);
        }
        if NaiveDate::parse_from_str(date, DATE_FORMAT).is_err() {
            return Err(DraftError::InvalidDate(date.to_string()));
        }

        let mut entry = Entry::new(date);
        for (key, text) in &self.fields {
            let value = if PACE_FIELDS.contains(&key.as_str()) {
                parse_pace(text).map(f64::from)
            } else {
                to_num(text)
            };
            if !entry.set_metric(key, value) {
                debug!("ignoring unknown form field {}", key);
            }
        }
        Ok(entry)
    }
}

/// Legger til og holder listen sortert på dato (stabil).
pub fn insert_sorted(entries: &mut Vec<Entry>, entry: Entry) {
    entries.push(entry);
    sort_by_date(entries);
}

pub fn remove_at(entries: &mut Vec<Entry>, index: usize) -> Option<Entry> {
    if index < entries.len() {
        Some(entries.remove(index))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_converts_text_fields() {
        let e = EntryDraft::new("2024-04-02")
            .with("dist", "10.5")
            .with("avgPace", "5:10")
            .with("maxPace", "4.5")
            .with("avgHR", "1,45")
            .with("maxHR", "")
            .with("vOsc", "8.2")
            .with("mood", "great")
            .into_entry()
            .unwrap();
        assert_eq!(e.dist, Some(10.5));
        assert_eq!(e.avg_pace, Some(310.0));
        assert_eq!(e.max_pace, Some(270.0));
        assert_eq!(e.avg_hr, Some(145.0));
        assert_eq!(e.max_hr, None);
        assert_eq!(e.v_osc, Some(8.2));
        assert!(e.extra.is_empty());
    }

    #[test]
    fn draft_needs_a_valid_date() {
        assert_eq!(EntryDraft::new("  ").into_entry(), Err(DraftError::MissingDate));
        assert_eq!(
            EntryDraft::new("02/04/2024").into_entry(),
            Err(DraftError::InvalidDate("02/04/2024".into()))
        );
    }

    #[test]
    fn insert_keeps_order() {
        let mut es = vec![Entry::new("2024-01-01"), Entry::new("2024-01-03")];
        insert_sorted(&mut es, Entry::new("2024-01-02"));
        let dates: Vec<_> = es.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, ["2024-01-01", "2024-01-02", "2024-01-03"]);

        assert_eq!(remove_at(&mut es, 1).map(|e| e.date), Some("2024-01-02".to_string()));
        assert!(remove_at(&mut es, 5).is_none());
    }
}
