//! Oppsummering og eksport for oversikten over brukere og økter.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::models::{Entry, Sport, COMMON_FIELDS};
use crate::normalize::normalize_document;
use crate::pace::format_pace;
use crate::storage::{Document, UPDATED_AT_FIELD};

/// Økter innenfor `[from, to]` (begge inklusive, begge valgfrie).
/// Økter med uleselig dato tas ikke med.
pub fn filter_by_date<'a>(
    entries: &'a [Entry],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<&'a Entry> {
    entries
        .iter()
        .filter(|e| match e.parsed_date() {
            Some(d) => from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t),
            None => false,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntrySummary {
    pub sessions: usize,
    /// km
    pub total_dist: f64,
    /// `mm:ss`, tom når ingen økter har pace
    pub avg_pace: String,
    pub avg_hr: Option<i64>,
}

impl EntrySummary {
    pub fn from_entries<'a, I>(entries: I) -> EntrySummary
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut s = EntrySummary::default();
        let (mut pace_sum, mut pace_n) = (0.0f64, 0usize);
        let (mut hr_sum, mut hr_n) = (0.0f64, 0usize);

        for e in entries {
            s.sessions += 1;
            s.total_dist += e.dist.unwrap_or(0.0);
            if let Some(p) = e.avg_pace {
                pace_sum += p;
                pace_n += 1;
            }
            if let Some(h) = e.avg_hr {
                hr_sum += h;
                hr_n += 1;
            }
        }

        if pace_n > 0 {
            s.avg_pace = format_pace(pace_sum / pace_n as f64);
        }
        if hr_n > 0 {
            s.avg_hr = Some((hr_sum / hr_n as f64).round() as i64);
        }
        s
    }
}

fn column_header(key: &str) -> String {
    let unit = match key {
        "dist" => "km",
        "avgPace" | "maxPace" => "s",
        "stride" | "vOsc" => "cm",
        "gct" => "ms",
        "vRatio" => "%",
        _ => return key.to_string(),
    };
    format!("{key}({unit})")
}

/// CSV for én idrett: dato, felles metrikker og idrettens egne felt.
/// Pace eksporteres som sekunder.
pub fn entries_to_csv<'a, I>(sport: Sport, entries: I) -> Result<String, csv::Error>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let keys: Vec<&str> = COMMON_FIELDS
        .iter()
        .chain(sport.specific_fields())
        .copied()
        .collect();

    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["date".to_string()];
    header.extend(keys.iter().map(|k| column_header(k)));
    wtr.write_record(&header)?;

    for e in entries {
        let mut row = vec![e.date.clone()];
        row.extend(
            keys.iter()
                .map(|k| e.metric(k).map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&row)?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Én rad i brukeroversikten.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub run: usize,
    pub swim: usize,
    pub bike: usize,
    pub total: usize,
}

impl DatasetOverview {
    pub fn from_document(uid: &str, doc: &Document) -> DatasetOverview {
        let dataset = normalize_document(doc);
        let text = |k: &str| doc.get(k).and_then(Value::as_str).unwrap_or("").trim().to_string();

        let email = text("email");
        let name = [
            dataset.name.clone(),
            text("displayName"),
            email.split('@').next().unwrap_or("").to_string(),
            uid.chars().take(8).collect(),
        ]
        .into_iter()
        .find(|n| !n.is_empty())
        .unwrap_or_default();

        let updated_at = doc
            .get(UPDATED_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));

        let by = &dataset.entries_by_sport;
        DatasetOverview {
            uid: uid.to_string(),
            name,
            email,
            updated_at,
            run: by.run.len(),
            swim: by.swim.len(),
            bike: by.bike.len(),
            total: by.total(),
        }
    }

    /// Treff på navn, e-post eller uid (uten hensyn til store/små bokstaver).
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.name.to_lowercase().contains(&q)
            || self.email.to_lowercase().contains(&q)
            || self.uid.to_lowercase().contains(&q)
    }
}

/// Sist oppdatert først; uten tidsstempel havner sist.
pub fn sort_overviews(rows: &mut [DatasetOverview]) {
    rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
