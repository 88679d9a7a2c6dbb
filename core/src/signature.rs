//! Dedup-nøkler for økter.
//!
//! Manglende verdier blir `""` (ikke `null`), slik at fravær og `null`
//! gir samme signatur.

use crate::models::{Entry, Sport, COMMON_FIELDS};

pub const SEPARATOR: char = '|';

/// Felt i den smale legacy-signaturen (flat `entries`-liste).
pub const LEGACY_FIELDS: [&str; 4] = ["avgPace", "maxPace", "avgHR", "maxHR"];

/// Full signatur: dato, felles metrikker, så idrettens egne felt.
pub fn signature(entry: &Entry, sport: Sport) -> String {
    let fields = COMMON_FIELDS
        .iter()
        .chain(sport.specific_fields())
        .copied();
    join(entry, fields)
}

pub fn legacy_signature(entry: &Entry) -> String {
    join(entry, LEGACY_FIELDS.iter().copied())
}

fn join(entry: &Entry, fields: impl Iterator<Item = &'static str>) -> String {
    let mut out = entry.date.clone();
    for key in fields {
        out.push(SEPARATOR);
        if let Some(v) = entry.metric(key) {
            out.push_str(&render_number(v));
        }
    }
    out
}

/// Korteste form; heltall uten desimaler (`300`, ikke `300.0`).
fn render_number(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_blank() {
        let e = Entry {
            avg_pace: Some(300.0),
            ..Entry::new("2024-01-01")
        };
        assert_eq!(legacy_signature(&e), "2024-01-01|300|||");
        assert_eq!(signature(&e, Sport::Swim), "2024-01-01||300||||||||||");
    }

    #[test]
    fn sport_fields_take_part() {
        let a = Entry { stride: Some(110.0), ..Entry::new("2024-01-01") };
        let b = Entry { stride: Some(112.5), ..Entry::new("2024-01-01") };
        assert_ne!(signature(&a, Sport::Run), signature(&b, Sport::Run));
        // stride er ikke et svømmefelt
        assert_eq!(signature(&a, Sport::Swim), signature(&b, Sport::Swim));
        assert!(signature(&b, Sport::Run).ends_with("|112.5|||"));
    }

    #[test]
    fn legacy_ignores_distance_and_power() {
        let a = Entry { dist: Some(5.0), avg_power: Some(200.0), ..Entry::new("2024-01-01") };
        let b = Entry::new("2024-01-01");
        assert_eq!(legacy_signature(&a), legacy_signature(&b));
        assert_ne!(signature(&a, Sport::Run), signature(&b, Sport::Run));
    }

    #[test]
    fn renders_numbers_like_the_stored_json() {
        assert_eq!(render_number(-0.0), "0");
        assert_eq!(render_number(5.5), "5.5");
        assert_eq!(render_number(0.1 + 0.2), "0.30000000000000004");
    }
}
