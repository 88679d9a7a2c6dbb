//! Konvertering mellom tekst i skjemaet og numeriske verdier som lagres.
//!
//! Pace lagres alltid som hele sekunder per distanseenhet; `mm:ss` er kun
//! presentasjonsformen.

/// Tall fra fritekst: fjerner tusenskille (`,`), trimmer, avviser tomt og ikke-endelig.
pub fn to_num(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let s = cleaned.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Pace-tekst → sekunder.
///
/// Godtar `"mm:ss"`, `"h:mm:ss"` eller et desimaltall i minutter
/// (`"5.5"` = 5 min 30 s). Brøkdeler av sekunder rundes til nærmeste sekund.
pub fn parse_pace(text: &str) -> Option<u32> {
    let s = text.trim();
    // ingen del av en pace kan være negativ, heller ikke "-0"
    if s.is_empty() || s.contains('-') {
        return None;
    }

    let secs = if s.contains(':') {
        let parts = s
            .split(':')
            .map(|p| p.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()?;
        match parts.as_slice() {
            [m, sec] => m * 60.0 + sec,
            [h, m, sec] => h * 3600.0 + m * 60.0 + sec,
            _ => return None,
        }
    } else {
        let minutes = s.parse::<f64>().ok().filter(|v| v.is_finite())?;
        let whole = minutes.trunc();
        whole * 60.0 + (minutes - whole) * 60.0
    };

    whole_seconds(secs)
}

fn whole_seconds(secs: f64) -> Option<u32> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let rounded = secs.round();
    if rounded > u32::MAX as f64 {
        return None;
    }
    Some(rounded as u32)
}

/// Sekunder → `"mm:ss"`. Tom streng for ikke-endelig eller ikke-positiv input.
pub fn format_pace(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return String::new();
    }
    // rund først, ellers kan 59.6 s bli "00:60"
    let total = seconds.round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Pace ut fra distanse (km) og tid (s).
pub fn calculate_pace(distance_km: f64, time_secs: f64) -> String {
    if !distance_km.is_finite() || !time_secs.is_finite() || distance_km <= 0.0 {
        return String::new();
    }
    format_pace(time_secs / distance_km)
}

/// Sekunder → `"HH:MM:SS"`.
pub fn format_time(time_secs: f64) -> String {
    if !time_secs.is_finite() || time_secs < 0.0 {
        return "00:00:00".to_string();
    }
    let t = time_secs.floor() as u64;
    format!("{:02}:{:02}:{:02}", t / 3600, (t % 3600) / 60, t % 60)
}
