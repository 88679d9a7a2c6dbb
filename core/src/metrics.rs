use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus-tellere for lagring og fletting. Eget register, så verten
/// bestemmer selv om og hvor de eksponeres.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub registry: Registry,
    merge_total: IntCounter,
    merge_noop_total: IntCounter,
    merge_failed_total: IntCounter,
    merged_entries_total: IntCounter,
    saves_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let merge_total = IntCounter::new("trainlog_merge_total", "Guest-to-account merges written")?;
        let merge_noop_total = IntCounter::new(
            "trainlog_merge_noop_total",
            "Merge calls that found no guest data",
        )?;
        let merge_failed_total = IntCounter::new(
            "trainlog_merge_failed_total",
            "Merge calls that failed on the remote store",
        )?;
        let merged_entries_total = IntCounter::new(
            "trainlog_merged_entries_total",
            "Guest entries merged into accounts (legacy and sport tables summed)",
        )?;
        let saves_total = IntCounterVec::new(
            Opts::new("trainlog_saves_total", "Dataset saves by scope"),
            &["scope"],
        )?;

        registry.register(Box::new(merge_total.clone()))?;
        registry.register(Box::new(merge_noop_total.clone()))?;
        registry.register(Box::new(merge_failed_total.clone()))?;
        registry.register(Box::new(merged_entries_total.clone()))?;
        registry.register(Box::new(saves_total.clone()))?;

        Ok(Self {
            registry,
            merge_total,
            merge_noop_total,
            merge_failed_total,
            merged_entries_total,
            saves_total,
        })
    }

    /// Prometheus tekstformat
    pub fn gather_text(&self) -> String {
        let mut buf = Vec::new();
        if TextEncoder::new().encode(&self.registry.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

/// Prosessens felles tellere. `None` hvis registreringen feilet; da telles ingenting.
pub static METRICS: Lazy<Option<Metrics>> = Lazy::new(|| match Metrics::new() {
    Ok(m) => Some(m),
    Err(e) => {
        log::error!("could not register trainlog metrics: {}", e);
        None
    }
});

pub fn global() -> Option<&'static Metrics> {
    METRICS.as_ref()
}

pub fn merge_total(m: &Metrics) -> &IntCounter {
    &m.merge_total
}

pub fn merge_noop_total(m: &Metrics) -> &IntCounter {
    &m.merge_noop_total
}

pub fn merge_failed_total(m: &Metrics) -> &IntCounter {
    &m.merge_failed_total
}

pub fn merged_entries_total(m: &Metrics) -> &IntCounter {
    &m.merged_entries_total
}

/// `scope` er `"guest"` eller `"account"`.
pub fn saves_total(m: &Metrics, scope: &str) -> IntCounter {
    m.saves_total.with_label_values(&[scope])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let m = Metrics::new().unwrap();
        merge_total(&m).inc();
        merged_entries_total(&m).inc_by(3);
        saves_total(&m, "guest").inc();

        let text = m.gather_text();
        assert!(text.contains("trainlog_merge_total 1"));
        assert!(text.contains("trainlog_merged_entries_total 3"));
        assert!(text.contains(r#"trainlog_saves_total{scope="guest"} 1"#));
    }

    #[test]
    fn global_registry_is_available() {
        let m = global().expect("global metrics registered");
        saves_total(m, "account").inc();
        assert!(m.gather_text().contains("trainlog_saves_total"));
    }
}
