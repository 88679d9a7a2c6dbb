// Python-bindinger (feature "python"): JSON inn → kjerne → JSON ut.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use serde_json::Value;

use crate::merge::{merge_snapshots, Precedence, DEFAULT_PRECEDENCE};
use crate::normalize::{normalize, Snapshot};

fn parse_value(json_in: &str, what: &str) -> PyResult<Value> {
    serde_json::from_str(json_in)
        .map_err(|e| PyValueError::new_err(format!("parse error ({what}): {e}")))
}

fn parse_precedence(p: Option<&str>) -> PyResult<Precedence> {
    match p {
        None => Ok(DEFAULT_PRECEDENCE),
        Some("remote_first") => Ok(Precedence::RemoteFirst),
        Some("guest_first") => Ok(Precedence::GuestFirst),
        Some(other) => Err(PyValueError::new_err(format!("unknown precedence '{other}'"))),
    }
}

#[pyfunction]
fn normalize_dataset_json(json_str: &str) -> PyResult<String> {
    let raw = parse_value(json_str, "dataset")?;
    serde_json::to_string(&normalize(&raw)).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Returnerer det flettede dokumentet med `mergedCount` lagt til.
#[pyfunction]
#[pyo3(signature = (remote_json, guest_json, precedence = None))]
fn merge_datasets_json(remote_json: &str, guest_json: &str, precedence: Option<&str>) -> PyResult<String> {
    let remote = Snapshot::from_value(&parse_value(remote_json, "remote")?);
    let guest = Snapshot::from_value(&parse_value(guest_json, "guest")?);

    let outcome = merge_snapshots(&remote, &guest, parse_precedence(precedence)?);
    let mut doc = outcome.to_document();
    doc.insert("mergedCount".into(), Value::from(outcome.merged_count() as u64));

    serde_json::to_string(&doc).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pyfunction]
#[pyo3(name = "parse_pace")]
fn py_parse_pace(text: &str) -> Option<u32> {
    crate::pace::parse_pace(text)
}

#[pyfunction]
#[pyo3(name = "format_pace")]
fn py_format_pace(seconds: f64) -> String {
    crate::pace::format_pace(seconds)
}

#[pymodule]
fn trainlog_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize_dataset_json, m)?)?;
    m.add_function(wrap_pyfunction!(merge_datasets_json, m)?)?;
    m.add_function(wrap_pyfunction!(py_parse_pace, m)?)?;
    m.add_function(wrap_pyfunction!(py_format_pace, m)?)?;
    Ok(())
}
