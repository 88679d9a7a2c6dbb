//! Gjest → konto-fletting uten I/O.
//!
//! Siden som sees først vinner ved lik signatur; senere duplikater forkastes,
//! de overskriver aldri. Standard er at konto (remote) sees først.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{by_sport_value, entries_value, sort_by_date, Dataset, EntriesBySport, Entry, Sport};
use crate::normalize::Snapshot;
use crate::signature::{legacy_signature, signature};

/// Hvilken side som vinner ved eksakt signaturkollisjon (og har navneprioritet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    #[default]
    RemoteFirst,
    GuestFirst,
}

pub const DEFAULT_PRECEDENCE: Precedence = Precedence::RemoteFirst;

/// Antall nye (ikke-duplikat) gjesteøkter per tabell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeCounts {
    pub legacy: usize,
    pub run: usize,
    pub swim: usize,
    pub bike: usize,
}

impl MergeCounts {
    /// Summen over legacy + alle idretter. En økt som havner i både legacy-listen
    /// og `run` telles to ganger.
    pub fn total(&self) -> usize {
        self.legacy + self.run + self.swim + self.bike
    }

    fn set(&mut self, sport: Sport, n: usize) {
        match sport {
            Sport::Run => self.run = n,
            Sport::Swim => self.swim = n,
            Sport::Bike => self.bike = n,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub dataset: Dataset,
    pub legacy: Vec<Entry>,
    pub counts: MergeCounts,
}

impl MergeOutcome {
    pub fn merged_count(&self) -> usize {
        self.counts.total()
    }

    /// Feltene som skrives tilbake til konto-dokumentet (uten tidsstempel).
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("name".into(), Value::String(self.dataset.name.clone()));
        doc.insert("entries".into(), entries_value(&self.legacy));
        doc.insert("entriesBySport".into(), by_sport_value(&self.dataset.entries_by_sport));
        doc
    }
}

pub fn merge_snapshots(remote: &Snapshot, guest: &Snapshot, precedence: Precedence) -> MergeOutcome {
    let mut counts = MergeCounts::default();

    let (legacy, added) = merge_table(&remote.legacy, &guest.legacy, precedence, legacy_signature);
    counts.legacy = added;

    let mut by = EntriesBySport::default();
    for sport in Sport::ALL {
        let (merged, added) = merge_table(
            remote.dataset.entries_by_sport.get(sport),
            guest.dataset.entries_by_sport.get(sport),
            precedence,
            |e| signature(e, sport),
        );
        *by.get_mut(sport) = merged;
        counts.set(sport, added);
    }

    let name = pick_name(&remote.dataset.name, &guest.dataset.name, precedence);

    MergeOutcome {
        dataset: Dataset {
            name,
            entries_by_sport: by,
        },
        legacy,
        counts,
    }
}

/// Union + dedup + sortering for én tabell. Returnerer også hvor mange
/// nye signaturer gjesten bidro med.
fn merge_table<F>(remote: &[Entry], guest: &[Entry], precedence: Precedence, sig: F) -> (Vec<Entry>, usize)
where
    F: Fn(&Entry) -> String,
{
    let remote_distinct = remote.iter().map(&sig).collect::<HashSet<_>>().len();

    let (first, second) = match precedence {
        Precedence::RemoteFirst => (remote, guest),
        Precedence::GuestFirst => (guest, remote),
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(first.len() + second.len());
    for e in first.iter().chain(second) {
        if seen.insert(sig(e)) {
            out.push(e.clone());
        }
    }
    sort_by_date(&mut out);

    let added = out.len().saturating_sub(remote_distinct);
    (out, added)
}

fn pick_name(remote: &str, guest: &str, precedence: Precedence) -> String {
    let (first, second) = match precedence {
        Precedence::RemoteFirst => (remote, guest),
        Precedence::GuestFirst => (guest, remote),
    };
    if !first.is_empty() {
        first.to_string()
    } else {
        second.to_string()
    }
}
