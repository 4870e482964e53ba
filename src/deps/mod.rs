// src/deps/mod.rs

//! Dependency tracker.
//!
//! Loads the dependency record of every object in the graph and exposes it
//! to the staleness evaluator. The tracker never decides staleness itself:
//! an absent, unreadable or corrupt record just reports as invalid.
//!
//! - [`depfile`] parses the Makefile-style record format.
//! - [`signature`] fingerprints compile commands and stamps records.

pub mod depfile;
pub mod signature;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::errors::RecordError;
use crate::fs::FileSystem;
use crate::graph::{BuildGraph, NodeId};
use crate::report::Diagnostic;

pub use depfile::{Depfile, parse_depfile, render_rule};
pub use signature::{SIGNATURE_PREFIX, command_signature, stamp_record};

/// Headers (and other inputs) an object depended on at its last successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    pub path: PathBuf,
    /// Every prerequisite except the object's own source.
    pub headers: BTreeSet<PathBuf>,
    pub signature: Option<String>,
}

/// Read and parse one record.
pub fn load_record(
    fs: &dyn FileSystem,
    path: &Path,
    source: &Path,
) -> Result<DependencyRecord, RecordError> {
    if !fs.exists(path) {
        return Err(RecordError::Missing {
            path: path.to_path_buf(),
        });
    }

    let content = fs.read_to_string(path).map_err(|e| RecordError::Unreadable {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;

    let parsed = parse_depfile(&content).map_err(|reason| RecordError::Corrupt {
        path: path.to_path_buf(),
        reason,
    })?;

    let headers = parsed
        .prerequisites
        .into_iter()
        .filter(|p| p != source)
        .collect();

    Ok(DependencyRecord {
        path: path.to_path_buf(),
        headers,
        signature: parsed.signature,
    })
}

#[derive(Debug, Default)]
pub struct DependencyTracker {
    records: HashMap<NodeId, Result<DependencyRecord, RecordError>>,
}

impl DependencyTracker {
    /// Load the records of every object in `graph`.
    ///
    /// Missing records are normal before a first compile and produce no
    /// diagnostic; unreadable or corrupt ones do.
    pub fn load(fs: &dyn FileSystem, graph: &BuildGraph) -> (Self, Vec<Diagnostic>) {
        let mut records = HashMap::new();
        let mut diagnostics = Vec::new();

        for &id in graph.objects() {
            let object = graph.object(id);
            let state = load_record(fs, &object.record, &object.source);
            match &state {
                Ok(record) => trace!(
                    object = ?object.path,
                    headers = record.headers.len(),
                    "loaded dependency record"
                ),
                Err(RecordError::Missing { .. }) => {
                    debug!(object = ?object.path, "no dependency record yet");
                }
                Err(e) => diagnostics.push(Diagnostic::CorruptRecord(e.clone())),
            }
            records.insert(id, state);
        }

        (Self { records }, diagnostics)
    }

    /// False if the record is absent, unreadable or corrupt: callers must
    /// treat that as "unknown, assume stale".
    pub fn is_record_valid(&self, object: NodeId) -> bool {
        matches!(self.records.get(&object), Some(Ok(_)))
    }

    pub fn record(&self, object: NodeId) -> Option<&DependencyRecord> {
        self.records.get(&object).and_then(|r| r.as_ref().ok())
    }

    /// Why the record is unusable, if it is.
    pub fn record_error(&self, object: NodeId) -> Option<&RecordError> {
        self.records.get(&object).and_then(|r| r.as_ref().err())
    }
}
