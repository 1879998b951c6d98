//! Metadata collection across the graph.
//!
//! Targets may carry a free-form metadata map of `key -> [value...]`
//! lists, where values are strings, nested lists or objects. The walk
//! starts from a set of entry targets, appends the values stored under the
//! requested data keys, and then descends: when any walk key is present
//! its values name the successors (as target labels); otherwise the walk
//! follows direct deps and data deps.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::graph::{BuildGraph, TargetId};
use crate::label::Label;
use crate::source_file::{SourceDir, SourceFile};
use crate::unique_vec::UniqueVec;

/// Errors raised during a metadata walk.
#[derive(Debug, Error, Diagnostic)]
pub enum MetadataError {
    #[error("no data keys were given")]
    #[diagnostic(
        code(tagane::metadata::no_data_keys),
        help("pass at least one key whose values should be collected")
    )]
    NoDataKeys,

    #[error("target {target} walks to \"{reference}\", which is not a target label")]
    #[diagnostic(code(tagane::metadata::bad_walk_reference))]
    BadWalkReference { target: String, reference: String },

    #[error("target {target} walks to unknown target {label}")]
    #[diagnostic(code(tagane::metadata::unknown_walk_target))]
    UnknownWalkTarget { target: String, label: String },
}

/// Parameters of one metadata walk.
#[derive(Debug, Default)]
pub struct MetadataWalk {
    pub data_keys: Vec<String>,
    pub walk_keys: Vec<String>,
    /// When set, string values are rewritten as paths relative to this
    /// directory.
    pub rebase_dir: Option<SourceDir>,
}

/// The collected values and the set of targets visited, in visit order.
#[derive(Debug)]
pub struct MetadataResult {
    pub values: Vec<Value>,
    pub visited: Vec<TargetId>,
}

/// Walk the graph depth-first from `entries`, collecting metadata values.
///
/// # Errors
///
/// Returns [`MetadataError`] when no data keys are given or a walk key
/// names something that is not a known target.
pub fn collect_metadata(
    graph: &BuildGraph,
    entries: &[TargetId],
    walk: &MetadataWalk,
) -> Result<MetadataResult, MetadataError> {
    if walk.data_keys.is_empty() {
        return Err(MetadataError::NoDataKeys);
    }

    let mut visited: UniqueVec<TargetId> = UniqueVec::new();
    let mut values = Vec::new();
    for &entry in entries {
        visit(graph, entry, walk, &mut visited, &mut values)?;
    }
    Ok(MetadataResult {
        values,
        visited: visited.release().into_vec(),
    })
}

fn visit(
    graph: &BuildGraph,
    id: TargetId,
    walk: &MetadataWalk,
    visited: &mut UniqueVec<TargetId>,
    values: &mut Vec<Value>,
) -> Result<(), MetadataError> {
    if !visited.append(id) {
        return Ok(());
    }
    let target = graph.target(id);

    for key in &walk.data_keys {
        let Some(entries) = target.metadata.get(key) else {
            continue;
        };
        for value in entries {
            values.push(match &walk.rebase_dir {
                Some(dir) => rebase_value(value, *dir),
                None => value.clone(),
            });
        }
    }

    for successor in successors(graph, id, walk)? {
        visit(graph, successor, walk, visited, values)?;
    }
    Ok(())
}

fn successors(
    graph: &BuildGraph,
    id: TargetId,
    walk: &MetadataWalk,
) -> Result<Vec<TargetId>, MetadataError> {
    let target = graph.target(id);
    let named: Vec<&Value> = walk
        .walk_keys
        .iter()
        .filter_map(|key| target.metadata.get(key))
        .flatten()
        .collect();
    if named.is_empty() {
        return Ok(target
            .public_deps
            .iter()
            .chain(target.private_deps.iter())
            .chain(target.data_deps.iter())
            .copied()
            .collect());
    }

    let mut successors = Vec::with_capacity(named.len());
    for value in named {
        let Some(text) = value.as_str() else {
            return Err(MetadataError::BadWalkReference {
                target: target.label.to_string(),
                reference: value.to_string(),
            });
        };
        let label = Label::parse(text).ok_or_else(|| MetadataError::BadWalkReference {
            target: target.label.to_string(),
            reference: text.to_owned(),
        })?;
        let successor = graph
            .lookup(&label)
            .ok_or_else(|| MetadataError::UnknownWalkTarget {
                target: target.label.to_string(),
                label: label.to_string(),
            })?;
        successors.push(successor);
    }
    Ok(successors)
}

/// Rewrite string values as paths relative to the rebase directory; lists
/// and objects are rewritten element-wise.
fn rebase_value(value: &Value, dir: SourceDir) -> Value {
    match value {
        Value::String(text) => {
            Value::String(SourceFile::new(text).rebase_to(&dir).into_string())
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| rebase_value(item, dir)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), rebase_value(item, dir)))
                .collect(),
        ),
        other => other.clone(),
    }
}
