//! Resolves the remote `latest` alias to the version directory it denotes.

use std::collections::HashMap;

use crate::error::SyncError;
use crate::listing::{EntryKind, ListingEntry};

/// Conventional name of the pointer entry that designates the published
/// version on the remote store.
pub const LATEST_ALIAS: &str = "latest";

/// Returns the name of the version directory the `alias` pointer denotes.
///
/// The facts listing does not carry symlink targets as path strings on most
/// servers; the alias and the directory it points at share the same `unique`
/// identity instead. When the listing does carry an explicit target path,
/// its final segment must name exactly one directory entry. Any ambiguity is
/// a hard failure, never a guess.
pub fn resolve_current(entries: &[ListingEntry], alias: &str) -> Result<String, SyncError> {
    let mut dirs_by_unique: HashMap<&str, Vec<&str>> = HashMap::new();
    for entry in entries {
        if let EntryKind::Directory { unique } = &entry.kind {
            dirs_by_unique
                .entry(unique.as_str())
                .or_default()
                .push(entry.name.as_str());
        }
    }

    let pointer = entries
        .iter()
        .find_map(|entry| match &entry.kind {
            EntryKind::SymbolicPointer { unique, target } if entry.name == alias => {
                Some((unique.as_str(), target.as_deref()))
            }
            _ => None,
        })
        .ok_or_else(|| SyncError::NoCurrentPointer(alias.to_string()))?;

    if let Some(target) = pointer.1 {
        let base = target.rsplit('/').next().unwrap_or(target);
        let matched: Vec<&str> = entries
            .iter()
            .filter(|entry| entry.is_directory() && entry.name == base)
            .map(|entry| entry.name.as_str())
            .collect();
        return match matched.as_slice() {
            [name] => Ok((*name).to_string()),
            [] => Err(ambiguous(alias, format!("no directory named `{base}`"))),
            many => Err(ambiguous(
                alias,
                format!("{} directories named `{base}`", many.len()),
            )),
        };
    }

    match dirs_by_unique.get(pointer.0).map(Vec::as_slice) {
        Some([name]) => Ok((*name).to_string()),
        Some(many) => Err(ambiguous(
            alias,
            format!(
                "{} directories share unique id `{}`",
                many.len(),
                pointer.0
            ),
        )),
        None => Err(ambiguous(
            alias,
            format!("no directory with unique id `{}`", pointer.0),
        )),
    }
}

fn ambiguous(alias: &str, detail: String) -> SyncError {
    SyncError::AmbiguousOrMissingTarget {
        alias: alias.to_string(),
        detail,
    }
}
