//! Parser for the machine-readable facts listing served by the remote store.
//!
//! One line per object, RFC 3659 style: semicolon-delimited `key=value`
//! facts, then a space, then the entry name. Example:
//!
//! ```text
//! modify=20240101093015;perm=fle;size=4096;type=dir;unique=4AB9E201; 2024-01-01.1
//! ```

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory {
        unique: String,
    },
    /// A pointer-like alias. `target` is the explicit link target when the
    /// listing encodes one (`type=OS.unix=slink:<path>`); most servers only
    /// expose the shared `unique` identity.
    SymbolicPointer {
        unique: String,
        target: Option<String>,
    },
    Other,
}

impl ListingEntry {
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory { .. })
    }
}

pub fn parse_listing<I, S>(lines: I) -> Result<Vec<ListingEntry>, SyncError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut entries = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        entries.push(parse_line(line)?);
    }
    Ok(entries)
}

pub fn parse_line(line: &str) -> Result<ListingEntry, SyncError> {
    let (facts, name) = line
        .rsplit_once(';')
        .ok_or_else(|| malformed(line, "no fact delimiter"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed(line, "empty name field"));
    }

    let mut type_fact = None;
    let mut unique = None;
    for fact in facts.split(';') {
        let (key, value) = fact
            .split_once('=')
            .ok_or_else(|| malformed(line, "fact without `=`"))?;
        match key.to_ascii_lowercase().as_str() {
            "type" => type_fact = Some(value),
            "unique" => unique = Some(value.to_string()),
            _ => {}
        }
    }

    let type_fact = type_fact.ok_or_else(|| malformed(line, "missing `type` fact"))?;
    let kind = classify(type_fact, unique)
        .map_err(|reason| malformed(line, reason))?;

    Ok(ListingEntry {
        name: name.to_string(),
        kind,
    })
}

fn classify(type_fact: &str, unique: Option<String>) -> Result<EntryKind, &'static str> {
    let lowered = type_fact.to_ascii_lowercase();
    if lowered == "dir" {
        let unique = unique.ok_or("directory entry missing `unique` fact")?;
        return Ok(EntryKind::Directory { unique });
    }
    if lowered.contains("symlink") || lowered.contains("slink") {
        let unique = unique.ok_or("symlink entry missing `unique` fact")?;
        let target = type_fact
            .split_once(':')
            .map(|(_, target)| target.to_string())
            .filter(|target| !target.is_empty());
        return Ok(EntryKind::SymbolicPointer { unique, target });
    }
    Ok(EntryKind::Other)
}

fn malformed(line: &str, reason: impl Into<String>) -> SyncError {
    SyncError::MalformedListingEntry {
        line: line.to_string(),
        reason: reason.into(),
    }
}
