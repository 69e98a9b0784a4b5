//! Shortcut definition documents.
//!
//! Two layouts are accepted:
//!
//! ```json
//! [ { "name": "Copy", "hotkey": "ctrl+c" } ]
//! ```
//!
//! ```json
//! {
//!   "metadata": { "prefix": "Git:" },
//!   "hotkeys": [
//!     { "name": "Commit", "hotkey": "ctrl+enter" },
//!     { "name": "Stage and commit", "hotkeys": [ { "hotkey": "ctrl+k" }, { "sleep": 100 }, { "hotkey": "ctrl+enter" } ] }
//!   ]
//! }
//! ```

use crate::combo;
use crate::entry::{ShortcutEntry, Step};
use crate::error::{Error, Result};
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Legacy(Vec<Value>),
    Wrapped {
        #[serde(default)]
        metadata: Metadata,
        hotkeys: Vec<Value>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    hotkey: Option<String>,
    #[serde(default, alias = "steps")]
    hotkeys: Option<Vec<RawStep>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawStep {
    Press { hotkey: String },
    Sleep { sleep: u64 },
}

/// Entries of one document, with the document's prefix applied, in file
/// order. Entries lacking a name or an action are logged and dropped; only a
/// document that cannot be parsed at all is an error.
pub fn parse_document(path: &Path, text: &str) -> Result<Vec<ShortcutEntry>> {
    let document: RawDocument = serde_json::from_str(text).map_err(|source| Error::SourceParse {
        path: path.to_path_buf(),
        source,
    })?;

    let (prefix, raw_entries) = match document {
        RawDocument::Legacy(entries) => (None, entries),
        RawDocument::Wrapped { metadata, hotkeys } => (metadata.prefix, hotkeys),
    };
    let prefix = prefix.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

    let mut entries = Vec::with_capacity(raw_entries.len());
    for value in raw_entries {
        match convert_entry(path, value, prefix.as_deref()) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("{e}"),
        }
    }
    Ok(entries)
}

fn convert_entry(path: &Path, value: Value, prefix: Option<&str>) -> Result<ShortcutEntry> {
    let reject = |reason: String| Error::InvalidEntry {
        path: path.to_path_buf(),
        reason,
    };

    let raw: RawEntry = serde_json::from_value(value).map_err(|e| reject(e.to_string()))?;
    let name = raw
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| reject("entry has no name".to_string()))?;
    let name = match prefix {
        Some(prefix) => format!("{prefix} {name}"),
        None => name,
    };

    if let Some(steps) = raw.hotkeys.filter(|steps| !steps.is_empty()) {
        let steps = steps
            .into_iter()
            .map(|step| match step {
                RawStep::Press { hotkey } => Step::PressCombo(combo::normalize(&hotkey)),
                RawStep::Sleep { sleep } => Step::Sleep(Duration::from_millis(sleep)),
            })
            .collect();
        return Ok(ShortcutEntry::sequence(name, steps));
    }

    match raw.hotkey.map(|h| combo::normalize(&h)).filter(|h| !h.is_empty()) {
        Some(hotkey) => Ok(ShortcutEntry::combo(name, hotkey)),
        None => Err(reject(format!("{name:?} has neither hotkey nor hotkeys"))),
    }
}
