//! In-memory model of an agent runtime's `settings.json`.
//!
//! The document is kept as an untyped JSON object so that every key this tool
//! does not own survives a load/serialize cycle with its value intact. Key
//! order comes from `serde_json`'s `preserve_order` map: existing keys keep
//! their position and new keys are appended, which makes [`serialize`] stable.
//!
//! [`serialize`]: SettingsDocument::serialize

use crate::error::{InstallError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Key holding the hook table.
pub const HOOKS_KEY: &str = "hooks";

/// A settings file whose `hooks` section, when present, has been checked to be
/// `{ "<Event>": [ { "matcher"?: string, "hooks"?: [ {...} ] } ] }`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsDocument {
    root: Map<String, Value>,
}

impl SettingsDocument {
    /// An empty `{}` document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and validate the settings file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InstallError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(InstallError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&bytes).map_err(|message| InstallError::parse(path, message))
    }

    /// Like [`load`](Self::load), but a missing file yields an empty document.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(InstallError::NotFound { .. }) => Ok(Self::new()),
            other => other,
        }
    }

    /// Parse settings text. Bytes that are not UTF-8 are a parse error like
    /// any other malformed JSON. The error is a one-line description.
    pub fn parse(text: impl AsRef<[u8]>) -> std::result::Result<Self, String> {
        let value: Value = serde_json::from_slice(text.as_ref()).map_err(|e| e.to_string())?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        let Value::Object(root) = value else {
            return Err("top level must be a JSON object".to_string());
        };
        validate_hooks(&root)?;
        Ok(Self { root })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// Entries registered for `event`, or an empty slice.
    pub fn hook_entries(&self, event: &str) -> &[Value] {
        self.root
            .get(HOOKS_KEY)
            .and_then(|hooks| hooks.get(event))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    /// Pretty-printed JSON with two-space indentation and a trailing newline.
    pub fn serialize(&self) -> String {
        format!("{:#}\n", Value::Object(self.root.clone()))
    }

    /// Replace the file at `path` with this document, all or nothing.
    pub fn write(&self, path: &Path) -> Result<()> {
        atomic_write(path, self.serialize().as_bytes()).map_err(|source| InstallError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn validate_hooks(root: &Map<String, Value>) -> std::result::Result<(), String> {
    let Some(hooks) = root.get(HOOKS_KEY) else {
        return Ok(());
    };
    let hooks = hooks
        .as_object()
        .ok_or("`hooks` must be an object mapping event names to entry lists")?;

    for (event, entries) in hooks {
        let entries = entries
            .as_array()
            .ok_or_else(|| format!("`hooks.{event}` must be an array of entries"))?;
        for (i, entry) in entries.iter().enumerate() {
            let entry = entry
                .as_object()
                .ok_or_else(|| format!("`hooks.{event}[{i}]` must be an object"))?;
            if entry.get("matcher").is_some_and(|m| !m.is_string()) {
                return Err(format!("`hooks.{event}[{i}].matcher` must be a string"));
            }
            if entry.get("hooks").is_some_and(|h| !h.is_array()) {
                return Err(format!("`hooks.{event}[{i}].hooks` must be an array"));
            }
        }
    }
    Ok(())
}

/// Write bytes to a temp file in the destination directory, then rename it
/// over the target. The temp file is removed on every failure path.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    // Write through symlinks instead of replacing them.
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(&target) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}
