//! Hook merge engine.
//!
//! Adds this tool's hook commands to a [`SettingsDocument`] without touching
//! anything else. Merging is idempotent: a command already registered under
//! the same event and matcher is never added twice, so merging the result
//! again reports no change.
//!
//! # Claude Code hooks config:
//! ```json
//! { "hooks": { "Stop": [ { "hooks": [
//!   { "type": "command", "command": "agent-smith stop", "async": true }
//! ] } ] } }
//! ```

use super::settings::{HOOKS_KEY, SettingsDocument};
use serde_json::{Map, Value, json};
use std::borrow::Cow;

/// Binary name used in generated hook commands.
pub const PROGRAM: &str = "agent-smith";

/// Lifecycle events this tool hooks into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Stop,
    Notification,
}

impl HookEvent {
    /// Key of this event inside the `hooks` table.
    pub fn as_str(self) -> &'static str {
        match self {
            HookEvent::Stop => "Stop",
            HookEvent::Notification => "Notification",
        }
    }
}

/// One hook command this tool wants present in the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookRegistration {
    pub event: HookEvent,
    /// Exact matcher string; empty means the entry has no `matcher` key.
    pub matcher: &'static str,
    /// Subcommand the hook runs, e.g. `stop`.
    pub subcommand: &'static str,
}

/// The built-in registrations.
pub const REGISTRATIONS: &[HookRegistration] = &[
    HookRegistration {
        event: HookEvent::Stop,
        matcher: "",
        subcommand: "stop",
    },
    HookRegistration {
        event: HookEvent::Notification,
        matcher: "permission_prompt|idle_prompt|elicitation_dialog",
        subcommand: "notify",
    },
];

/// Connection flags baked into generated commands so the hooks work without
/// any environment set up at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    pub config_path: Option<String>,
    pub homeserver: Option<String>,
    pub token: Option<String>,
    pub room: Option<String>,
}

impl CommandArgs {
    /// Render the shell command line for `subcommand`.
    ///
    /// With no flags set this is just `agent-smith <subcommand>`.
    pub fn render(&self, subcommand: &str) -> String {
        let mut parts: Vec<Cow<'_, str>> = vec![PROGRAM.into()];
        let flags = [
            ("-c", &self.config_path),
            ("--homeserver", &self.homeserver),
            ("--token", &self.token),
            ("--room", &self.room),
        ];
        for (flag, value) in flags {
            if let Some(value) = value {
                parts.push(flag.into());
                parts.push(shell_escape::unix::escape(value.as_str().into()));
            }
        }
        parts.push(subcommand.into());
        parts.join(" ")
    }
}

/// Outcome of [`merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub document: SettingsDocument,
    /// True iff `document` differs from the input.
    pub changed: bool,
}

/// Merge `registrations` into a copy of `doc`.
///
/// With `replace_stale`, commands previously installed by this tool under the
/// same event and subcommand but with different flags are removed first.
pub fn merge(
    doc: &SettingsDocument,
    registrations: &[HookRegistration],
    args: &CommandArgs,
    replace_stale: bool,
) -> MergeResult {
    let mut document = doc.clone();
    let mut changed = false;

    for registration in registrations {
        let command = args.render(registration.subcommand);
        if replace_stale {
            changed |= remove_stale(document.root_mut(), registration, &command);
        }
        changed |= add_command(document.root_mut(), registration, &command);
    }

    MergeResult { document, changed }
}

fn matcher_of(entry: &Value) -> &str {
    entry.get("matcher").and_then(Value::as_str).unwrap_or("")
}

fn commands_of(entry: &Value) -> impl Iterator<Item = &str> {
    entry
        .get("hooks")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|hook| hook.get("command").and_then(Value::as_str))
}

fn hook_object(command: &str) -> Value {
    json!({
        "type": "command",
        "command": command,
        "async": true
    })
}

fn new_entry(matcher: &str, command: &str) -> Value {
    let mut entry = Map::new();
    if !matcher.is_empty() {
        entry.insert("matcher".to_string(), Value::from(matcher));
    }
    entry.insert("hooks".to_string(), json!([hook_object(command)]));
    Value::Object(entry)
}

fn event_entries<'a>(root: &'a Map<String, Value>, event: HookEvent) -> &'a [Value] {
    root.get(HOOKS_KEY)
        .and_then(|hooks| hooks.get(event.as_str()))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Append `command` unless an entry with the same matcher already has it.
fn add_command(
    root: &mut Map<String, Value>,
    registration: &HookRegistration,
    command: &str,
) -> bool {
    let present = event_entries(root, registration.event)
        .iter()
        .filter(|entry| matcher_of(entry) == registration.matcher)
        .any(|entry| commands_of(entry).any(|c| c == command));
    if present {
        return false;
    }

    // Shapes below were checked when the document was loaded.
    let Some(hooks) = root
        .entry(HOOKS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
    else {
        return false;
    };
    let Some(entries) = hooks
        .entry(registration.event.as_str())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
    else {
        return false;
    };

    let existing = entries
        .iter_mut()
        .find(|entry| matcher_of(entry) == registration.matcher)
        .and_then(Value::as_object_mut);
    match existing {
        Some(entry) => match entry
            .entry("hooks")
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
        {
            Some(list) => list.push(hook_object(command)),
            None => return false,
        },
        None => entries.push(new_entry(registration.matcher, command)),
    }
    true
}

/// True if `command` invokes this tool, e.g. `/usr/local/bin/agent-smith stop`.
fn is_own_command(command: &str, subcommand: &str) -> bool {
    let mut tokens = command.split_whitespace();
    let Some(binary) = tokens.next() else {
        return false;
    };
    let basename = binary.rsplit('/').next().unwrap_or(binary);
    basename == PROGRAM && tokens.next_back() == Some(subcommand)
}

/// Drop this tool's commands for the registration's event that differ from
/// `command`. Entries emptied by the removal are dropped too.
fn remove_stale(
    root: &mut Map<String, Value>,
    registration: &HookRegistration,
    command: &str,
) -> bool {
    let Some(entries) = root
        .get_mut(HOOKS_KEY)
        .and_then(|hooks| hooks.get_mut(registration.event.as_str()))
        .and_then(Value::as_array_mut)
    else {
        return false;
    };

    let is_stale = |hook: &Value| {
        hook.get("command")
            .and_then(Value::as_str)
            .is_some_and(|c| c != command && is_own_command(c, registration.subcommand))
    };

    let mut changed = false;
    entries.retain_mut(|entry| {
        let Some(list) = entry.get_mut("hooks").and_then(Value::as_array_mut) else {
            return true;
        };
        let before = list.len();
        list.retain(|hook| !is_stale(hook));
        if list.len() == before {
            return true;
        }
        changed = true;
        !list.is_empty()
    });
    changed
}
