//! Claude Code hook handler
//!
//! Reads a Stop or Notification hook payload, formats a chat message and
//! hands it to a [`MessageSink`]. Invoked as `agent-smith stop` and
//! `agent-smith notify`; see [`crate::install`] for how those commands get
//! registered.

use crate::config::ConfigError;
use crate::matrix::{MessageSink, SendError};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Which hook payload is on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Stop,
    Notify,
}

#[derive(Error, Debug)]
pub enum HookError {
    #[error("failed to parse hook payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Send(#[from] SendError),
}

/// Stop hook payload. Only the fields used for the message are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopPayload {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub stop_hook_active: Option<bool>,
}

/// Notification hook payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
}

fn project_name(cwd: Option<&str>) -> &str {
    super::short_path(cwd.unwrap_or("unknown"))
}

/// Message for a Stop hook.
///
/// Returns `None` while a stop hook is already active, so a hook-triggered
/// continuation does not notify twice.
pub fn format_stop_message(payload: &StopPayload) -> Option<String> {
    if payload.stop_hook_active == Some(true) {
        return None;
    }
    let session_id = payload.session_id.as_deref().unwrap_or("unknown");
    Some(format!(
        "Task complete in **{}** (session `{}`)",
        project_name(payload.cwd.as_deref()),
        super::truncate(session_id, 8)
    ))
}

/// Message for a Notification hook.
pub fn format_notify_message(payload: &NotificationPayload) -> String {
    let label = match payload.notification_type.as_deref() {
        Some("permission_prompt") => "Permission needed",
        Some("idle_prompt") => "Waiting for input",
        Some("elicitation_dialog") => "Question for you",
        _ => "Notification",
    };
    let project = project_name(payload.cwd.as_deref());
    let message = payload.message.as_deref().unwrap_or("Input needed");

    match payload.title.as_deref() {
        Some(title) => format!("{label} in **{project}** — {title}: {message}"),
        None => format!("{label} in **{project}**: {message}"),
    }
}

/// Turn raw hook JSON into the message to send, if any.
pub fn message_for(kind: HookKind, input: &str) -> Result<Option<String>, HookError> {
    let message = match kind {
        HookKind::Stop => format_stop_message(&serde_json::from_str(input)?),
        HookKind::Notify => Some(format_notify_message(&serde_json::from_str(input)?)),
    };
    Ok(message)
}

/// Handle one hook invocation. Returns whether a message was sent.
///
/// `connect` is only called when there is something to send, so a
/// suppressed Stop hook needs no configuration at all.
pub async fn handle<S, F>(kind: HookKind, input: &str, connect: F) -> Result<bool, HookError>
where
    S: MessageSink,
    F: FnOnce() -> Result<S, HookError>,
{
    let Some(message) = message_for(kind, input)? else {
        debug!(?kind, "stop hook already active, nothing to send");
        return Ok(false);
    };
    let sink = connect()?;
    sink.send(&message).await?;
    Ok(true)
}
