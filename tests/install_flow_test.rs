use agent_smith::error::InstallError;
use agent_smith::install::{
    CommandArgs, Console, InstallOptions, InstallOutcome, SettingsDocument, run_install,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Console that records what it was asked to show and answers prompts from a
/// script.
#[derive(Default)]
struct ScriptedConsole {
    interactive: bool,
    answers: VecDeque<bool>,
    paged: Vec<String>,
    printed: String,
    prompts: Vec<String>,
}

impl ScriptedConsole {
    fn redirected() -> Self {
        Self::default()
    }

    fn answering(answer: bool) -> Self {
        Self {
            interactive: true,
            answers: VecDeque::from([answer]),
            ..Default::default()
        }
    }
}

impl Console for ScriptedConsole {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn page(&mut self, text: &str) -> io::Result<()> {
        self.paged.push(text.to_string());
        Ok(())
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        self.printed.push_str(text);
        Ok(())
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.prompts.push(question.to_string());
        self.answers.pop_front().unwrap_or(false)
    }
}

fn settings_file(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("settings.json");
    std::fs::write(&path, contents).unwrap();
    path
}

fn options(path: &Path) -> InstallOptions {
    InstallOptions {
        settings_path: path.to_path_buf(),
        ..Default::default()
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn confirmed_install_writes_both_hooks_and_second_run_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let path = settings_file(&dir, "{}");

    let mut console = ScriptedConsole::answering(true);
    let outcome = run_install(&options(&path), &mut console).unwrap();
    assert_eq!(outcome, InstallOutcome::Written);
    assert_eq!(console.prompts, ["Apply these changes?"]);
    assert_eq!(console.paged.len(), 1);
    assert!(console.paged[0].contains('\x1b'));
    assert_eq!(
        console.printed,
        format!("Changes written to {}\n", path.display())
    );

    assert_eq!(
        read_json(&path),
        json!({
            "hooks": {
                "Stop": [
                    {"hooks": [{"type": "command", "command": "agent-smith stop", "async": true}]}
                ],
                "Notification": [
                    {
                        "matcher": "permission_prompt|idle_prompt|elicitation_dialog",
                        "hooks": [{"type": "command", "command": "agent-smith notify", "async": true}]
                    }
                ]
            }
        })
    );
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("{\n  \"hooks\": {\n    \"Stop\": ["));
    assert!(text.ends_with("}\n"));

    let mut again = ScriptedConsole::answering(true);
    let outcome = run_install(&options(&path), &mut again).unwrap();
    assert_eq!(outcome, InstallOutcome::NoChange);
    assert_eq!(again.printed, "No changes needed.\n");
    assert!(again.prompts.is_empty());
    assert!(again.paged.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
}

#[test]
fn redirected_output_prints_plain_diff_and_never_writes() {
    let dir = TempDir::new().unwrap();
    let original = "{\n  \"model\": \"opus\"\n}\n";
    let path = settings_file(&dir, original);

    let mut console = ScriptedConsole::redirected();
    let outcome = run_install(&options(&path), &mut console).unwrap();
    assert_eq!(outcome, InstallOutcome::DiffPrinted);
    assert!(console.prompts.is_empty());
    assert!(console.paged.is_empty());

    let header = format!("--- {0}\n+++ {0}\n@@ ", path.display());
    assert!(console.printed.starts_with(&header));
    assert!(!console.printed.contains('\x1b'));
    assert!(console.printed.contains("-  \"model\": \"opus\"\n"));
    assert!(console.printed.contains("+  \"model\": \"opus\",\n"));
    assert!(console.printed.contains("+            \"command\": \"agent-smith stop\","));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn rejected_install_leaves_file_byte_identical() {
    let dir = TempDir::new().unwrap();
    let original = "{\"permissions\":{\"allow\":[\"Bash(ls)\"]},\"hooks\":{}}";
    let path = settings_file(&dir, original);

    let mut console = ScriptedConsole::answering(false);
    let outcome = run_install(&options(&path), &mut console).unwrap();
    assert_eq!(outcome, InstallOutcome::Rejected);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(console.printed, "No changes applied.\n");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn existing_keys_and_hooks_survive_in_order() {
    let dir = TempDir::new().unwrap();
    let path = settings_file(
        &dir,
        r#"{
  "model": "sonnet",
  "hooks": {
    "PreToolUse": [
      {"matcher": "Bash", "hooks": [{"type": "command", "command": "audit.sh"}]}
    ],
    "Stop": [
      {"hooks": [{"type": "command", "command": "say done"}]}
    ]
  },
  "env": {"FOO": "1"}
}
"#,
    );

    let outcome = run_install(&options(&path), &mut ScriptedConsole::answering(true)).unwrap();
    assert_eq!(outcome, InstallOutcome::Written);

    let doc = SettingsDocument::load(&path).unwrap();
    assert_eq!(doc.keys().collect::<Vec<_>>(), ["model", "hooks", "env"]);
    let hooks: Vec<&str> = doc
        .get("hooks")
        .and_then(Value::as_object)
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(hooks, ["PreToolUse", "Stop", "Notification"]);

    let stop = doc.hook_entries("Stop");
    assert_eq!(stop.len(), 1);
    assert_eq!(
        stop[0]["hooks"],
        json!([
            {"type": "command", "command": "say done"},
            {"type": "command", "command": "agent-smith stop", "async": true}
        ])
    );
    assert_eq!(
        doc.hook_entries("PreToolUse")[0]["hooks"][0]["command"],
        "audit.sh"
    );
}

#[test]
fn connection_flags_are_embedded_in_commands() {
    let dir = TempDir::new().unwrap();
    let path = settings_file(&dir, "{}");
    let env_file = dir.path().join("agent-smith.env");

    let opts = InstallOptions {
        args: CommandArgs {
            config_path: Some(env_file.display().to_string()),
            token: Some("syt secret".to_string()),
            ..Default::default()
        },
        ..options(&path)
    };
    run_install(&opts, &mut ScriptedConsole::answering(true)).unwrap();

    let doc = SettingsDocument::load(&path).unwrap();
    let command = doc.hook_entries("Notification")[0]["hooks"][0]["command"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(
        command,
        format!("agent-smith -c {} --token 'syt secret' notify", env_file.display())
    );
}

#[test]
fn replace_swaps_stale_flags() {
    let dir = TempDir::new().unwrap();
    let path = settings_file(&dir, "{}");
    let with_room = |room: &str| InstallOptions {
        args: CommandArgs {
            room: Some(room.to_string()),
            ..Default::default()
        },
        replace: true,
        ..options(&path)
    };

    run_install(&with_room("old"), &mut ScriptedConsole::answering(true)).unwrap();
    run_install(&with_room("new"), &mut ScriptedConsole::answering(true)).unwrap();

    let doc = SettingsDocument::load(&path).unwrap();
    assert_eq!(
        doc.hook_entries("Stop"),
        [json!({"hooks": [{"type": "command", "command": "agent-smith --room new stop", "async": true}]})]
    );
    let notify = doc.hook_entries("Notification");
    assert_eq!(notify.len(), 1);
    assert_eq!(notify[0]["hooks"].as_array().unwrap().len(), 1);
    assert_eq!(
        notify[0]["hooks"][0]["command"],
        "agent-smith --room new notify"
    );
}

#[test]
fn without_replace_different_flags_accumulate() {
    let dir = TempDir::new().unwrap();
    let path = settings_file(&dir, "{}");
    let with_room = |room: &str| InstallOptions {
        args: CommandArgs {
            room: Some(room.to_string()),
            ..Default::default()
        },
        ..options(&path)
    };

    run_install(&with_room("a"), &mut ScriptedConsole::answering(true)).unwrap();
    run_install(&with_room("b"), &mut ScriptedConsole::answering(true)).unwrap();

    let doc = SettingsDocument::load(&path).unwrap();
    assert_eq!(doc.hook_entries("Stop")[0]["hooks"].as_array().unwrap().len(), 2);
}

#[test]
fn missing_file_is_not_found_unless_create() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".claude").join("settings.json");

    let err = run_install(&options(&path), &mut ScriptedConsole::answering(true)).unwrap_err();
    assert!(matches!(err, InstallError::NotFound { .. }));
    assert!(!path.exists());

    let create = InstallOptions {
        create: true,
        ..options(&path)
    };
    let mut declined = ScriptedConsole::answering(false);
    assert_eq!(
        run_install(&create, &mut declined).unwrap(),
        InstallOutcome::Rejected
    );
    assert!(!path.exists());

    assert_eq!(
        run_install(&create, &mut ScriptedConsole::answering(true)).unwrap(),
        InstallOutcome::Written
    );
    assert_eq!(read_json(&path)["hooks"]["Stop"][0]["hooks"][0]["async"], true);
}

#[test]
fn malformed_settings_are_rejected_before_any_prompt() {
    let dir = TempDir::new().unwrap();
    for contents in ["{not json", "[]", "{\"hooks\": []}", ""] {
        let path = settings_file(&dir, contents);
        let mut console = ScriptedConsole::answering(true);
        let err = run_install(&options(&path), &mut console).unwrap_err();
        assert!(
            matches!(err, InstallError::Parse { .. }),
            "{contents:?} gave {err}"
        );
        assert!(console.prompts.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }
}

#[cfg(unix)]
#[test]
fn failed_write_aborts_and_keeps_original() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("locked");
    std::fs::create_dir(&sub).unwrap();
    let path = sub.join("settings.json");
    std::fs::write(&path, "{}").unwrap();
    std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o500)).unwrap();

    // Root ignores directory permissions; nothing to test there.
    if std::fs::File::create(sub.join("probe")).is_ok() {
        std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o700)).unwrap();
        return;
    }

    let err = run_install(&options(&path), &mut ScriptedConsole::answering(true)).unwrap_err();
    std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o700)).unwrap();

    assert!(matches!(err, InstallError::Aborted(_)));
    assert!(err.to_string().starts_with("aborted, failed to write"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}
