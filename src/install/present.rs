//! Diff presentation: coloring, paging and the confirmation prompt.
//!
//! Terminal access goes through the [`Console`] trait so the install flow can
//! be driven without a real TTY.

use console::Style;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Question asked before writing the settings file.
pub const APPLY_PROMPT: &str = "Apply these changes?";

/// Terminal side effects of an install run.
pub trait Console {
    /// True when both stdin and stdout are attached to a terminal.
    fn is_interactive(&self) -> bool;
    /// Show (already colored) text to the operator, through a pager if possible.
    fn page(&mut self, text: &str) -> io::Result<()>;
    /// Print text to standard output as-is.
    fn print(&mut self, text: &str) -> io::Result<()>;
    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&mut self, question: &str) -> bool;
}

/// The process's real stdin/stdout.
#[derive(Debug, Default)]
pub struct Terminal;

impl Console for Terminal {
    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal() && io::stdout().is_terminal()
    }

    fn page(&mut self, text: &str) -> io::Result<()> {
        show_in_pager(text)
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        print_stdout(text)
    }

    fn confirm(&mut self, question: &str) -> bool {
        confirm(&mut io::stdin().lock(), &mut io::stdout(), question)
    }
}

/// Show `diff` on `console`: colored through the pager when interactive,
/// raw on stdout otherwise.
pub fn display(console: &mut dyn Console, diff: &str) -> io::Result<()> {
    if console.is_interactive() {
        console.page(&colorize(diff))
    } else {
        console.print(diff)
    }
}

fn print_stdout(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

/// Add ANSI styling to a unified diff.
///
/// - `---`/`+++` file headers: bold
/// - `@@` hunk headers: cyan
/// - removed lines: red
/// - added lines: green
///
/// Context lines pass through unchanged.
pub fn colorize(diff: &str) -> String {
    let header = Style::new().bold().force_styling(true);
    let hunk = Style::new().cyan().force_styling(true);
    let removed = Style::new().red().force_styling(true);
    let added = Style::new().green().force_styling(true);

    let mut out = String::with_capacity(diff.len() + diff.len() / 4);
    for line in diff.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        let style = if body.starts_with("--- ") || body.starts_with("+++ ") {
            Some(&header)
        } else if body.starts_with("@@") {
            Some(&hunk)
        } else if body.starts_with('-') {
            Some(&removed)
        } else if body.starts_with('+') {
            Some(&added)
        } else {
            None
        };
        match style {
            Some(style) => out.push_str(&style.apply_to(body).to_string()),
            None => out.push_str(body),
        }
        out.push_str(newline);
    }
    out
}

/// How to start the pager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerCommand {
    /// `$PAGER`, run through `sh -c` so it may carry its own arguments.
    Shell(String),
    Program(PathBuf, Vec<&'static str>),
}

/// Resolve the pager: `$PAGER`, then `less -R`, then `more`.
pub fn pager_command(
    env_pager: Option<String>,
    which: impl Fn(&str) -> Option<PathBuf>,
) -> Option<PagerCommand> {
    if let Some(pager) = env_pager.filter(|p| !p.trim().is_empty()) {
        return Some(PagerCommand::Shell(pager));
    }
    if let Some(less) = which("less") {
        return Some(PagerCommand::Program(less, vec!["-R"]));
    }
    which("more").map(|more| PagerCommand::Program(more, Vec::new()))
}

fn system_pager() -> Option<PagerCommand> {
    pager_command(std::env::var("PAGER").ok(), |name| which::which(name).ok())
}

/// Page `text`, falling back to printing it when no pager can be started.
pub fn show_in_pager(text: &str) -> io::Result<()> {
    let Some(pager) = system_pager() else {
        debug!("no pager available, printing directly");
        return print_stdout(text);
    };
    if let Err(e) = run_pager(&pager, text) {
        warn!("failed to start pager {pager:?}: {e}");
        return print_stdout(text);
    }
    Ok(())
}

/// Feed `text` to the pager and wait for it to exit.
///
/// Quitting the pager before reading everything shows up as a broken pipe or
/// a non-zero exit; both count as a normal close.
fn run_pager(pager: &PagerCommand, text: &str) -> io::Result<()> {
    let mut command = match pager {
        PagerCommand::Shell(line) => {
            let mut c = Command::new("sh");
            c.arg("-c").arg(line);
            c
        }
        PagerCommand::Program(path, args) => {
            let mut c = Command::new(path);
            c.args(args);
            c
        }
    };
    let mut child = command.stdin(Stdio::piped()).spawn()?;

    if let Some(mut stdin) = child.stdin.take()
        && let Err(e) = stdin.write_all(text.as_bytes())
        && e.kind() != io::ErrorKind::BrokenPipe
    {
        warn!("failed writing to pager: {e}");
    }

    let status = child.wait()?;
    if !status.success() {
        debug!("pager exited with {status}");
    }
    Ok(())
}

/// Prompt with `question [y/N] ` and read one line.
///
/// Only `y`/`yes` (any case, surrounding whitespace ignored) confirm; EOF and
/// read errors count as no.
pub fn confirm(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> bool {
    let _ = write!(output, "{question} [y/N] ");
    let _ = output.flush();

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => {
            let _ = writeln!(output);
            false
        }
        Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
    }
}
