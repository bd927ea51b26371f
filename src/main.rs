//! agent-smith: send messages to a Matrix room from the command line or
//! from Claude Code hooks.

use agent_smith::agents::claude_code::{self, HookError, HookKind};
use agent_smith::config::{self, Overrides};
use agent_smith::install::{self, CommandArgs, InstallOptions, Terminal};
use agent_smith::matrix::{MatrixClient, MessageSink};
use clap::Parser;
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    name = "agent-smith",
    about = "Send messages to a Matrix chat room",
    arg_required_else_help = true
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a config file (dotenv format with MATRIX_* variables)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Matrix homeserver URL
    #[arg(long, value_name = "URL", global = true)]
    homeserver: Option<String>,

    /// Matrix access token
    #[arg(long, value_name = "TOKEN", global = true)]
    token: Option<String>,

    /// Matrix room ID
    #[arg(long, value_name = "ROOM_ID", global = true)]
    room: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Send a message directly
    Send {
        /// Message text, words are joined with spaces
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Read Stop hook JSON from stdin and send a notification
    Stop,
    /// Read Notification hook JSON from stdin and send a notification
    Notify,
    /// Register the stop/notify hooks in a Claude Code settings file
    Install {
        /// Settings file to update [default: ~/.claude/settings.json]
        settings: Option<PathBuf>,
        /// Start from an empty document if the settings file does not exist
        #[arg(long)]
        create: bool,
        /// Remove agent-smith hook commands with outdated flags
        #[arg(long)]
        replace: bool,
    },
}

impl Cli {
    fn overrides(&self) -> Result<Overrides, config::ConfigError> {
        Overrides::from_cli(
            self.config.as_deref(),
            self.homeserver.as_deref(),
            self.token.as_deref(),
            self.room.as_deref(),
        )
    }

    fn command_args(&self) -> CommandArgs {
        CommandArgs {
            config_path: self.config.as_ref().map(|p| p.display().to_string()),
            homeserver: self.homeserver.clone(),
            token: self.token.clone(),
            room: self.room.clone(),
        }
    }

    fn connect(&self) -> Result<MatrixClient, HookError> {
        let config = config::load_config(&self.overrides()?)?;
        Ok(MatrixClient::new(config)?)
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("AGENT_SMITH_LOG")
        .or_else(|_| {
            std::env::var("LOG_LEVEL")
                .map_err(|_| ())
                .and_then(|level| EnvFilter::try_new(level.to_lowercase()).map_err(|_| ()))
        })
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("settings.json"))
}

fn block_on<F: Future>(future: F) -> Result<F::Output, std::io::Error> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(rt.block_on(future))
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn Error>> {
    let command = &cli.command;
    match command {
        Command::Send { message } => {
            let client = cli.connect()?;
            block_on(client.send(&message.join(" ")))??;
            println!("Message sent");
        }
        Command::Stop | Command::Notify => {
            let kind = match command {
                Command::Stop => HookKind::Stop,
                _ => HookKind::Notify,
            };
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            if block_on(claude_code::handle(kind, &input, || cli.connect()))?? {
                println!("Message sent");
            }
        }
        Command::Install {
            settings,
            create,
            replace,
        } => {
            let settings_path = match settings.clone().or_else(default_settings_path) {
                Some(path) => path,
                None => return Err("could not determine home directory".into()),
            };
            debug!(path = %settings_path.display(), "installing hooks");
            let options = InstallOptions {
                settings_path,
                args: cli.command_args(),
                create: *create,
                replace: *replace,
            };
            let outcome = install::run_install(&options, &mut Terminal)?;
            return Ok(ExitCode::from(outcome.exit_code()));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
