//! Matrix connection settings.
//!
//! Values are looked up in order: command-line flags, a `-c/--config` dotenv
//! file, the process environment, then `./.env` in the working directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const HOMESERVER: &str = "MATRIX_HOMESERVER";
pub const ACCESS_TOKEN: &str = "MATRIX_ACCESS_TOKEN";
pub const ROOM_ID: &str = "MATRIX_ROOM_ID";
pub const USER_ID: &str = "MATRIX_USER_ID";

/// Required variables and how they are described when missing.
const REQUIRED: [(&str, &str); 3] = [
    (
        HOMESERVER,
        "Matrix homeserver URL (e.g. https://matrix.example.org)",
    ),
    (ACCESS_TOKEN, "Matrix access token"),
    (ROOM_ID, "Matrix room ID (e.g. !abc:example.org)"),
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variables:\n{}", .0.join("\n"))]
    Missing(Vec<String>),

    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything needed to post to one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixConfig {
    pub homeserver: String,
    pub access_token: String,
    pub room_id: String,
    pub user_id: Option<String>,
}

/// Values supplied on the command line, highest precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides(BTreeMap<String, String>);

impl Overrides {
    /// Collect `-c FILE` contents and the explicit connection flags. Flags
    /// win over the file.
    pub fn from_cli(
        config_file: Option<&Path>,
        homeserver: Option<&str>,
        token: Option<&str>,
        room: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut values = match config_file {
            Some(path) => load_config_file(path)?,
            None => BTreeMap::new(),
        };
        for (key, value) in [(HOMESERVER, homeserver), (ACCESS_TOKEN, token), (ROOM_ID, room)] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                values.insert(key.to_string(), value.to_string());
            }
        }
        Ok(Self(values))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Read `MATRIX_*` variables with non-empty values from a dotenv file.
pub fn load_config_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_dotenv(&text)
        .into_iter()
        .filter(|(key, value)| key.starts_with("MATRIX_") && !value.is_empty())
        .collect())
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, a
/// leading `export ` is allowed and matching outer quotes are removed.
pub fn parse_dotenv(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Resolve the config from `overrides`, falling back to `lookup`.
pub fn resolve(
    overrides: &Overrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<MatrixConfig, ConfigError> {
    let get = |key: &str| {
        overrides
            .get(key)
            .map(String::from)
            .or_else(|| lookup(key))
            .filter(|v| !v.is_empty())
    };

    match (get(HOMESERVER), get(ACCESS_TOKEN), get(ROOM_ID)) {
        (Some(homeserver), Some(access_token), Some(room_id)) => {
            debug!("configuration loaded");
            Ok(MatrixConfig {
                homeserver,
                access_token,
                room_id,
                user_id: get(USER_ID),
            })
        }
        (homeserver, token, room) => {
            let absent = [homeserver.is_none(), token.is_none(), room.is_none()];
            let missing = REQUIRED
                .iter()
                .zip(absent)
                .filter(|(_, absent)| *absent)
                .map(|((key, description), _)| format!("  {key} - {description}"))
                .collect();
            Err(ConfigError::Missing(missing))
        }
    }
}

/// Resolve against the process environment and `./.env`.
///
/// `./.env` never overrides a variable already set in the environment.
pub fn load_config(overrides: &Overrides) -> Result<MatrixConfig, ConfigError> {
    let dotenv: BTreeMap<String, String> = std::fs::read_to_string(".env")
        .map(|text| parse_dotenv(&text).into_iter().collect())
        .unwrap_or_default();
    resolve(overrides, |key| {
        std::env::var(key)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| dotenv.get(key).cloned())
    })
}
