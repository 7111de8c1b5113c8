use std::{env, fs, path::Path};

use tracing::debug;

use crate::{errors::Error, Result};

/// Default cap on `message.text`, in characters.
pub const DEFAULT_TEXT_LIMIT: usize = 2000;
/// Default cap on quick replies attached to one message.
pub const DEFAULT_QUICK_REPLY_LIMIT: usize = 13;

/// Typed configuration for the adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    // Webhook security
    pub app_secret: Option<String>,
    pub verify_token: Option<String>,

    // Send API limits
    pub text_limit: usize,
    pub quick_reply_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_secret: None,
            verify_token: None,
            text_limit: DEFAULT_TEXT_LIMIT,
            quick_reply_limit: DEFAULT_QUICK_REPLY_LIMIT,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process env in `load`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let app_secret = lookup("FB_APP_SECRET").and_then(non_empty);
        let verify_token = lookup("FB_VERIFY_TOKEN").and_then(non_empty);

        let text_limit = parse_limit(&lookup, "MESSENGER_TEXT_LIMIT")?.unwrap_or(DEFAULT_TEXT_LIMIT);
        let quick_reply_limit = parse_limit(&lookup, "MESSENGER_QUICK_REPLY_LIMIT")?
            .unwrap_or(DEFAULT_QUICK_REPLY_LIMIT);

        Ok(Self {
            app_secret,
            verify_token,
            text_limit,
            quick_reply_limit,
        })
    }
}

fn parse_limit(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(Error::Config(format!("{key} must be greater than zero"))),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(Error::Config(format!("{key} is not a number: {raw}"))),
    }
}

/// Apply `.env` pairs, leaving variables already in the environment alone.
/// Returns how many were applied.
fn load_dotenv_if_present(path: &Path) -> usize {
    let Ok(contents) = fs::read_to_string(path) else {
        return 0;
    };

    let mut applied = 0;
    for (key, value) in parse_dotenv(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(&key, value);
            applied += 1;
        }
    }
    debug!(path = %path.display(), applied, "loaded .env");
    applied
}

/// `KEY=value` lines, optionally prefixed with `export`. Comments, blank lines
/// and lines without a key are skipped.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter_map(|raw| {
            let line = raw.trim();
            if line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (k, v) = line.split_once('=')?;
            let key = k.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(v.trim()).to_string()))
        })
        .collect()
}

fn unquote(v: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    v
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
