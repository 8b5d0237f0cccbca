// Configuration file for the autocommit daemon.
//
// Plain `key=value` text, `#` starts a comment, last duplicate key wins.
// Default location: `./autocommit.conf`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::watcher::EventFilter;

/// Config file name used when no path is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "autocommit.conf";

pub const DEFAULT_AUTHOR: &str = "AutoCommit Bot <autocommit@local.int>";
pub const DEFAULT_COMMIT_MESSAGE: &str = "autocommit";
pub const DEFAULT_COMMIT_INTERVAL_SECS: u64 = 1800;

/// Upper bound for any duration key (one year). Larger values would
/// overflow timer deadlines.
pub const MAX_DURATION_SECS: i64 = 365 * 86_400;

const KEY_WATCH_PATH: &str = "WatchPath";
const KEY_PROJECT_PATH: &str = "ProjectPath";
const KEY_AUTHOR: &str = "Author";
const KEY_COMMIT_MESSAGE: &str = "CommitMessage";
const KEY_DO_ADD: &str = "DoAdd";
const KEY_DO_PUSH: &str = "DoPush";
const KEY_AUTO_COMMIT: &str = "AutoCommit";
const KEY_COMMIT_INTERVAL: &str = "CommitInterval";
const KEY_WATCH_EVENTS: &str = "WatchEvents";
const KEY_PROMPT_TIMEOUT: &str = "PromptTimeout";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file `{}` could not be read: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("required config key `{0}` is missing")]
    MissingKey(&'static str),
}

// ── Raw key/value map ──────────────────────────────────────────────

/// Raw `key=value` pairs as read from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMap {
    entries: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Parse config text. Malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

        for line in text.lines() {
            let content = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };

            let Some((key, value)) = content.split_once('=') else {
                continue;
            };

            let key = key.trim();
            if key.is_empty() {
                continue;
            }

            entries.insert(key.to_string(), value.trim().to_string());
        }

        Self { entries }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Unreadable { path: path.to_path_buf(), source })?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingKey(key))
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match parse_bool(raw) {
            Some(value) => value,
            None => {
                warn!(key, value = raw, default, "invalid boolean in config, using default");
                default
            }
        }
    }

    fn secs_or(&self, key: &str, default: u64, allow_zero: bool) -> u64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.parse::<i64>() {
            Ok(secs) if secs <= MAX_DURATION_SECS && (secs > 0 || (allow_zero && secs == 0)) => {
                secs as u64
            }
            _ => {
                warn!(key, value = raw, default, "invalid duration in config, using default");
                default
            }
        }
    }
}

/// Accepts `true`/`false` in any letter case.
fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// ── Resolved config ────────────────────────────────────────────────

/// Fully resolved daemon configuration. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoCommitConfig {
    /// Directory tree observed for changes.
    pub watch_path: PathBuf,
    /// Working directory for every git invocation.
    pub project_path: PathBuf,
    /// Passed verbatim as `--author=<author>`.
    pub author: String,
    /// Used when non-interactive or when the operator enters nothing.
    pub commit_message: String,
    /// Run `git add *` before committing.
    pub do_add: bool,
    /// Run `git push` after committing.
    pub do_push: bool,
    /// Skip the operator prompt.
    pub auto_commit: bool,
    pub commit_interval: Duration,
    /// Filesystem event kinds that mark the tree dirty.
    pub watch_events: EventFilter,
    /// `None` waits for operator input indefinitely.
    pub prompt_timeout: Option<Duration>,
}

impl AutoCommitConfig {
    /// Read and resolve the config file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::from_map(&ConfigMap::load_from(path)?)
    }

    pub fn from_map(map: &ConfigMap) -> Result<Self, ConfigError> {
        let watch_path = PathBuf::from(map.require(KEY_WATCH_PATH)?);
        let project_path = PathBuf::from(map.require(KEY_PROJECT_PATH)?);

        let watch_events = match map.get(KEY_WATCH_EVENTS) {
            Some(raw) => EventFilter::parse(raw),
            None => EventFilter::all(),
        };

        let prompt_timeout = match map.secs_or(KEY_PROMPT_TIMEOUT, 0, true) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            watch_path,
            project_path,
            author: map.string_or(KEY_AUTHOR, DEFAULT_AUTHOR),
            commit_message: map.string_or(KEY_COMMIT_MESSAGE, DEFAULT_COMMIT_MESSAGE),
            do_add: map.bool_or(KEY_DO_ADD, true),
            do_push: map.bool_or(KEY_DO_PUSH, false),
            auto_commit: map.bool_or(KEY_AUTO_COMMIT, false),
            commit_interval: Duration::from_secs(map.secs_or(
                KEY_COMMIT_INTERVAL,
                DEFAULT_COMMIT_INTERVAL_SECS,
                false,
            )),
            watch_events,
            prompt_timeout,
        })
    }

    /// Log the resolved configuration, one key per line.
    pub fn log_banner(&self) {
        info!("{KEY_WATCH_PATH} = {}", self.watch_path.display());
        info!("{KEY_PROJECT_PATH} = {}", self.project_path.display());
        info!("{KEY_AUTHOR} = {}", self.author);
        info!("{KEY_COMMIT_MESSAGE} = {}", self.commit_message);
        info!("{KEY_COMMIT_INTERVAL} = {}", HumanInterval(self.commit_interval));
        info!("{KEY_DO_ADD} = {}", self.do_add);
        info!("{KEY_DO_PUSH} = {}", self.do_push);
        info!("{KEY_AUTO_COMMIT} = {}", self.auto_commit);
        info!("{KEY_WATCH_EVENTS} = {}", self.watch_events);
        match self.prompt_timeout {
            Some(timeout) => info!("{KEY_PROMPT_TIMEOUT} = {}", HumanInterval(timeout)),
            None => info!("{KEY_PROMPT_TIMEOUT} = none"),
        }
    }
}

/// Renders a duration as `HH:MM:SS`, with a leading day count when needed.
pub struct HumanInterval(pub Duration);

impl fmt::Display for HumanInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.as_secs();
        let days = total / 86_400;
        let hours = (total % 86_400) / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        if days > 0 {
            write!(f, "{days}.")?;
        }
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}
