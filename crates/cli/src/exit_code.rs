// Exit codes for the autocommit binary.
//
//   0  = clean shutdown
//   1  = general error (watcher or runtime setup failed)
//   2  = usage/argument error (emitted by clap itself, never mapped here)
//   10 = config file missing or unreadable
//   11 = required config key missing

use autocommit_daemon::config::ConfigError;

/// Appended to `--help`.
pub const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   stopped with Ctrl-C
  1   runtime error (e.g. watch path cannot be watched)
  2   invalid command-line arguments
  10  config file missing or unreadable
  11  required config key missing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    ConfigUnreadable = 10,
    ConfigInvalid = 11,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
                return match config_err {
                    ConfigError::Unreadable { .. } => Self::ConfigUnreadable,
                    ConfigError::MissingKey(_) => Self::ConfigInvalid,
                };
            }
        }

        Self::Error
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Error.code(), 1);
        assert_eq!(ExitCode::ConfigUnreadable.code(), 10);
        assert_eq!(ExitCode::ConfigInvalid.code(), 11);
    }

    #[test]
    fn missing_key_is_config_invalid() {
        let err = anyhow::Error::new(ConfigError::MissingKey("WatchPath"));
        assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigInvalid);
    }

    #[test]
    fn unreadable_file_is_config_unreadable() {
        let err = anyhow::Error::new(ConfigError::Unreadable {
            path: "autocommit.conf".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        });
        assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigUnreadable);
    }

    #[test]
    fn config_error_found_behind_context() {
        let result: Result<(), ConfigError> = Err(ConfigError::MissingKey("ProjectPath"));
        let err = result.context("startup failed").unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigInvalid);
    }

    #[test]
    fn other_errors_are_general() {
        let err = anyhow::anyhow!("failed to start file watcher");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Error);
    }
}
