use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Pathspec staged by the commit cycle. Passed to git literally; git
/// expands it against the index and work tree itself.
pub const ADD_ALL_PATHSPEC: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitWorkerError {
    SpawnFailed { command: String, message: String },
    CommandFailed { command: String, code: Option<i32> },
}

impl Display for GitWorkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GitWorkerError::SpawnFailed { command, message } => {
                write!(f, "failed to run `{command}`: {message}")
            }
            GitWorkerError::CommandFailed { command, code: Some(code) } => {
                write!(f, "`{command}` exited with code {code}")
            }
            GitWorkerError::CommandFailed { command, code: None } => {
                write!(f, "`{command}` was terminated by a signal")
            }
        }
    }
}

impl Error for GitWorkerError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
}

/// Runs an external program to completion. Output goes wherever the
/// implementation sends it; only the exit status comes back.
pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

/// Spawns real processes with stdout/stderr inherited from the daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        // stdin stays with the operator prompt.
        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .status()?;
        Ok(CommandResult { success: status.success(), code: status.code() })
    }
}

#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    executor: E,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into(), executor: ProcessCommandExecutor }
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), executor }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Stage everything under the work tree (`git add *`).
    pub fn add(&self) -> Result<(), GitWorkerError> {
        self.run(vec!["add".to_string(), ADD_ALL_PATHSPEC.to_string()])
    }

    pub fn commit(&self, message: &str, author: &str) -> Result<(), GitWorkerError> {
        self.run(vec![
            "commit".to_string(),
            "-m".to_string(),
            message.to_string(),
            format!("--author={author}"),
        ])
    }

    pub fn push(&self) -> Result<(), GitWorkerError> {
        self.run(vec!["push".to_string()])
    }

    fn run(&self, args: Vec<String>) -> Result<(), GitWorkerError> {
        let command = format!("git {}", args.join(" "));
        let result = self.executor.execute("git", &args, &self.repo_path).map_err(|error| {
            GitWorkerError::SpawnFailed { command: command.clone(), message: error.to_string() }
        })?;

        if result.success {
            return Ok(());
        }

        Err(GitWorkerError::CommandFailed { command, code: result.code })
    }
}
