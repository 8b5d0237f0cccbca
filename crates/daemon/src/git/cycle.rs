// One commit cycle: add → message → commit → push.
//
// Every step runs regardless of how the previous one went; failures are
// logged with their exit code and never retried.

use tracing::{info, warn};

use crate::config::AutoCommitConfig;

use super::prompt::{resolve_message, MessagePrompt, MessageSource};
use super::worker::{CommandExecutor, GitWorker, GitWorkerError};

/// The parts of the config a cycle needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
    pub author: String,
    pub default_message: String,
    pub do_add: bool,
    pub do_push: bool,
    /// When false the operator is asked for a message every cycle.
    pub auto_commit: bool,
}

impl From<&AutoCommitConfig> for CycleSettings {
    fn from(config: &AutoCommitConfig) -> Self {
        Self {
            author: config.author.clone(),
            default_message: config.commit_message.clone(),
            do_add: config.do_add,
            do_push: config.do_push,
            auto_commit: config.auto_commit,
        }
    }
}

/// Result of a single git step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    /// Process ran and exited non-zero (`None` when killed by a signal).
    Failed { code: Option<i32> },
    /// Process could not be started.
    SpawnFailed { message: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }

    fn from_result(step: &str, result: Result<(), GitWorkerError>) -> Self {
        match result {
            Ok(()) => {
                info!("git {step} exited with code 0");
                StepOutcome::Succeeded
            }
            Err(GitWorkerError::CommandFailed { code, .. }) => {
                match code {
                    Some(code) => warn!("git {step} exited with code {code}"),
                    None => warn!("git {step} was terminated by a signal"),
                }
                StepOutcome::Failed { code }
            }
            Err(error) => {
                warn!(%error, "git {step} could not be run");
                StepOutcome::SpawnFailed { message: error.to_string() }
            }
        }
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// `None` when staging is disabled.
    pub add: Option<StepOutcome>,
    pub message: String,
    pub message_source: MessageSource,
    pub commit: StepOutcome,
    /// `None` when pushing is disabled.
    pub push: Option<StepOutcome>,
}

/// Runs commit cycles against one repository.
pub struct CommitCycle<E, P> {
    worker: GitWorker<E>,
    prompt: P,
    settings: CycleSettings,
}

impl<E: CommandExecutor, P: MessagePrompt> CommitCycle<E, P> {
    pub fn new(worker: GitWorker<E>, prompt: P, settings: CycleSettings) -> Self {
        Self { worker, prompt, settings }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Run one cycle. Git calls block the calling task; the operator
    /// prompt is the only await point.
    pub async fn run(&mut self) -> CycleReport {
        info!(repo = %self.worker.repo_path().display(), "commit cycle started");

        let add = self
            .settings
            .do_add
            .then(|| StepOutcome::from_result("add", self.worker.add()));

        let (message, message_source) = if self.settings.auto_commit {
            (self.settings.default_message.clone(), MessageSource::Default)
        } else {
            let outcome = self.prompt.read_message().await;
            resolve_message(outcome, &self.settings.default_message)
        };

        let commit = StepOutcome::from_result(
            "commit",
            self.worker.commit(&message, &self.settings.author),
        );

        let push =
            self.settings.do_push.then(|| StepOutcome::from_result("push", self.worker.push()));

        info!(?message_source, "commit cycle finished");

        CycleReport { add, message, message_source, commit, push }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use super::super::prompt::PromptOutcome;
    use super::super::worker::tests::{exited, MockExecutor};
    use super::*;

    /// Replays canned outcomes; counts how often it was asked.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedPrompt {
        replies: Arc<Mutex<VecDeque<PromptOutcome>>>,
        asked: Arc<Mutex<usize>>,
    }

    impl ScriptedPrompt {
        pub fn new(replies: Vec<PromptOutcome>) -> Self {
            Self { replies: Arc::new(Mutex::new(replies.into())), asked: Arc::default() }
        }

        pub fn times_asked(&self) -> usize {
            *self.asked.lock().expect("prompt lock poisoned")
        }
    }

    impl MessagePrompt for ScriptedPrompt {
        async fn read_message(&mut self) -> PromptOutcome {
            *self.asked.lock().expect("prompt lock poisoned") += 1;
            self.replies.lock().expect("prompt lock poisoned").pop_front().unwrap_or(PromptOutcome::Closed)
        }
    }

    pub(crate) fn settings(do_add: bool, do_push: bool, auto_commit: bool) -> CycleSettings {
        CycleSettings {
            author: "Bot <bot@example.test>".to_string(),
            default_message: "autocommit".to_string(),
            do_add,
            do_push,
            auto_commit,
        }
    }

    fn cycle(
        mock: &MockExecutor,
        prompt: &ScriptedPrompt,
        settings: CycleSettings,
    ) -> CommitCycle<MockExecutor, ScriptedPrompt> {
        CommitCycle::new(
            GitWorker::with_executor("/tmp/project", mock.clone()),
            prompt.clone(),
            settings,
        )
    }

    #[tokio::test]
    async fn non_interactive_runs_add_commit_push_in_order() {
        let mock = MockExecutor::default();
        let prompt = ScriptedPrompt::default();

        let report = cycle(&mock, &prompt, settings(true, true, true)).run().await;

        assert_eq!(mock.subcommands(), vec!["add", "commit", "push"]);
        let calls = mock.calls();
        assert_eq!(calls[1].args, vec!["commit", "-m", "autocommit", "--author=Bot <bot@example.test>"]);
        assert!(calls.iter().all(|c| c.cwd == PathBuf::from("/tmp/project")));
        assert_eq!(prompt.times_asked(), 0);
        assert_eq!(report.message_source, MessageSource::Default);
        assert_eq!(report.add, Some(StepOutcome::Succeeded));
        assert_eq!(report.push, Some(StepOutcome::Succeeded));
    }

    #[tokio::test]
    async fn disabled_steps_are_skipped() {
        let mock = MockExecutor::default();
        let prompt = ScriptedPrompt::default();

        let report = cycle(&mock, &prompt, settings(false, false, true)).run().await;

        assert_eq!(mock.subcommands(), vec!["commit"]);
        assert!(report.add.is_none());
        assert!(report.push.is_none());
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_cycle() {
        let mock = MockExecutor::new(vec![exited(128), exited(1), exited(1)]);
        let prompt = ScriptedPrompt::default();

        let report = cycle(&mock, &prompt, settings(true, true, true)).run().await;

        assert_eq!(mock.subcommands(), vec!["add", "commit", "push"]);
        assert_eq!(report.add, Some(StepOutcome::Failed { code: Some(128) }));
        assert_eq!(report.commit, StepOutcome::Failed { code: Some(1) });
        assert_eq!(report.push, Some(StepOutcome::Failed { code: Some(1) }));
    }

    #[tokio::test]
    async fn spawn_failure_is_recorded_and_cycle_continues() {
        let mock = MockExecutor::new(vec![Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "git not found",
        ))]);
        let prompt = ScriptedPrompt::default();

        let report = cycle(&mock, &prompt, settings(true, false, true)).run().await;

        assert!(matches!(report.add, Some(StepOutcome::SpawnFailed { .. })));
        assert!(report.commit.is_success());
    }

    #[tokio::test]
    async fn interactive_blank_input_uses_default_message() {
        let mock = MockExecutor::default();
        let prompt = ScriptedPrompt::new(vec![PromptOutcome::Blank]);

        let report = cycle(&mock, &prompt, settings(true, false, false)).run().await;

        assert_eq!(prompt.times_asked(), 1);
        assert_eq!(report.message, "autocommit");
        assert_eq!(report.message_source, MessageSource::Default);
        assert_eq!(mock.calls()[1].args[2], "autocommit");
    }

    #[tokio::test]
    async fn interactive_input_overrides_default_message() {
        let mock = MockExecutor::default();
        let prompt = ScriptedPrompt::new(vec![PromptOutcome::Entered("feat: add index".into())]);

        let report = cycle(&mock, &prompt, settings(true, false, false)).run().await;

        assert_eq!(report.message, "feat: add index");
        assert_eq!(report.message_source, MessageSource::Operator);
        assert_eq!(
            mock.calls()[1].args,
            vec!["commit", "-m", "feat: add index", "--author=Bot <bot@example.test>"]
        );
    }

    #[tokio::test]
    async fn prompt_happens_after_add_and_before_commit() {
        let mock = MockExecutor::default();
        let probe = mock.clone();

        struct OrderProbe {
            mock: MockExecutor,
            seen: Arc<Mutex<Vec<String>>>,
        }
        impl MessagePrompt for OrderProbe {
            async fn read_message(&mut self) -> PromptOutcome {
                *self.seen.lock().unwrap() = self.mock.subcommands();
                PromptOutcome::Blank
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut cycle = CommitCycle::new(
            GitWorker::with_executor("/tmp/project", mock),
            OrderProbe { mock: probe, seen: seen.clone() },
            settings(true, true, false),
        );
        cycle.run().await;

        assert_eq!(*seen.lock().unwrap(), vec!["add"]);
    }

    #[test]
    fn settings_from_config() {
        let map = crate::config::ConfigMap::parse(
            "WatchPath=/w\nProjectPath=/p\nDoPush=true\nAutoCommit=true\nCommitMessage=save\n",
        );
        let config = AutoCommitConfig::from_map(&map).unwrap();
        let settings = CycleSettings::from(&config);
        assert!(settings.do_add);
        assert!(settings.do_push);
        assert!(settings.auto_commit);
        assert_eq!(settings.default_message, "save");
        assert_eq!(settings.author, crate::config::DEFAULT_AUTHOR);
    }
}
