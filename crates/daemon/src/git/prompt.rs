// Operator prompt for interactive commit messages.
//
// The prompt is the one place a commit cycle can wait on a human. It is an
// async suspension point with an optional timeout; the commit loop can also
// abandon it on shutdown.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::{debug, warn};

/// Three terminal bells, emitted before prompting.
const ALERT: &[u8] = b"\x07\x07\x07";

const PROMPT_TEXT: &str = "Please input a commit message:";

/// What the operator gave us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// A non-blank line, trimmed of its line terminator.
    Entered(String),
    /// Empty or whitespace-only line.
    Blank,
    /// No line within the configured timeout.
    TimedOut,
    /// Input stream closed.
    Closed,
    /// Reading failed.
    Failed(String),
}

/// Where the final commit message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    Operator,
    Default,
}

/// Pick the commit message: operator input if usable, else the default.
pub fn resolve_message(outcome: PromptOutcome, default: &str) -> (String, MessageSource) {
    match outcome {
        PromptOutcome::Entered(line) => (line, MessageSource::Operator),
        PromptOutcome::Blank => (default.to_string(), MessageSource::Default),
        PromptOutcome::TimedOut => {
            warn!("no commit message entered before timeout, using default");
            (default.to_string(), MessageSource::Default)
        }
        PromptOutcome::Closed => {
            warn!("console input closed, using default commit message");
            (default.to_string(), MessageSource::Default)
        }
        PromptOutcome::Failed(error) => {
            warn!(%error, "failed to read commit message, using default");
            (default.to_string(), MessageSource::Default)
        }
    }
}

/// Ring the bell and ask for a message. Goes straight to the console so
/// the operator sees it whatever the log filter is.
fn announce(out: &mut impl Write) -> std::io::Result<()> {
    out.write_all(ALERT)?;
    writeln!(out, "{PROMPT_TEXT}")?;
    out.flush()
}

/// Source of interactive commit messages.
pub trait MessagePrompt: Send {
    fn read_message(&mut self) -> impl Future<Output = PromptOutcome> + Send;
}

/// Reads commit messages line by line from an async reader.
pub struct LinePrompt<R> {
    reader: R,
    timeout: Option<Duration>,
    alert: bool,
}

/// Prompt wired to the process console.
pub type StdinPrompt = LinePrompt<BufReader<Stdin>>;

impl StdinPrompt {
    pub fn stdin(timeout: Option<Duration>) -> Self {
        LinePrompt::new(BufReader::new(tokio::io::stdin()), timeout)
    }
}

impl<R: AsyncBufRead + Unpin + Send> LinePrompt<R> {
    pub fn new(reader: R, timeout: Option<Duration>) -> Self {
        Self { reader, timeout, alert: true }
    }

    /// Skip the bell and prompt text.
    pub fn without_alert(mut self) -> Self {
        self.alert = false;
        self
    }

    async fn read_line(&mut self) -> PromptOutcome {
        let mut line = String::new();
        match self.reader.read_line(&mut line).await {
            Ok(0) => PromptOutcome::Closed,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if trimmed.trim().is_empty() {
                    PromptOutcome::Blank
                } else {
                    PromptOutcome::Entered(trimmed.to_string())
                }
            }
            Err(error) => PromptOutcome::Failed(error.to_string()),
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> MessagePrompt for LinePrompt<R> {
    async fn read_message(&mut self) -> PromptOutcome {
        if self.alert {
            if let Err(error) = announce(&mut std::io::stdout()) {
                warn!(%error, "failed to write commit message prompt");
            }
        }
        debug!("waiting for commit message");

        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.read_line()).await {
                Ok(outcome) => outcome,
                Err(_) => PromptOutcome::TimedOut,
            },
            None => self.read_line().await,
        }
    }
}
