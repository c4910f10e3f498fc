//! Fetch engine backed by an external fetcher program

use super::parser::parse_progress_line;
use super::traits::ProgressSource;
use crate::config::SourceConfig;
use crate::error::{Error, FetchError};
use crate::types::ProgressSnapshot;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Placeholder replaced by the classified identifier in argument templates
const ID_PLACEHOLDER: &str = "{id}";

/// Status reported at the start of every fetch
const STATUS_INITIALIZING: &str = "Initializing";

/// Fetch engine that runs an external program per job
///
/// The program receives the expanded argument template for the fetch kind and
/// reports progress on stdout, one line at a time (see
/// [`parse_progress_line`](super::parse_progress_line)). A non-zero exit fails the
/// fetch with the last non-empty stderr line as the reason. The child is killed if
/// the fetch future is dropped.
///
/// # Examples
///
/// ```no_run
/// use fetch_queue::source::{CommandSource, ProgressSource};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = CommandSource::new(PathBuf::from("/usr/local/bin/fetcher"))
///     .with_args(
///         vec!["--post".into(), "{id}".into()],
///         vec!["--profile".into(), "{id}".into()],
///     );
///
/// source.fetch_single("ABC123").await?;
/// # Ok(())
/// # }
/// ```
pub struct CommandSource {
    binary_path: PathBuf,
    single_args: Vec<String>,
    collection_args: Vec<String>,
    working_dir: Option<PathBuf>,
    progress: Arc<Mutex<ProgressSnapshot>>,
}

impl CommandSource {
    /// Create a source for an explicit program path with the default argument templates
    pub fn new(binary_path: PathBuf) -> Self {
        let defaults = SourceConfig::default();
        Self {
            binary_path,
            single_args: defaults.single_args,
            collection_args: defaults.collection_args,
            working_dir: None,
            progress: Arc::new(Mutex::new(ProgressSnapshot::default())),
        }
    }

    /// Build a source from configuration
    ///
    /// Uses `program` when set, otherwise searches PATH for `program_name` if
    /// `search_path` is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no program could be located.
    pub fn from_config(config: &SourceConfig) -> crate::Result<Self> {
        let binary_path = match (&config.program, config.search_path) {
            (Some(path), _) => path.clone(),
            (None, true) => which::which(&config.program_name).map_err(|e| Error::Config {
                message: format!("fetcher '{}' not found in PATH: {}", config.program_name, e),
                key: Some("source.program_name".to_string()),
            })?,
            (None, false) => {
                return Err(Error::Config {
                    message: "no fetcher program configured and PATH search disabled".to_string(),
                    key: Some("source.program".to_string()),
                });
            }
        };

        let mut source = Self::new(binary_path)
            .with_args(config.single_args.clone(), config.collection_args.clone());
        source.working_dir = config.working_dir.clone();
        Ok(source)
    }

    /// Replace the argument templates for both fetch kinds
    pub fn with_args(mut self, single_args: Vec<String>, collection_args: Vec<String>) -> Self {
        self.single_args = single_args;
        self.collection_args = collection_args;
        self
    }

    /// Run the fetcher in the given directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Path of the fetcher program
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn set_progress(&self, snapshot: ProgressSnapshot) {
        match self.progress.lock() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    fn current_progress(&self) -> ProgressSnapshot {
        match self.progress.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn run(&self, template: &[String], identifier: &str) -> crate::Result<()> {
        self.set_progress(ProgressSnapshot::new(0, 0, STATUS_INITIALIZING));

        let args = expand_args(template, identifier);
        tracing::debug!(
            program = %self.binary_path.display(),
            ?args,
            "Launching fetcher"
        );

        let mut command = Command::new(&self.binary_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(FetchError::Launch)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let read_progress = async {
            if let Some(stdout) = stdout {
                read_lines(stdout, "stdout", |line| {
                    if let Some(next) = parse_progress_line(line, &self.current_progress()) {
                        self.set_progress(next);
                    }
                })
                .await;
            }
        };

        let read_last_error = async {
            let mut last = None;
            if let Some(stderr) = stderr {
                read_lines(stderr, "stderr", |line| {
                    let line = line.trim();
                    if !line.is_empty() {
                        last = Some(line.to_string());
                    }
                })
                .await;
            }
            last
        };

        let ((), last_error, status) = tokio::join!(read_progress, read_last_error, child.wait());
        let status = status?;

        if status.success() {
            return Ok(());
        }

        let reason = last_error.unwrap_or_else(|| format!("fetcher exited with {}", status));
        Err(FetchError::Failed(reason).into())
    }
}

#[async_trait]
impl ProgressSource for CommandSource {
    async fn fetch_single(&self, identifier: &str) -> crate::Result<()> {
        self.run(&self.single_args, identifier).await
    }

    async fn fetch_collection(&self, identifier: &str) -> crate::Result<()> {
        self.run(&self.collection_args, identifier).await
    }

    fn snapshot(&self) -> crate::Result<ProgressSnapshot> {
        self.progress
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| Error::Snapshot("progress state poisoned".to_string()))
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Feed every line of `reader` to `on_line` until EOF
///
/// Lines that are not valid UTF-8 are decoded lossily. The pipe is always read to
/// the end, even after a read error, so the fetcher never blocks or dies of SIGPIPE.
async fn read_lines<R>(reader: R, stream: &'static str, mut on_line: impl FnMut(&str))
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => on_line(&String::from_utf8_lossy(&buf)),
            Err(e) => {
                tracing::warn!(stream, error = %e, "Failed to read fetcher output, discarding the rest");
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    tracing::debug!(stream, error = %e, "Fetcher output closed");
                }
                return;
            }
        }
    }
}

fn expand_args(template: &[String], identifier: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace(ID_PLACEHOLDER, identifier))
        .collect()
}
