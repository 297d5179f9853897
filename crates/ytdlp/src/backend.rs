//! The opaque resolver capability and its production implementation.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::ResolverError;

const DEFAULT_BINARY: &str = "yt-dlp";

/// Captured output of one resolver invocation.
#[derive(Debug, Clone, Default)]
pub struct ResolverOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl ResolverOutput {
    /// The text worth parsing: stdout when non-empty, stderr otherwise.
    /// The tool reports usable lines on stderr for some inputs even with a
    /// non-zero exit, so the exit status does not gate parsing.
    pub fn text(&self) -> &str {
        let out = self.stdout.trim();
        if out.is_empty() { self.stderr.trim() } else { out }
    }
}

/// Authentication material forwarded to the resolver binary.
///
/// The two sources are mutually exclusive; the cookie file takes precedence
/// when both are configured.
#[derive(Debug, Clone, Default)]
pub struct ResolverAuth {
    /// Path of a cookies file, passed as `--cookies`.
    pub cookies: Option<String>,
    /// Browser name, passed as `--cookies-from-browser`.
    pub cookies_from_browser: Option<String>,
}

impl ResolverAuth {
    fn args(&self) -> Vec<String> {
        if let Some(path) = &self.cookies {
            vec!["--cookies".to_string(), path.clone()]
        } else if let Some(browser) = &self.cookies_from_browser {
            vec!["--cookies-from-browser".to_string(), browser.clone()]
        } else {
            Vec::new()
        }
    }
}

/// One invocation of the external resolver: run it with the given operation
/// arguments and capture whatever it printed.
///
/// Implementations must be idempotent from the caller's perspective; the
/// client retries transport failures. The call itself carries no timeout —
/// the client enforces one and drops the future, so implementations must
/// not leak work past cancellation.
#[async_trait]
pub trait ResolverBackend: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<ResolverOutput, ResolverError>;
}

/// Production backend: spawns the `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlpRunner {
    binary: String,
    auth: ResolverAuth,
}

impl YtDlpRunner {
    pub fn new(auth: ResolverAuth) -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            auth,
        }
    }

    /// Override the binary path, e.g. a pinned build outside `PATH`.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl ResolverBackend for YtDlpRunner {
    async fn run(&self, args: &[String]) -> Result<ResolverOutput, ResolverError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(self.auth.args())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The client aborts timed-out calls by dropping this future;
            // the child must die with it.
            .kill_on_drop(true);

        let out = cmd.output().await.map_err(ResolverError::Spawn)?;
        Ok(ResolverOutput {
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            success: out.status.success(),
        })
    }
}
