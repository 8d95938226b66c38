// src/exec/process.rs

//! Process Runner.
//!
//! Runs one external command to completion inside the calling task and
//! returns a [`ProcessResult`]. It does not spawn a lifecycle of its own:
//! concurrency and cancellation belong to the background executor wrapping
//! it. Dropping the `run` future kills the child (`kill_on_drop`).

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::collab::OutputSink;
use crate::errors::{ExerunError, Result};

/// Exit status and captured output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Executable, ordered arguments, working directory and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Live output target: a sink plus the channel name (the project name).
#[derive(Clone)]
struct SinkTarget {
    sink: Arc<dyn OutputSink>,
    channel: String,
}

pub struct ProcessRunner {
    spec: CommandSpec,
    sink: Option<SinkTarget>,
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("spec", &self.spec)
            .field("streaming", &self.sink.is_some())
            .finish()
    }
}

impl ProcessRunner {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec, sink: None }
    }

    /// Stream stdout/stderr lines to `sink` under `channel` while capturing.
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>, channel: impl Into<String>) -> Self {
        self.sink = Some(SinkTarget {
            sink,
            channel: channel.into(),
        });
        self
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Run the command to completion.
    ///
    /// A non-zero exit is data in the returned [`ProcessResult`]. Only a
    /// process that cannot be started (missing executable, bad working
    /// directory) is an error. Both pipes are drained concurrently with
    /// waiting for exit, so a chatty child cannot block on a full pipe.
    pub async fn run(self) -> Result<ProcessResult> {
        let ProcessRunner { spec, sink } = self;

        if !spec.cwd.is_dir() {
            return Err(ExerunError::InvalidWorkingDir(spec.cwd.clone()));
        }

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(cmd = %spec, cwd = ?spec.cwd, "starting process");

        let mut child = cmd.spawn().map_err(|source| ExerunError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr, status) = tokio::join!(
            drain(stdout, sink.clone()),
            drain(stderr, sink),
            child.wait()
        );
        let status = status?;
        let code = status.code().unwrap_or(-1);

        info!(
            program = %spec.program,
            exit_code = code,
            success = status.success(),
            "process exited"
        );

        Ok(ProcessResult {
            status: code,
            stdout: stdout?,
            stderr: stderr?,
        })
    }
}

/// Read a pipe to EOF, forwarding each line to the sink.
///
/// Output is decoded lossily; a tool printing invalid UTF-8 must not turn a
/// finished run into an error.
async fn drain<R>(pipe: Option<R>, sink: Option<SinkTarget>) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(String::new());
    };

    let mut reader = BufReader::new(pipe);
    let mut captured = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            break;
        }
        let chunk = String::from_utf8_lossy(&buf);
        if let Some(target) = &sink {
            target
                .sink
                .append(&target.channel, chunk.trim_end_matches(['\r', '\n']));
        }
        captured.push_str(&chunk);
    }

    debug!(bytes = captured.len(), "pipe drained");
    Ok(captured)
}
