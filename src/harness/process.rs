//! Process invocation boundary
//!
//! Every external tool the harness drives (`wget`, `cargo`, `tar`, `./configure`, `make`,
//! `pkill`, `kill`) goes through the [`CommandRunner`] trait. This keeps the stage logic free of
//! `std::process` details and lets tests script tool behavior with [`RecordingRunner`].
//!
//! ## Session marker
//!
//! [`SystemRunner`] stamps every child with `IMAKE_CTS_SESSION=<id>`. Descendants inherit the
//! variable, so cleanup can find processes spawned by this run even after they have been
//! reparented.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use cts_core::corpus::SESSION_ENV_VAR;

/// A command line to execute, with its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Discard stdout/stderr (used for capability probes)
    pub quiet: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            quiet: false,
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

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Render as a shell-like command line (`program arg1 arg2`).
    ///
    /// Empty arguments are shown as `''` so `MAKETESTFLAGS=` and `''` stay distinguishable.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() {
                line.push_str("''");
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Exit status of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    code: Option<i32>,
}

impl CommandStatus {
    pub const SUCCESS: CommandStatus = CommandStatus { code: Some(0) };

    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// A status with no exit code (the process was terminated by a signal).
    pub fn terminated() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self { code: status.code() }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "termination by signal"),
        }
    }
}

/// Identifier shared by every process one harness run spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMarker(String);

impl SessionMarker {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive a marker from the harness pid and the current time.
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self(format!("{}-{}", std::process::id(), nanos))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execute external commands on behalf of the harness.
pub trait CommandRunner {
    /// Run `invocation` to completion.
    ///
    /// `Err` means the process could not be started at all; a started process that fails is
    /// reported through the returned [`CommandStatus`].
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus>;

    /// Session marker stamped on spawned processes, if any.
    fn session(&self) -> Option<&SessionMarker> {
        None
    }
}

/// Runs commands as real child processes with inherited stdio.
#[derive(Debug)]
pub struct SystemRunner {
    session: SessionMarker,
}

impl SystemRunner {
    pub fn new(session: SessionMarker) -> Self {
        Self { session }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        tracing::debug!(command = %invocation, cwd = ?invocation.cwd, "spawning");

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        command.env(SESSION_ENV_VAR, self.session.as_str());

        if invocation.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = command.spawn()?;
        let status = child.wait()?;
        Ok(status.into())
    }

    fn session(&self) -> Option<&SessionMarker> {
        Some(&self.session)
    }
}

/// Side effect a [`RecordingRunner`] performs when a scripted command runs.
pub type Effect = Box<dyn FnMut(&Invocation) -> io::Result<()>>;

enum Scripted {
    Status(CommandStatus),
    NotFound,
}

/// A [`CommandRunner`] that records invocations instead of spawning processes.
///
/// Behavior is scripted by command-line prefix (see [`Invocation::command_line`]). The first
/// matching rule wins; unmatched commands succeed. Effects let a scripted `wget` or `tar`
/// produce the files the real tool would.
#[derive(Default)]
pub struct RecordingRunner {
    invocations: Vec<Invocation>,
    responses: Vec<(String, Scripted)>,
    effects: Vec<(String, Effect)>,
    session: Option<SessionMarker>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `status` for every command line starting with `prefix`.
    pub fn respond(mut self, prefix: impl Into<String>, status: CommandStatus) -> Self {
        self.responses.push((prefix.into(), Scripted::Status(status)));
        self
    }

    /// Fail to spawn every command line starting with `prefix` (as if the tool were not
    /// installed).
    pub fn missing(mut self, prefix: impl Into<String>) -> Self {
        self.responses.push((prefix.into(), Scripted::NotFound));
        self
    }

    /// Run `effect` whenever a command line starting with `prefix` executes successfully.
    pub fn on_run(mut self, prefix: impl Into<String>, effect: impl FnMut(&Invocation) -> io::Result<()> + 'static) -> Self {
        self.effects.push((prefix.into(), Box::new(effect)));
        self
    }

    pub fn with_session(mut self, session: SessionMarker) -> Self {
        self.session = Some(session);
        self
    }

    /// Every invocation seen so far, in order.
    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Command lines of every invocation seen so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations.iter().map(Invocation::command_line).collect()
    }

    /// Whether any recorded command line starts with `prefix`.
    pub fn ran(&self, prefix: &str) -> bool {
        self.invocations.iter().any(|i| i.command_line().starts_with(prefix))
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        self.invocations.push(invocation.clone());
        let line = invocation.command_line();

        let scripted = self
            .responses
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, scripted)| scripted);

        let status = match scripted {
            Some(Scripted::NotFound) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: command not found", invocation.program),
                ));
            }
            Some(Scripted::Status(status)) => *status,
            None => CommandStatus::SUCCESS,
        };

        if status.success() {
            if let Some((_, effect)) = self
                .effects
                .iter_mut()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            {
                effect(invocation)?;
            }
        }

        Ok(status)
    }

    fn session(&self) -> Option<&SessionMarker> {
        self.session.as_ref()
    }
}
