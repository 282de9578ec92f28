use crate::env::EnvOverlay;
use crate::RuntimeError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, error};

/// One external command: program, discrete arguments, working directory and
/// the environment variables layered on top of the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    cwd: PathBuf,
    env: EnvOverlay,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: EnvOverlay::new(),
        }
    }

    /// Build from an argument vector whose first element is the program.
    pub fn from_argv<S: AsRef<OsStr>>(argv: &[S], cwd: impl Into<PathBuf>) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program, cwd).args(rest))
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    #[must_use]
    pub fn env(mut self, overlay: EnvOverlay) -> Self {
        self.env = overlay;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Final path component of the program, e.g. `configure` for
    /// `/src/project/configure`.
    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn overlay(&self) -> &EnvOverlay {
        &self.env
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.cwd);
        for (key, value) in self.env.iter() {
            cmd.env(key, value);
        }
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// The single seam through which every external tool is executed.
pub trait CommandRunner: Send + Sync {
    /// Run to completion and return the exit status. Only a command that
    /// could not be started is an error here.
    fn status(&self, invocation: &Invocation) -> Result<i32, RuntimeError>;

    /// Run to completion; any status other than zero is `CommandFailed`.
    fn run_checked(&self, invocation: &Invocation) -> Result<(), RuntimeError> {
        let status = self.status(invocation)?;
        if status == 0 {
            return Ok(());
        }
        error!("command `{invocation}` failed with exit status {status}");
        Err(RuntimeError::CommandFailed {
            command: invocation.to_string(),
            reason: format!("exit status {status}"),
        })
    }
}

/// Runs commands as real child processes with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn status(&self, invocation: &Invocation) -> Result<i32, RuntimeError> {
        debug!(
            "running `{invocation}` in {} with overlay {:?}",
            invocation.cwd().display(),
            invocation.overlay()
        );
        let status = invocation.to_command().status().map_err(|e| {
            error!("command `{invocation}` could not be started: {e}");
            RuntimeError::CommandFailed {
                command: invocation.to_string(),
                reason: format!("could not be started: {e}"),
            }
        })?;
        let code = exit_code(status);
        debug!("`{}` exited with status {code}", invocation.program_name());
        Ok(code)
    }
}

/// Exit status as a shell reports it: the exit code, or `128 + signo` for a
/// child killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvSnapshot;

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new("/src/configure", "/tmp/b").args(["--prefix", "/tmp/b"]);
        assert_eq!(inv.to_string(), "/src/configure --prefix /tmp/b");
        assert_eq!(inv.program_name(), "configure");
    }

    #[test]
    fn from_argv_splits_program() {
        let inv = Invocation::from_argv(&["make", "install"], "/tmp").unwrap();
        assert_eq!(inv.program(), "make");
        assert_eq!(inv.arg_list(), &[OsString::from("install")]);
        assert!(Invocation::from_argv::<&str>(&[], "/tmp").is_none());
    }

    #[test]
    fn system_runner_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh", dir.path()).args(["-c", "exit 3"]);
        assert_eq!(SystemRunner.status(&inv).unwrap(), 3);
    }

    #[test]
    fn run_checked_fails_on_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh", dir.path()).args(["-c", "exit 2"]);
        let err = SystemRunner.run_checked(&inv).unwrap_err();
        match err {
            RuntimeError::CommandFailed { command, reason } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(reason, "exit status 2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn run_checked_succeeds_on_zero() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("true", dir.path());
        assert!(SystemRunner.run_checked(&inv).is_ok());
    }

    #[test]
    fn missing_program_is_command_failed() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("autocov-definitely-not-a-program", dir.path());
        assert!(matches!(
            SystemRunner.status(&inv),
            Err(RuntimeError::CommandFailed { .. })
        ));
    }

    #[test]
    fn child_sees_overlay_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let base = EnvSnapshot::default();
        let overlay = EnvOverlay::new().with_appended("AUTOCOV_PROBE_VAR", &base, &["hello"]);
        let inv = Invocation::new("sh", dir.path())
            .args(["-c", "printf '%s' \"$AUTOCOV_PROBE_VAR\" > seen.txt"])
            .env(overlay);
        SystemRunner.run_checked(&inv).unwrap();
        let seen = std::fs::read_to_string(dir.path().join("seen.txt")).unwrap();
        assert_eq!(seen, "hello");
    }

    #[cfg(unix)]
    #[test]
    fn signal_death_maps_above_128() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh", dir.path()).args(["-c", "kill -9 $$"]);
        assert_eq!(SystemRunner.status(&inv).unwrap(), 128 + 9);
    }
}
