use std::{
    ffi::{OsStr, OsString},
    fmt,
    process::Output,
};

use anyhow::Context;
use tokio::process::Command;

/// External command line, kept as argv so it can be inspected before running
#[derive(Clone, Default, Eq, PartialEq)]
pub struct CliCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl CliCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append `arg` only when `enabled`
    pub fn arg_if(self, enabled: bool, arg: impl AsRef<OsStr>) -> Self {
        if enabled { self.arg(arg) } else { self }
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn argv(&self) -> impl Iterator<Item = &OsStr> {
        std::iter::once(self.program.as_os_str()).chain(self.args.iter().map(OsString::as_os_str))
    }

    pub fn into_tokio_command(self) -> Command {
        let mut command = Command::new(self.program);
        command.args(self.args).kill_on_drop(true);
        command
    }

    /// Run to completion and fail on a non-zero exit status
    pub async fn run(self) -> anyhow::Result<Output> {
        let program = self.program.to_string_lossy().into_owned();
        let output = self
            .into_tokio_command()
            .output()
            .await
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    anyhow::anyhow!("{program} is not installed or not in PATH")
                } else {
                    err.into()
                }
            })
            .with_context(|| format!("failed to run {program}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        Ok(output)
    }
}

impl fmt::Debug for CliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.argv().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&part.to_string_lossy())?;
        }
        Ok(())
    }
}
