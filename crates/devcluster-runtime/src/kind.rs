use crate::context::Context;
use crate::process::{describe, run_streaming};
use crate::RuntimeError;
use devcluster_schema::ResolvedRuntime;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Tells kind to drive podman instead of docker.
pub const EXPERIMENTAL_PROVIDER_ENV: &str = "KIND_EXPERIMENTAL_PROVIDER";

pub const DEFAULT_KIND_BINARY: &str = "kind";

/// The `kind` binary bound to a resolved container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindCommand {
    binary: PathBuf,
    runtime: ResolvedRuntime,
}

impl KindCommand {
    pub fn new(runtime: ResolvedRuntime) -> Self {
        Self::with_binary(DEFAULT_KIND_BINARY, runtime)
    }

    pub fn with_binary(binary: impl Into<PathBuf>, runtime: ResolvedRuntime) -> Self {
        Self {
            binary: binary.into(),
            runtime,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn runtime(&self) -> ResolvedRuntime {
        self.runtime
    }

    /// Build the child command. The process environment is inherited; the
    /// provider switch is only added for experimental runtimes.
    pub fn command<S: AsRef<str>>(&self, args: &[S]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args.iter().map(AsRef::as_ref));
        if self.runtime.is_experimental() {
            cmd.env(EXPERIMENTAL_PROVIDER_ENV, self.runtime.executable());
        }
        cmd
    }

    /// Run kind with `args`, streaming its output into the sinks. No retries.
    pub fn execute<S: AsRef<str>>(
        &self,
        ctx: &Context,
        stdout: &mut (dyn Write + Send),
        stderr: &mut (dyn Write + Send),
        args: &[S],
    ) -> Result<(), RuntimeError> {
        let cmd = self.command(args);
        info!("exec: {}", describe(&cmd));
        run_streaming(ctx, cmd, stdout, stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn env_value<'a>(cmd: &'a Command, key: &str) -> Option<Option<&'a OsStr>> {
        cmd.get_envs()
            .find(|(k, _)| *k == OsStr::new(key))
            .map(|(_, v)| v)
    }

    #[test]
    fn podman_sets_experimental_provider() {
        let kind = KindCommand::new(ResolvedRuntime::Podman);
        let cmd = kind.command(&["get", "clusters"]);
        assert_eq!(
            env_value(&cmd, EXPERIMENTAL_PROVIDER_ENV),
            Some(Some(OsStr::new("podman")))
        );
    }

    #[test]
    fn docker_leaves_environment_alone() {
        let kind = KindCommand::new(ResolvedRuntime::Docker);
        let cmd = kind.command(&["get", "clusters"]);
        assert_eq!(cmd.get_envs().count(), 0);
    }

    #[test]
    fn args_are_passed_verbatim() {
        let kind = KindCommand::with_binary("/opt/kind", ResolvedRuntime::Docker);
        let cmd = kind.command(&["create", "cluster", "--name=dev"]);
        assert_eq!(cmd.get_program(), OsStr::new("/opt/kind"));
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["create", "cluster", "--name=dev"]);
    }

    #[cfg(unix)]
    #[test]
    fn execute_reports_exit_status() {
        let kind = KindCommand::with_binary("false", ResolvedRuntime::Docker);
        let err = kind
            .execute(
                &Context::background(),
                &mut std::io::sink(),
                &mut std::io::sink(),
                &["get", "clusters"],
            )
            .unwrap_err();
        assert!(matches!(err, RuntimeError::CommandFailed { .. }));
        assert!(err.to_string().contains("false get clusters"));
    }

    #[cfg(unix)]
    #[test]
    fn execute_child_sees_provider_env() {
        let kind = KindCommand::with_binary("/bin/sh", ResolvedRuntime::Podman);
        let mut out = Vec::new();
        kind.execute(
            &Context::background(),
            &mut out,
            &mut std::io::sink(),
            &["-c", "printf %s \"$KIND_EXPERIMENTAL_PROVIDER\""],
        )
        .unwrap();
        assert_eq!(out, b"podman");
    }
}
