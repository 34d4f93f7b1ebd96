use crate::cluster::KubeconfigSource;
use crate::BoxError;
use devcluster_runtime::{run_streaming, Context};
use std::io;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

/// One-time setup run against a freshly created cluster.
///
/// Initializers run in registration order and never on reuse of an existing
/// cluster. The first error stops the chain; earlier side effects stay.
pub trait ClusterInitializer<C>: Send + Sync {
    fn name(&self) -> &str;

    fn init(&self, ctx: &Context, cluster: &mut C) -> Result<(), BoxError>;
}

/// Initializer backed by a closure.
pub struct FnInitializer<F> {
    name: String,
    f: F,
}

pub fn initializer_fn<C, F>(name: impl Into<String>, f: F) -> FnInitializer<F>
where
    F: Fn(&Context, &mut C) -> Result<(), BoxError> + Send + Sync,
{
    FnInitializer {
        name: name.into(),
        f,
    }
}

impl<C, F> ClusterInitializer<C> for FnInitializer<F>
where
    F: Fn(&Context, &mut C) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, ctx: &Context, cluster: &mut C) -> Result<(), BoxError> {
        (self.f)(ctx, cluster)
    }
}

/// Runs an external command with `KUBECONFIG` pointing at the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInitializer {
    name: String,
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandInitializer {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Build from an argv-style list; `None` if it is empty.
    pub fn from_argv(name: impl Into<String>, argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(name, program.clone()).with_args(args.iter().cloned()))
    }

    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    #[must_use]
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn command(&self, kubeconfig: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).env("KUBECONFIG", kubeconfig);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl<C: KubeconfigSource> ClusterInitializer<C> for CommandInitializer {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, ctx: &Context, cluster: &mut C) -> Result<(), BoxError> {
        info!("running initializer '{}'", self.name);
        let cmd = self.command(cluster.kubeconfig_path());
        run_streaming(ctx, cmd, &mut io::stdout(), &mut io::stderr())?;
        Ok(())
    }
}
