use crate::cluster::{Cluster, ClusterOption};
use crate::config::EnvironmentConfig;
use crate::lifecycle::{validate_transition, EnvState};
use crate::CoreError;
use devcluster_runtime::{detect_with, Context, KindCommand};
use devcluster_schema::{ClusterName, ResolvedRuntime, TopologyConfig};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const KUBECONFIG_FILE: &str = "kubeconfig.yaml";
pub const KIND_CONFIG_FILE: &str = "kind.yaml";

/// How [`Environment::init`] obtained its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitOutcome {
    /// The cluster was created and initializers ran.
    Created,
    /// A cluster with this name already existed; initializers were skipped.
    Reused,
}

/// A local kind cluster plus the work directory holding its generated files.
///
/// Operations block until the underlying kind invocation finishes. Failed
/// steps are not rolled back: a written config or a half-created cluster is
/// left for the next `init` (which is idempotent) or `destroy` to deal with.
pub struct Environment<C = Cluster> {
    name: ClusterName,
    work_dir: PathBuf,
    cluster: Option<C>,
    config: EnvironmentConfig<C>,
    runtime: Option<ResolvedRuntime>,
    state: EnvState,
}

impl<C> Environment<C> {
    pub fn new(name: ClusterName, work_dir: impl Into<PathBuf>, config: EnvironmentConfig<C>) -> Self {
        let runtime = config.container_runtime.resolved();
        Self {
            name,
            work_dir: work_dir.into(),
            cluster: None,
            config,
            runtime,
            state: EnvState::Unresolved,
        }
    }

    pub fn name(&self) -> &ClusterName {
        &self.name
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn config(&self) -> &EnvironmentConfig<C> {
        &self.config
    }

    pub fn state(&self) -> EnvState {
        self.state
    }

    /// The resolved container runtime, once known.
    pub fn runtime(&self) -> Option<ResolvedRuntime> {
        self.runtime
    }

    /// The cluster handle from the last successful client build. Not cleared
    /// by `destroy`.
    pub fn cluster(&self) -> Option<&C> {
        self.cluster.as_ref()
    }

    pub fn kubeconfig_path(&self) -> PathBuf {
        self.work_dir.join(KUBECONFIG_FILE)
    }

    pub fn kind_config_path(&self) -> PathBuf {
        self.work_dir.join(KIND_CONFIG_FILE)
    }

    /// Topology document `init` would write on this host.
    pub fn topology(&self) -> TopologyConfig {
        TopologyConfig::probe(&self.config.device_probe)
    }

    /// Resolve the container runtime, detecting it on first use when the
    /// configuration asked for `auto`. The result is cached.
    pub fn resolve_runtime(&mut self) -> Result<ResolvedRuntime, CoreError> {
        if let Some(runtime) = self.runtime {
            return Ok(runtime);
        }
        let runtime =
            detect_with(self.config.runtime_lookup.as_ref()).map_err(CoreError::DetectRuntime)?;
        info!("using container runtime {runtime}");
        self.runtime = Some(runtime);
        Ok(runtime)
    }

    fn kind(&mut self) -> Result<KindCommand, CoreError> {
        let runtime = self.resolve_runtime()?;
        Ok(KindCommand::with_binary(&self.config.kind_binary, runtime))
    }

    fn transition(&mut self, to: EnvState) -> Result<(), CoreError> {
        validate_transition(self.state, to)?;
        debug!("environment '{}': {} -> {to}", self.name, self.state);
        self.state = to;
        Ok(())
    }

    /// Create the cluster if it does not exist yet, build the cluster handle,
    /// and run initializers on fresh creation only.
    pub fn init(&mut self, ctx: &Context) -> Result<InitOutcome, CoreError> {
        let result = self.run_init(ctx);
        if result.is_err() {
            self.state = EnvState::Failed;
        }
        result
    }

    fn run_init(&mut self, ctx: &Context) -> Result<InitOutcome, CoreError> {
        let kind = self.kind()?;
        self.transition(EnvState::RuntimeResolved)?;

        std::fs::create_dir_all(&self.work_dir).map_err(|source| CoreError::CreateWorkDir {
            path: self.work_dir.clone(),
            source,
        })?;

        let kubeconfig_path = self.kubeconfig_path();
        let kind_config_path = self.kind_config_path();
        self.topology()
            .write_to(&kind_config_path)
            .map_err(|source| CoreError::WriteConfig {
                path: kind_config_path.clone(),
                source,
            })?;
        self.transition(EnvState::ConfigWritten)?;

        let exists = self.query_cluster(ctx, &kind)?;
        self.transition(EnvState::Queried)?;

        let outcome = if exists {
            info!("reusing existing kind cluster '{}'", self.name);
            self.transition(EnvState::Reused)?;
            InitOutcome::Reused
        } else {
            info!("creating kind cluster '{}'", self.name);
            let args = [
                "create".to_owned(),
                "cluster".to_owned(),
                format!("--kubeconfig={}", kubeconfig_path.display()),
                format!("--name={}", self.name),
                format!("--config={}", kind_config_path.display()),
            ];
            kind.execute(ctx, &mut io::stdout(), &mut io::stderr(), &args)
                .map_err(CoreError::CreateCluster)?;
            self.transition(EnvState::Created)?;
            InitOutcome::Created
        };

        let mut options = self.config.cluster_options.clone();
        options.push(ClusterOption::KubeconfigPath(kubeconfig_path));
        let cluster =
            (self.config.new_cluster)(&self.work_dir, &options).map_err(CoreError::NewCluster)?;
        let cluster = self.cluster.insert(cluster);
        validate_transition(self.state, EnvState::ClientBuilt)?;
        self.state = EnvState::ClientBuilt;

        if outcome == InitOutcome::Created {
            for initializer in &self.config.initializers {
                debug!("running cluster initializer '{}'", initializer.name());
                initializer
                    .init(ctx, cluster)
                    .map_err(|source| CoreError::Initializer {
                        name: initializer.name().to_owned(),
                        source,
                    })?;
            }
        }

        self.transition(EnvState::Ready)?;
        Ok(outcome)
    }

    /// Whether kind reports a cluster with exactly this environment's name.
    pub fn cluster_exists(&mut self, ctx: &Context) -> Result<bool, CoreError> {
        let kind = self.kind()?;
        self.query_cluster(ctx, &kind)
    }

    fn query_cluster(&self, ctx: &Context, kind: &KindCommand) -> Result<bool, CoreError> {
        let mut output = Vec::new();
        kind.execute(ctx, &mut output, &mut io::sink(), &["get", "clusters"])
            .map_err(CoreError::ListClusters)?;
        Ok(cluster_listed(&String::from_utf8_lossy(&output), &self.name))
    }

    /// Delete the kind cluster. The cluster handle is left in place.
    pub fn destroy(&mut self, ctx: &Context) -> Result<(), CoreError> {
        let result = self.run_destroy(ctx);
        if result.is_err() {
            self.state = EnvState::Failed;
        }
        result
    }

    fn run_destroy(&mut self, ctx: &Context) -> Result<(), CoreError> {
        let kind = self.kind()?;
        let args = [
            "delete".to_owned(),
            "cluster".to_owned(),
            format!("--kubeconfig={}", self.kubeconfig_path().display()),
            format!("--name={}", self.name),
        ];
        kind.execute(ctx, &mut io::stdout(), &mut io::stderr(), &args)
            .map_err(CoreError::DeleteCluster)?;
        self.transition(EnvState::Destroyed)
    }

    /// Load an image tarball (e.g. from `podman save`) into every node.
    pub fn load_image_from_tar(&mut self, ctx: &Context, file_path: &Path) -> Result<(), CoreError> {
        let kind = self.kind()?;
        let args = [
            "load".to_owned(),
            "image-archive".to_owned(),
            file_path.display().to_string(),
            format!("--name={}", self.name),
        ];
        kind.execute(ctx, &mut io::stdout(), &mut io::stderr(), &args)
            .map_err(|source| CoreError::LoadImage {
                path: file_path.to_path_buf(),
                source,
            })
    }

    /// Run an arbitrary kind command with this environment's runtime settings.
    pub fn run_kind_command<S: AsRef<str>>(
        &mut self,
        ctx: &Context,
        stdout: &mut (dyn Write + Send),
        stderr: &mut (dyn Write + Send),
        args: &[S],
    ) -> Result<(), CoreError> {
        let kind = self.kind()?;
        kind.execute(ctx, stdout, stderr, args)
            .map_err(CoreError::Kind)
    }
}

/// `kind get clusters` prints one name per line; only a whole-line match counts.
pub fn cluster_listed(output: &str, name: &str) -> bool {
    output
        .lines()
        .any(|line| line.trim_end_matches('\r') == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devcluster_schema::ContainerRuntime;

    fn name(s: &str) -> ClusterName {
        ClusterName::new(s).unwrap()
    }

    #[test]
    fn exact_line_match_only() {
        assert!(!cluster_listed("foo-bar\n", "foo"));
        assert!(!cluster_listed("myfoo\n", "foo"));
        assert!(cluster_listed("foo\n", "foo"));
        assert!(cluster_listed("alpha\nfoo\nomega\n", "foo"));
        assert!(cluster_listed("foo", "foo"));
        assert!(cluster_listed("foo\r\n", "foo"));
        assert!(!cluster_listed("", "foo"));
        assert!(!cluster_listed("No kind clusters found.\n", "foo"));
    }

    #[test]
    fn fixed_paths_in_work_dir() {
        let env = Environment::new(name("dev"), "/tmp/w", EnvironmentConfig::new());
        assert_eq!(env.kubeconfig_path(), PathBuf::from("/tmp/w/kubeconfig.yaml"));
        assert_eq!(env.kind_config_path(), PathBuf::from("/tmp/w/kind.yaml"));
        assert_eq!(env.state(), EnvState::Unresolved);
        assert!(env.cluster().is_none());
    }

    #[test]
    fn explicit_runtime_is_resolved_upfront() {
        let config = EnvironmentConfig::new().with_container_runtime(ContainerRuntime::Docker);
        let env = Environment::new(name("dev"), "/tmp/w", config);
        assert_eq!(env.runtime(), Some(ResolvedRuntime::Docker));
    }

    #[test]
    fn auto_runtime_waits_for_first_use() {
        let env = Environment::new(name("dev"), "/tmp/w", EnvironmentConfig::new());
        assert_eq!(env.runtime(), None);
    }

    #[test]
    fn topology_uses_configured_probe() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("dm-0");
        std::fs::write(&device, b"").unwrap();
        let config = EnvironmentConfig::new().with_device_probe(&device);
        let env = Environment::new(name("dev"), dir.path(), config);
        assert_eq!(env.topology().device_mount, Some(device));
    }
}
