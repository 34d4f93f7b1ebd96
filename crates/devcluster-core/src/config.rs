use crate::cluster::{new_cluster, Cluster, ClusterOption, NewClusterFn};
use crate::initializer::ClusterInitializer;
use crate::BoxError;
use devcluster_runtime::{ExecutableLookup, PathLookup, DEFAULT_KIND_BINARY};
use devcluster_schema::{ContainerRuntime, DM_DEVICE_PATH};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration attached to an [`Environment`](crate::Environment) at construction.
pub struct EnvironmentConfig<C = Cluster> {
    pub(crate) initializers: Vec<Box<dyn ClusterInitializer<C>>>,
    pub(crate) container_runtime: ContainerRuntime,
    pub(crate) new_cluster: NewClusterFn<C>,
    pub(crate) cluster_options: Vec<ClusterOption>,
    pub(crate) kind_binary: PathBuf,
    pub(crate) runtime_lookup: Arc<dyn ExecutableLookup + Send + Sync>,
    pub(crate) device_probe: PathBuf,
}

impl EnvironmentConfig<Cluster> {
    /// Configuration using the built-in [`new_cluster`] factory.
    pub fn new() -> Self {
        Self::with_factory(new_cluster)
    }
}

impl Default for EnvironmentConfig<Cluster> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EnvironmentConfig<C> {
    /// Configuration that builds cluster handles through `factory`.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&Path, &[ClusterOption]) -> Result<C, BoxError> + Send + Sync + 'static,
    {
        Self {
            initializers: Vec::new(),
            container_runtime: ContainerRuntime::Auto,
            new_cluster: Arc::new(factory),
            cluster_options: Vec::new(),
            kind_binary: PathBuf::from(DEFAULT_KIND_BINARY),
            runtime_lookup: Arc::new(PathLookup::new()),
            device_probe: PathBuf::from(DM_DEVICE_PATH),
        }
    }

    #[must_use]
    pub fn with_initializer(mut self, initializer: impl ClusterInitializer<C> + 'static) -> Self {
        self.initializers.push(Box::new(initializer));
        self
    }

    #[must_use]
    pub fn with_container_runtime(mut self, runtime: ContainerRuntime) -> Self {
        self.container_runtime = runtime;
        self
    }

    #[must_use]
    pub fn with_cluster_option(mut self, option: ClusterOption) -> Self {
        self.cluster_options.push(option);
        self
    }

    #[must_use]
    pub fn with_kind_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.kind_binary = binary.into();
        self
    }

    /// Executable lookup used when the runtime is `auto`.
    #[must_use]
    pub fn with_runtime_lookup(mut self, lookup: impl ExecutableLookup + Send + Sync + 'static) -> Self {
        self.runtime_lookup = Arc::new(lookup);
        self
    }

    /// Host path probed for the topology device workaround.
    #[must_use]
    pub fn with_device_probe(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_probe = path.into();
        self
    }

    pub fn container_runtime(&self) -> ContainerRuntime {
        self.container_runtime
    }

    pub fn cluster_options(&self) -> &[ClusterOption] {
        &self.cluster_options
    }

    pub fn kind_binary(&self) -> &Path {
        &self.kind_binary
    }

    pub fn initializer_names(&self) -> Vec<&str> {
        self.initializers.iter().map(|i| i.name()).collect()
    }
}

impl<C> fmt::Debug for EnvironmentConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("initializers", &self.initializer_names())
            .field("container_runtime", &self.container_runtime)
            .field("cluster_options", &self.cluster_options)
            .field("kind_binary", &self.kind_binary)
            .field("device_probe", &self.device_probe)
            .finish_non_exhaustive()
    }
}
