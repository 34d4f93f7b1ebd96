//! The default cluster handle and the factory signature environments build
//! handles through.

use crate::BoxError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options forwarded to a cluster factory. Later options override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterOption {
    KubeconfigPath(PathBuf),
    /// kubeconfig context to use instead of the file's current context.
    Context(String),
}

/// Builds a cluster handle from the environment's work directory and options.
pub type NewClusterFn<C> =
    Arc<dyn Fn(&Path, &[ClusterOption]) -> Result<C, BoxError> + Send + Sync>;

/// Handles that know where their kubeconfig lives.
pub trait KubeconfigSource {
    fn kubeconfig_path(&self) -> &Path;
}

/// Lightweight handle produced by [`new_cluster`]: it locates the kubeconfig
/// written by kind and carries the options clients should be built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    work_dir: PathBuf,
    kubeconfig_path: PathBuf,
    context: Option<String>,
}

impl Cluster {
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl KubeconfigSource for Cluster {
    fn kubeconfig_path(&self) -> &Path {
        &self.kubeconfig_path
    }
}

/// Default factory. Fails if the kubeconfig does not exist, which happens when
/// a cluster of the same name was created from a different work directory.
pub fn new_cluster(work_dir: &Path, options: &[ClusterOption]) -> Result<Cluster, BoxError> {
    let mut kubeconfig_path = work_dir.join(crate::environment::KUBECONFIG_FILE);
    let mut context = None;
    for opt in options {
        match opt {
            ClusterOption::KubeconfigPath(p) => kubeconfig_path.clone_from(p),
            ClusterOption::Context(c) => context = Some(c.clone()),
        }
    }

    if !kubeconfig_path.is_file() {
        return Err(format!("kubeconfig not found at '{}'", kubeconfig_path.display()).into());
    }

    Ok(Cluster {
        work_dir: work_dir.to_path_buf(),
        kubeconfig_path,
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_work_dir_kubeconfig() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kubeconfig.yaml"), "kind: Config\n").unwrap();

        let cluster = new_cluster(dir.path(), &[]).unwrap();
        assert_eq!(cluster.kubeconfig_path(), dir.path().join("kubeconfig.yaml"));
        assert_eq!(cluster.work_dir(), dir.path());
        assert_eq!(cluster.context(), None);
    }

    #[test]
    fn later_options_override() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.yaml");
        std::fs::write(&real, "kind: Config\n").unwrap();

        let cluster = new_cluster(
            dir.path(),
            &[
                ClusterOption::Context("first".to_owned()),
                ClusterOption::KubeconfigPath(dir.path().join("ignored.yaml")),
                ClusterOption::KubeconfigPath(real.clone()),
                ClusterOption::Context("kind-dev".to_owned()),
            ],
        )
        .unwrap();
        assert_eq!(cluster.kubeconfig_path(), real);
        assert_eq!(cluster.context(), Some("kind-dev"));
    }

    #[test]
    fn missing_kubeconfig_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = new_cluster(dir.path(), &[]).unwrap_err();
        assert!(err.to_string().contains("kubeconfig not found"));
    }
}
