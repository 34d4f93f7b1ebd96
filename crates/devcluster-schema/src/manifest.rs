use crate::types::{ClusterName, ContainerRuntime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MANIFEST_FILE: &str = "devcluster.toml";
pub const DEFAULT_WORK_DIR: &str = ".devcluster";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("initializer #{0} has an empty command")]
    EmptyInitializerCommand(usize),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentManifest {
    pub name: ClusterName,
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default)]
    pub container_runtime: ContainerRuntime,
    #[serde(default)]
    pub kind_binary: Option<PathBuf>,
    #[serde(default)]
    pub kube_context: Option<String>,
    #[serde(default)]
    pub initializers: Vec<InitializerSection>,
}

/// A command run once against a freshly created cluster.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InitializerSection {
    #[serde(default)]
    pub name: Option<String>,
    pub command: Vec<String>,
}

impl InitializerSection {
    /// Display name, falling back to the program name.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.command.first().map(String::as_str))
            .unwrap_or("initializer")
    }
}

impl EnvironmentManifest {
    /// Resolve a relative `work_dir`, and a relative `kind_binary` that names
    /// a path rather than a bare program, against the manifest's directory.
    #[must_use]
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.work_dir.is_relative() {
            self.work_dir = base.join(&self.work_dir);
        }
        if let Some(kind) = &self.kind_binary {
            if kind.is_relative() && kind.components().count() > 1 {
                self.kind_binary = Some(base.join(kind));
            }
        }
        self
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

pub fn parse_manifest_str(input: &str) -> Result<EnvironmentManifest, ManifestError> {
    let manifest: EnvironmentManifest = toml::from_str(input)?;
    if let Some(pos) = manifest
        .initializers
        .iter()
        .position(|i| i.command.is_empty() || i.command[0].trim().is_empty())
    {
        return Err(ManifestError::EmptyInitializerCommand(pos + 1));
    }
    Ok(manifest)
}

/// Parse a manifest file; relative paths inside it resolve against its directory.
pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<EnvironmentManifest, ManifestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let base = path.parent().unwrap_or(Path::new("."));
    Ok(parse_manifest_str(&content)?.rooted_at(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let input = r#"
name = "e2e"
work_dir = "/tmp/e2e"
container_runtime = "podman"
kind_binary = "/usr/local/bin/kind"
kube_context = "kind-e2e"

[[initializers]]
name = "crds"
command = ["kubectl", "apply", "-f", "crds/"]

[[initializers]]
command = ["./hack/seed.sh"]
"#;
        let manifest = parse_manifest_str(input).expect("should parse");
        assert_eq!(manifest.name.as_str(), "e2e");
        assert_eq!(manifest.work_dir, PathBuf::from("/tmp/e2e"));
        assert_eq!(manifest.container_runtime, ContainerRuntime::Podman);
        assert_eq!(
            manifest.kind_binary.as_deref(),
            Some(Path::new("/usr/local/bin/kind"))
        );
        assert_eq!(manifest.kube_context.as_deref(), Some("kind-e2e"));
        assert_eq!(manifest.initializers.len(), 2);
        assert_eq!(manifest.initializers[0].display_name(), "crds");
        assert_eq!(manifest.initializers[1].display_name(), "./hack/seed.sh");
    }

    #[test]
    fn parses_minimal_manifest() {
        let manifest = parse_manifest_str("name = \"dev\"\n").expect("should parse");
        assert_eq!(manifest.work_dir, PathBuf::from(DEFAULT_WORK_DIR));
        assert_eq!(manifest.container_runtime, ContainerRuntime::Auto);
        assert!(manifest.kind_binary.is_none());
        assert!(manifest.initializers.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(parse_manifest_str("name = \"dev\"\nnodes = 3\n").is_err());
    }

    #[test]
    fn rejects_missing_name() {
        assert!(parse_manifest_str("container_runtime = \"docker\"\n").is_err());
    }

    #[test]
    fn rejects_invalid_name() {
        assert!(parse_manifest_str("name = \"My Cluster\"\n").is_err());
    }

    #[test]
    fn rejects_unknown_runtime() {
        let err = parse_manifest_str("name = \"dev\"\ncontainer_runtime = \"lxc\"\n");
        assert!(matches!(err, Err(ManifestError::ParseToml(_))));
    }

    #[test]
    fn rejects_empty_initializer_command() {
        let input = r#"
name = "dev"

[[initializers]]
command = ["true"]

[[initializers]]
command = []
"#;
        assert!(matches!(
            parse_manifest_str(input),
            Err(ManifestError::EmptyInitializerCommand(2))
        ));
    }

    #[test]
    fn file_work_dir_is_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_MANIFEST_FILE);
        fs::write(&path, "name = \"dev\"\nwork_dir = \"state\"\n").unwrap();

        let manifest = parse_manifest_file(&path).unwrap();
        assert_eq!(manifest.work_dir, dir.path().join("state"));
    }

    #[test]
    fn absolute_work_dir_is_kept() {
        let manifest = parse_manifest_str("name = \"dev\"\nwork_dir = \"/var/tmp/dev\"\n")
            .unwrap()
            .rooted_at(Path::new("/somewhere/else"));
        assert_eq!(manifest.work_dir, PathBuf::from("/var/tmp/dev"));
    }

    #[test]
    fn kind_binary_path_is_rooted_but_program_name_is_not() {
        let base = Path::new("/projects/app");
        let pathlike = parse_manifest_str("name = \"dev\"\nkind_binary = \"bin/kind\"\n")
            .unwrap()
            .rooted_at(base);
        assert_eq!(pathlike.kind_binary, Some(base.join("bin/kind")));

        let bare = parse_manifest_str("name = \"dev\"\nkind_binary = \"kind-v0.20\"\n")
            .unwrap()
            .rooted_at(base);
        assert_eq!(bare.kind_binary, Some(PathBuf::from("kind-v0.20")));
    }
}
