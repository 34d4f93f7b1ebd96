pub mod completions;
pub mod destroy;
pub mod doctor;
pub mod init;
pub mod kind;
pub mod load_image;
pub mod man_pages;
pub mod runtime;
pub mod status;
pub mod topology;

use devcluster_core::{
    ClusterOption, CommandInitializer, Environment, EnvironmentConfig, WorkDirLock,
};
use devcluster_schema::{parse_manifest_file, ClusterName, ContainerRuntime, EnvironmentManifest};
use std::path::{Path, PathBuf};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_RUNTIME_ERROR: u8 = 3;

/// Command-line values that take precedence over the manifest.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub name: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub runtime: Option<ContainerRuntime>,
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "created" | "ready" | "present" => Style::new().green().apply_to(state).to_string(),
        "reused" => Style::new().cyan().apply_to(state).to_string(),
        "absent" => Style::new().yellow().apply_to(state).to_string(),
        "destroyed" => Style::new().dim().apply_to(state).to_string(),
        "failed" => Style::new().red().bold().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

pub fn load_manifest(path: &Path, overrides: &Overrides) -> Result<EnvironmentManifest, String> {
    let mut manifest =
        parse_manifest_file(path).map_err(|e| format!("{e} ({})", path.display()))?;
    apply_overrides(&mut manifest, overrides)?;
    Ok(manifest)
}

pub fn apply_overrides(
    manifest: &mut EnvironmentManifest,
    overrides: &Overrides,
) -> Result<(), String> {
    if let Some(name) = &overrides.name {
        manifest.name =
            ClusterName::new(name.as_str()).map_err(|e| format!("manifest error: --name: {e}"))?;
    }
    if let Some(dir) = &overrides.work_dir {
        manifest.work_dir.clone_from(dir);
    }
    if let Some(runtime) = overrides.runtime {
        manifest.container_runtime = runtime;
    }
    Ok(())
}

/// Directory initializer commands run in; `.` for a bare file name.
pub fn manifest_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn build_environment(manifest: &EnvironmentManifest, manifest_dir: &Path) -> Environment {
    let mut config = EnvironmentConfig::new().with_container_runtime(manifest.container_runtime);
    if let Some(kind) = &manifest.kind_binary {
        config = config.with_kind_binary(kind);
    }
    if let Some(context) = &manifest.kube_context {
        config = config.with_cluster_option(ClusterOption::Context(context.clone()));
    }
    for section in &manifest.initializers {
        if let Some(initializer) =
            CommandInitializer::from_argv(section.display_name(), &section.command)
        {
            config = config.with_initializer(initializer.with_current_dir(manifest_dir));
        }
    }
    Environment::new(manifest.name.clone(), &manifest.work_dir, config)
}

/// Exclusive lock on the environment's work directory, failing fast if another
/// devcluster process holds it.
pub fn lock_work_dir(env: &Environment) -> Result<WorkDirLock, String> {
    WorkDirLock::try_acquire(env.work_dir())
        .map_err(|e| e.to_string())?
        .ok_or_else(|| {
            format!(
                "work directory '{}' is locked by another devcluster process",
                env.work_dir().display()
            )
        })
}

pub fn exit_code_for_error(msg: &str) -> u8 {
    if msg.starts_with("manifest error:")
        || msg.starts_with("failed to parse manifest")
        || msg.starts_with("failed to read manifest")
        || msg.starts_with("initializer #")
    {
        EXIT_MANIFEST_ERROR
    } else if msg.starts_with("detecting container runtime:")
        || msg.starts_with("could not detect container runtime")
    {
        EXIT_RUNTIME_ERROR
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devcluster_schema::parse_manifest_str;

    fn manifest(input: &str) -> EnvironmentManifest {
        parse_manifest_str(input).unwrap()
    }

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"name": "dev"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"name\""));
        assert!(result.contains("\"dev\""));
    }

    #[test]
    fn colorize_state_keeps_text() {
        for state in ["created", "reused", "present", "absent", "destroyed", "failed"] {
            assert!(colorize_state(state).contains(state));
        }
        assert_eq!(colorize_state("unknown"), "unknown");
    }

    #[test]
    fn overrides_replace_manifest_values() {
        let mut m = manifest("name = \"dev\"\ncontainer_runtime = \"docker\"\n");
        let overrides = Overrides {
            name: Some("ci".to_owned()),
            work_dir: Some(PathBuf::from("/tmp/ci")),
            runtime: Some(ContainerRuntime::Podman),
        };
        apply_overrides(&mut m, &overrides).unwrap();
        assert_eq!(m.name.as_str(), "ci");
        assert_eq!(m.work_dir, PathBuf::from("/tmp/ci"));
        assert_eq!(m.container_runtime, ContainerRuntime::Podman);
    }

    #[test]
    fn invalid_name_override_is_manifest_error() {
        let mut m = manifest("name = \"dev\"\n");
        let overrides = Overrides {
            name: Some("Bad Name".to_owned()),
            ..Overrides::default()
        };
        let err = apply_overrides(&mut m, &overrides).unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_MANIFEST_ERROR);
    }

    #[test]
    fn manifest_dir_of_bare_file_is_cwd() {
        assert_eq!(manifest_dir(Path::new("devcluster.toml")), PathBuf::from("."));
        assert_eq!(
            manifest_dir(Path::new("/srv/app/devcluster.toml")),
            PathBuf::from("/srv/app")
        );
    }

    #[test]
    fn build_environment_wires_manifest() {
        let m = manifest(
            r#"
name = "dev"
work_dir = "/tmp/devcluster-test"
container_runtime = "podman"
kind_binary = "/opt/kind"
kube_context = "kind-dev"

[[initializers]]
name = "crds"
command = ["kubectl", "apply", "-f", "crds/"]

[[initializers]]
command = ["./seed.sh"]
"#,
        );
        let env = build_environment(&m, Path::new("/srv/app"));
        assert_eq!(env.name().as_str(), "dev");
        assert_eq!(env.work_dir(), Path::new("/tmp/devcluster-test"));
        assert_eq!(env.config().kind_binary(), Path::new("/opt/kind"));
        assert_eq!(env.config().container_runtime(), ContainerRuntime::Podman);
        assert_eq!(
            env.config().cluster_options(),
            [ClusterOption::Context("kind-dev".to_owned())]
        );
        assert_eq!(env.config().initializer_names(), ["crds", "./seed.sh"]);
    }

    #[test]
    fn lock_work_dir_fails_when_held() {
        let dir = tempfile::tempdir().unwrap();
        let m = manifest(&format!(
            "name = \"dev\"\nwork_dir = \"{}\"\n",
            dir.path().display()
        ));
        let env = build_environment(&m, dir.path());
        let _held = lock_work_dir(&env).unwrap();
        let err = lock_work_dir(&env).unwrap_err();
        assert!(err.contains("locked by another devcluster process"));
    }

    #[test]
    fn exit_codes_by_error_kind() {
        assert_eq!(
            exit_code_for_error("failed to read manifest file: not found (devcluster.toml)"),
            EXIT_MANIFEST_ERROR
        );
        assert_eq!(
            exit_code_for_error("failed to parse manifest: unknown field `nmae`"),
            EXIT_MANIFEST_ERROR
        );
        assert_eq!(
            exit_code_for_error(
                "detecting container runtime: could not detect container runtime (looked for: podman, docker)"
            ),
            EXIT_RUNTIME_ERROR
        );
        assert_eq!(
            exit_code_for_error("creating kind cluster: 'kind create cluster' failed: exit status: 1"),
            EXIT_FAILURE
        );
    }
}
