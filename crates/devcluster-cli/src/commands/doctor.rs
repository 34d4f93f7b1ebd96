use super::{load_manifest, Overrides, EXIT_FAILURE, EXIT_SUCCESS};
use devcluster_core::WorkDirLock;
use devcluster_runtime::{
    check_prereqs, detect_with, ExecutableLookup, PathLookup, DEFAULT_KIND_BINARY,
};
use devcluster_schema::{ContainerRuntime, EnvironmentManifest, TopologyConfig, DM_DEVICE_PATH};
use std::path::Path;

pub fn run(manifest_path: &Path, overrides: &Overrides, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;
    let lookup = PathLookup::new();

    let manifest = check_manifest(manifest_path, overrides, &mut checks, &mut all_pass);
    let runtime = requested_runtime(manifest.as_ref(), overrides);
    check_tools(&lookup, manifest.as_ref(), runtime, &mut checks, &mut all_pass);
    check_runtime(&lookup, manifest.as_ref(), overrides, &mut checks, &mut all_pass);
    if let Some(manifest) = &manifest {
        check_work_dir(&manifest.work_dir, &mut checks, &mut all_pass);
    }
    check_topology(&mut checks);

    print_results(&checks, all_pass, json_output)
}

fn check_manifest(
    path: &Path,
    overrides: &Overrides,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) -> Option<EnvironmentManifest> {
    if !path.exists() {
        checks.push(Check::info(
            "manifest",
            &format!("No manifest at {} (commands that need one will fail)", path.display()),
        ));
        return None;
    }
    match load_manifest(path, overrides) {
        Ok(manifest) => {
            checks.push(Check::pass(
                "manifest",
                &format!(
                    "Manifest valid: cluster '{}', {} initializer(s)",
                    manifest.name,
                    manifest.initializers.len()
                ),
            ));
            Some(manifest)
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("manifest", &format!("Manifest invalid: {e}")));
            None
        }
    }
}

fn requested_runtime(
    manifest: Option<&EnvironmentManifest>,
    overrides: &Overrides,
) -> ContainerRuntime {
    overrides
        .runtime
        .or_else(|| manifest.map(|m| m.container_runtime))
        .unwrap_or_default()
}

fn check_tools(
    lookup: &dyn ExecutableLookup,
    manifest: Option<&EnvironmentManifest>,
    runtime: ContainerRuntime,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let kind_binary = manifest
        .and_then(|m| m.kind_binary.as_ref())
        .map_or_else(|| DEFAULT_KIND_BINARY.to_owned(), |p| p.display().to_string());
    let missing = check_prereqs(lookup, &kind_binary, runtime);
    if missing.is_empty() {
        checks.push(Check::pass(
            "prereqs",
            &format!("kind ({kind_binary}) and a container runtime ({runtime}) are installed"),
        ));
        return;
    }
    *all_pass = false;
    for m in &missing {
        checks.push(Check::fail(
            "prereqs",
            &format!("Missing {}: {} (install: {})", m.name, m.purpose, m.install_hint),
        ));
    }
}

fn check_runtime(
    lookup: &dyn ExecutableLookup,
    manifest: Option<&EnvironmentManifest>,
    overrides: &Overrides,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let requested = requested_runtime(manifest, overrides);

    let resolved = match requested.resolved() {
        Some(runtime) => lookup
            .lookup(runtime.executable())
            .map(|_| runtime)
            .map_err(|e| format!("{} requested but not usable: {e}", runtime.executable())),
        None => detect_with(lookup).map_err(|e| e.to_string()),
    };

    match resolved {
        Ok(runtime) if runtime.is_experimental() => checks.push(Check::warn(
            "container_runtime",
            &format!("Container runtime: {runtime} (kind support for it is experimental)"),
        )),
        Ok(runtime) => checks.push(Check::pass(
            "container_runtime",
            &format!("Container runtime: {runtime}"),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("container_runtime", &e));
        }
    }
}

fn check_work_dir(work_dir: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) {
    if !work_dir.exists() {
        checks.push(Check::info(
            "work_dir",
            &format!("Work directory {} not created yet", work_dir.display()),
        ));
        return;
    }
    match WorkDirLock::try_acquire(work_dir) {
        Ok(Some(_)) => checks.push(Check::pass("work_dir_lock", "Work directory lock is free")),
        Ok(None) => checks.push(Check::warn(
            "work_dir_lock",
            "Work directory lock is held by another process",
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "work_dir_lock",
                &format!("Cannot check work directory lock: {e}"),
            ));
        }
    }
}

fn check_topology(checks: &mut Vec<Check>) {
    let message = match TopologyConfig::detect().device_mount {
        Some(device) => format!(
            "{} present: it will be mounted into the control-plane node",
            device.display()
        ),
        None => format!("{DM_DEVICE_PATH} absent: default kind topology"),
    };
    checks.push(Check::info("topology", &message));
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("devcluster doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devcluster_runtime::LookupError;
    use std::path::PathBuf;

    struct Only(&'static [&'static str]);

    impl ExecutableLookup for Only {
        fn lookup(&self, name: &str) -> Result<PathBuf, LookupError> {
            if self.0.iter().any(|n| *n == name) {
                Ok(PathBuf::from("/usr/bin").join(name))
            } else {
                Err(LookupError::NotFound)
            }
        }
    }

    #[test]
    fn missing_manifest_is_informational() {
        let mut checks = Vec::new();
        let mut all_pass = true;
        let manifest = check_manifest(
            Path::new("/nonexistent/devcluster.toml"),
            &Overrides::default(),
            &mut checks,
            &mut all_pass,
        );
        assert!(manifest.is_none());
        assert!(all_pass);
        assert_eq!(checks[0].status, "info");
    }

    #[test]
    fn invalid_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devcluster.toml");
        std::fs::write(&path, "nmae = \"dev\"\n").unwrap();
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_manifest(&path, &Overrides::default(), &mut checks, &mut all_pass);
        assert!(!all_pass);
        assert_eq!(checks[0].status, "fail");
    }

    #[test]
    fn tools_present() {
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_tools(
            &Only(&["kind", "docker"]),
            None,
            ContainerRuntime::Auto,
            &mut checks,
            &mut all_pass,
        );
        assert!(all_pass);
        assert_eq!(checks.len(), 1);
    }

    #[test]
    fn each_missing_tool_is_reported() {
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_tools(&Only(&[]), None, ContainerRuntime::Auto, &mut checks, &mut all_pass);
        assert!(!all_pass);
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|c| c.status == "fail"));
    }

    #[test]
    fn configured_runtime_missing_fails_tools_check() {
        let overrides = Overrides {
            runtime: Some(ContainerRuntime::Podman),
            ..Overrides::default()
        };
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_tools(
            &Only(&["kind", "docker"]),
            None,
            requested_runtime(None, &overrides),
            &mut checks,
            &mut all_pass,
        );
        assert!(!all_pass);
        assert_eq!(checks.len(), 1);
        assert!(checks[0].message.contains("Missing podman"));
    }

    #[test]
    fn podman_is_a_warning() {
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_runtime(
            &Only(&["podman", "docker"]),
            None,
            &Overrides::default(),
            &mut checks,
            &mut all_pass,
        );
        assert!(all_pass);
        assert_eq!(checks[0].status, "warn");
        assert!(checks[0].message.contains("podman"));
    }

    #[test]
    fn explicit_runtime_must_exist() {
        let mut checks = Vec::new();
        let mut all_pass = true;
        let overrides = Overrides {
            runtime: Some(ContainerRuntime::Docker),
            ..Overrides::default()
        };
        check_runtime(&Only(&["podman"]), None, &overrides, &mut checks, &mut all_pass);
        assert!(!all_pass);
        assert!(checks[0].message.contains("docker"));
    }

    #[test]
    fn held_work_dir_lock_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let _held = WorkDirLock::acquire(dir.path()).unwrap();
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_work_dir(dir.path(), &mut checks, &mut all_pass);
        assert!(all_pass);
        assert_eq!(checks[0].status, "warn");
    }
}
