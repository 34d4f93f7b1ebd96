use crate::detect::{detect_with, ExecutableLookup, LookupError};
use crate::RuntimeError;
use devcluster_schema::{ContainerRuntime, ResolvedRuntime};
use std::fmt;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

/// Check that `kind_binary` and the container runtime `runtime` names are
/// available. `Auto` accepts any supported runtime; an explicit choice must
/// itself be installed.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_prereqs(
    lookup: &dyn ExecutableLookup,
    kind_binary: &str,
    runtime: ContainerRuntime,
) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    let kind_found = if kind_binary.contains(std::path::MAIN_SEPARATOR) {
        std::path::Path::new(kind_binary).is_file()
    } else {
        !matches!(lookup.lookup(kind_binary), Err(LookupError::NotFound))
    };
    if !kind_found {
        missing.push(MissingPrereq {
            name: "kind",
            purpose: "creating and deleting local Kubernetes clusters",
            install_hint: "go install sigs.k8s.io/kind@latest | https://kind.sigs.k8s.io/docs/user/quick-start/#installation",
        });
    }

    match runtime.resolved() {
        Some(configured) => {
            if let Err(LookupError::NotFound) = lookup.lookup(configured.executable()) {
                missing.push(MissingPrereq {
                    name: configured.executable(),
                    purpose: "running kind node containers (configured container runtime)",
                    install_hint: match configured {
                        ResolvedRuntime::Podman => "https://podman.io/docs/installation",
                        ResolvedRuntime::Docker => "https://docs.docker.com/engine/install/",
                    },
                });
            }
        }
        None => {
            if let Err(RuntimeError::NoRuntime) = detect_with(lookup) {
                missing.push(MissingPrereq {
                    name: "container runtime",
                    purpose: "running kind node containers",
                    install_hint: "install one of: podman, docker",
                });
            }
        }
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\ndevcluster requires these tools to provision local clusters.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "kind",
            purpose: "clusters",
            install_hint: "go install sigs.k8s.io/kind@latest",
        };
        let s = format!("{m}");
        assert!(s.contains("kind"));
        assert!(s.contains("clusters"));
        assert!(s.contains("go install"));
    }

    #[test]
    fn all_present() {
        assert!(check_prereqs(&Only(&["kind", "docker"]), "kind", ContainerRuntime::Auto).is_empty());
    }

    #[test]
    fn reports_kind_and_runtime() {
        let missing = check_prereqs(&Only(&[]), "kind", ContainerRuntime::Auto);
        let names: Vec<_> = missing.iter().map(|m| m.name).collect();
        assert_eq!(names, ["kind", "container runtime"]);
    }

    #[test]
    fn explicit_kind_path_is_checked_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let kind = dir.path().join("kind");
        let kind_str = kind.to_string_lossy().into_owned();
        assert_eq!(check_prereqs(&Only(&["podman"]), &kind_str, ContainerRuntime::Auto).len(), 1);

        std::fs::write(&kind, "").unwrap();
        assert!(check_prereqs(&Only(&["podman"]), &kind_str, ContainerRuntime::Auto).is_empty());
    }

    #[test]
    fn configured_runtime_must_be_installed() {
        let missing = check_prereqs(&Only(&["kind", "docker"]), "kind", ContainerRuntime::Podman);
        let names: Vec<_> = missing.iter().map(|m| m.name).collect();
        assert_eq!(names, ["podman"]);

        assert!(check_prereqs(&Only(&["kind", "podman"]), "kind", ContainerRuntime::Podman)
            .is_empty());
        assert!(check_prereqs(&Only(&["kind", "docker"]), "kind", ContainerRuntime::Docker)
            .is_empty());
    }

    #[test]
    fn format_missing_produces_readable_output() {
        let output = format_missing(&check_prereqs(&Only(&[]), "kind", ContainerRuntime::Auto));
        assert!(output.contains("missing prerequisites:"));
        assert!(output.contains("podman, docker"));
    }
}
