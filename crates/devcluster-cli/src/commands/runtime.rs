use super::{json_pretty, load_manifest, Overrides, EXIT_SUCCESS};
use devcluster_runtime::detect_container_runtime;
use devcluster_schema::ContainerRuntime;
use std::path::Path;

pub fn run(manifest_path: &Path, overrides: &Overrides, json: bool) -> Result<u8, String> {
    let requested = requested_runtime(manifest_path, overrides)?;
    let (runtime, source) = match requested.resolved() {
        Some(runtime) => (runtime, "configured"),
        None => (
            detect_container_runtime().map_err(|e| format!("detecting container runtime: {e}"))?,
            "detected",
        ),
    };

    if json {
        let report = serde_json::json!({
            "runtime": runtime,
            "source": source,
            "experimental_provider": runtime.is_experimental(),
        });
        println!("{}", json_pretty(&report)?);
    } else if runtime.is_experimental() {
        println!("{runtime} ({source}, experimental kind provider)");
    } else {
        println!("{runtime} ({source})");
    }
    Ok(EXIT_SUCCESS)
}

/// The `--runtime` override, else the manifest's setting when a manifest
/// exists, else `auto`.
pub fn requested_runtime(
    manifest_path: &Path,
    overrides: &Overrides,
) -> Result<ContainerRuntime, String> {
    if let Some(runtime) = overrides.runtime {
        return Ok(runtime);
    }
    if manifest_path.exists() {
        return Ok(load_manifest(manifest_path, overrides)?.container_runtime);
    }
    Ok(ContainerRuntime::Auto)
}
