use super::{json_pretty, lock_work_dir, EXIT_SUCCESS};
use devcluster_core::Environment;
use devcluster_runtime::Context;
use std::path::Path;

pub fn run(ctx: &Context, mut env: Environment, archive: &Path, json: bool) -> Result<u8, String> {
    if !archive.is_file() {
        return Err(format!("image archive not found: {}", archive.display()));
    }
    let _lock = lock_work_dir(&env)?;
    env.load_image_from_tar(ctx, archive)
        .map_err(|e| e.to_string())?;
    if json {
        let report = serde_json::json!({
            "name": env.name(),
            "archive": archive,
            "loaded": true,
        });
        println!("{}", json_pretty(&report)?);
    } else {
        println!("loaded {} into cluster '{}'", archive.display(), env.name());
    }
    Ok(EXIT_SUCCESS)
}
