use super::{json_pretty, lock_work_dir, EXIT_SUCCESS};
use devcluster_core::Environment;
use devcluster_runtime::Context;

pub fn run(ctx: &Context, mut env: Environment, json: bool) -> Result<u8, String> {
    let _lock = lock_work_dir(&env)?;
    env.destroy(ctx).map_err(|e| e.to_string())?;
    if json {
        let report = serde_json::json!({
            "name": env.name(),
            "state": env.state(),
        });
        println!("{}", json_pretty(&report)?);
    } else {
        println!("destroyed cluster '{}'", env.name());
    }
    Ok(EXIT_SUCCESS)
}
