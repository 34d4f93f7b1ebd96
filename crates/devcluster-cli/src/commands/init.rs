use super::{colorize_state, json_pretty, lock_work_dir, EXIT_SUCCESS};
use devcluster_core::{Environment, InitOutcome};
use devcluster_runtime::Context;
use std::time::Duration;

pub fn run(
    ctx: &Context,
    mut env: Environment,
    timeout: Option<u64>,
    json: bool,
) -> Result<u8, String> {
    let _lock = lock_work_dir(&env)?;
    let ctx = match timeout {
        Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
        None => ctx.clone(),
    };

    let outcome = env.init(&ctx).map_err(|e| e.to_string())?;

    if json {
        let report = serde_json::json!({
            "name": env.name(),
            "outcome": outcome,
            "runtime": env.runtime().map(|r| r.to_string()),
            "work_dir": env.work_dir(),
            "kubeconfig": env.kubeconfig_path(),
            "state": env.state(),
        });
        println!("{}", json_pretty(&report)?);
    } else {
        let verb = match outcome {
            InitOutcome::Created => "created",
            InitOutcome::Reused => "reused",
        };
        println!("cluster '{}' {}", env.name(), colorize_state(verb));
        println!("kubeconfig: {}", env.kubeconfig_path().display());
    }
    Ok(EXIT_SUCCESS)
}
