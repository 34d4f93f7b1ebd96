use super::{colorize_state, json_pretty, EXIT_SUCCESS};
use devcluster_core::Environment;
use devcluster_runtime::Context;

pub fn run(ctx: &Context, mut env: Environment, json: bool) -> Result<u8, String> {
    let exists = env.cluster_exists(ctx).map_err(|e| e.to_string())?;
    let cluster = if exists { "present" } else { "absent" };
    let kubeconfig = env.kubeconfig_path();
    let runtime = env.runtime().map(|r| r.to_string());

    if json {
        let report = serde_json::json!({
            "name": env.name(),
            "cluster": cluster,
            "runtime": runtime,
            "work_dir": env.work_dir(),
            "kubeconfig": kubeconfig,
            "kubeconfig_present": kubeconfig.is_file(),
            "initializers": env.config().initializer_names(),
        });
        println!("{}", json_pretty(&report)?);
    } else {
        println!("name:         {}", env.name());
        println!("cluster:      {}", colorize_state(cluster));
        println!("runtime:      {}", runtime.as_deref().unwrap_or("(unresolved)"));
        println!("work_dir:     {}", env.work_dir().display());
        println!(
            "kubeconfig:   {}{}",
            kubeconfig.display(),
            if kubeconfig.is_file() { "" } else { " (missing)" }
        );
        println!("initializers: {}", env.config().initializer_names().len());
    }
    Ok(EXIT_SUCCESS)
}
