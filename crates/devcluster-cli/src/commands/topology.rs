use super::{json_pretty, EXIT_SUCCESS};
use devcluster_schema::TopologyConfig;

pub fn run(json: bool) -> Result<u8, String> {
    let topology = TopologyConfig::detect();
    if json {
        let report = serde_json::json!({
            "device_mount": topology.device_mount,
            "document": topology.render(),
        });
        println!("{}", json_pretty(&report)?);
    } else {
        print!("{}", topology.render());
    }
    Ok(EXIT_SUCCESS)
}
