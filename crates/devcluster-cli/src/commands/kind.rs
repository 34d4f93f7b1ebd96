use super::EXIT_SUCCESS;
use devcluster_core::Environment;
use devcluster_runtime::Context;
use std::io;

pub fn run(ctx: &Context, mut env: Environment, args: &[String]) -> Result<u8, String> {
    env.run_kind_command(ctx, &mut io::stdout(), &mut io::stderr(), args)
        .map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
