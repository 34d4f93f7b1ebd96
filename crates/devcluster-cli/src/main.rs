mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{exit_code_for_error, Overrides};
use devcluster_core::{install_signal_handler, Environment};
use devcluster_runtime::{check_prereqs, format_missing, Context, PathLookup, DEFAULT_KIND_BINARY};
use devcluster_schema::{ContainerRuntime, DEFAULT_MANIFEST_FILE};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "devcluster",
    version,
    about = "Disposable local Kubernetes clusters for integration tests, backed by kind"
)]
struct Cli {
    /// Path to the environment manifest.
    #[arg(long, default_value = DEFAULT_MANIFEST_FILE, global = true)]
    manifest: PathBuf,

    /// Cluster name, overriding the manifest.
    #[arg(long, global = true)]
    name: Option<String>,

    /// Work directory, overriding the manifest.
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Container runtime (auto, docker, podman), overriding the manifest.
    #[arg(long, global = true)]
    runtime: Option<ContainerRuntime>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the cluster, or reuse it if it already exists.
    Init {
        /// Give up after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Delete the cluster.
    Destroy,
    /// Load an image archive (e.g. from `podman save`) into the cluster nodes.
    LoadImage {
        /// Path to the image tarball.
        archive: PathBuf,
    },
    /// Run kind with the environment's runtime settings (arguments after --).
    Kind {
        #[arg(required = true, last = true)]
        args: Vec<String>,
    },
    /// Show whether the cluster exists and where its files live.
    Status,
    /// Print the container runtime kind would use.
    Runtime,
    /// Print the kind cluster config `init` would write on this host.
    Topology,
    /// Run diagnostic checks on the host and manifest.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DEVCLUSTER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let ctx = Context::background();
    install_signal_handler(ctx.cancel_handle());

    let overrides = Overrides {
        name: cli.name,
        work_dir: cli.work_dir,
        runtime: cli.runtime,
    };
    let json_output = cli.json;

    let manifest = cli.manifest.as_path();
    let result = match cli.command {
        Commands::Init { timeout } => open_environment(manifest, &overrides)
            .and_then(|env| commands::init::run(&ctx, env, timeout, json_output)),
        Commands::Destroy => open_environment(manifest, &overrides)
            .and_then(|env| commands::destroy::run(&ctx, env, json_output)),
        Commands::LoadImage { archive } => open_environment(manifest, &overrides)
            .and_then(|env| commands::load_image::run(&ctx, env, &archive, json_output)),
        Commands::Kind { args } => open_environment(manifest, &overrides)
            .and_then(|env| commands::kind::run(&ctx, env, &args)),
        Commands::Status => open_environment(manifest, &overrides)
            .and_then(|env| commands::status::run(&ctx, env, json_output)),
        Commands::Runtime => commands::runtime::run(manifest, &overrides, json_output),
        Commands::Topology => commands::topology::run(json_output),
        Commands::Doctor => commands::doctor::run(manifest, &overrides, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for_error(&msg))
        }
    }
}

/// Load the manifest, check that kind and the configured container runtime are
/// installed,
/// and build the environment it describes.
fn open_environment(manifest_path: &Path, overrides: &Overrides) -> Result<Environment, String> {
    let manifest = commands::load_manifest(manifest_path, overrides)?;

    if std::env::var("DEVCLUSTER_SKIP_PREREQS").as_deref() != Ok("1") {
        let kind_binary = manifest
            .kind_binary
            .as_ref()
            .map_or_else(|| DEFAULT_KIND_BINARY.to_owned(), |p| p.display().to_string());
        let missing = check_prereqs(&PathLookup::new(), &kind_binary, manifest.container_runtime);
        if !missing.is_empty() {
            return Err(format_missing(&missing));
        }
    }

    Ok(commands::build_environment(
        &manifest,
        &commands::manifest_dir(manifest_path),
    ))
}
