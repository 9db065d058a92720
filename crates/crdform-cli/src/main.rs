//! crdform CLI - manage Kubernetes custom resources from descriptor catalogs

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use commands::Context;
use error::Result;

#[derive(Parser)]
#[command(name = "crdform")]
#[command(author = "crdform Contributors")]
#[command(version)]
#[command(about = "Manage Kubernetes custom resources with server-side apply", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Provider config file (default: ~/.config/crdform/provider.yaml)
    #[arg(long, global = true, env = "CRDFORM_CONFIG")]
    config: Option<PathBuf>,

    /// Descriptor catalog (YAML)
    #[arg(long, global = true, env = "CRDFORM_CATALOG")]
    catalog: Option<PathBuf>,

    /// Never contact a cluster; only manifest rendering is available
    #[arg(long, global = true)]
    offline: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the provider schema as JSON
    Schema {
        /// Only print this type
        #[arg(long = "type")]
        type_name: Option<String>,
    },

    /// Render a manifest type to YAML, without a cluster
    Render {
        /// Type name, with or without the `_manifest` suffix
        type_name: String,

        /// Input document (metadata + spec)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,

        /// Write the YAML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create or update an object
    Apply {
        type_name: String,

        /// Desired state (metadata, spec, field_manager, force_conflicts, wait_for)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,

        /// State file; updated in place when it exists
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Show the live state of an object
    Get {
        type_name: String,

        /// Object ID (`namespace/name`, or `name` for cluster-scoped kinds)
        id: String,
    },

    /// Delete an object
    Delete {
        type_name: String,

        /// Object ID (`namespace/name`, or `name` for cluster-scoped kinds)
        id: Option<String>,

        /// Delete the object tracked in this state file, then remove the file
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Import an existing object
    Import {
        type_name: String,

        /// Object ID (`namespace/name`, or `name` for cluster-scoped kinds)
        id: String,

        /// Write the imported state here
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Read an object through its data source
    Data {
        type_name: String,

        #[arg(long)]
        name: String,

        #[arg(short, long)]
        namespace: Option<String>,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        config: cli.config,
        catalog: cli.catalog,
        offline: cli.offline,
    };

    match cli.command {
        Commands::Schema { type_name } => commands::schema::run(&ctx, type_name.as_deref()),

        Commands::Render {
            type_name,
            file,
            output,
        } => commands::render::run(&ctx, &type_name, &file, output.as_deref()),

        Commands::Apply {
            type_name,
            file,
            state,
        } => commands::apply::run(&ctx, &type_name, &file, state.as_deref()).await,

        Commands::Get { type_name, id } => commands::get::run(&ctx, &type_name, &id).await,

        Commands::Delete {
            type_name,
            id,
            state,
        } => commands::delete::run(&ctx, &type_name, id.as_deref(), state.as_deref()).await,

        Commands::Import {
            type_name,
            id,
            state,
        } => commands::import::run(&ctx, &type_name, &id, state.as_deref()).await,

        Commands::Data {
            type_name,
            name,
            namespace,
        } => commands::data::run(&ctx, &type_name, &name, namespace.as_deref()).await,
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
