//! mlpkg command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use mlpkg::{
    infer_kind, Config, HttpRegistry, LocalStore, Outcome, Overrides, PackageManager,
    ResourceKind,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mlpkg")]
#[command(about = "Package manager for code, data and model resources", long_about = None)]
#[command(version)]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Registry base URL
    #[arg(long, global = true)]
    registry: Option<String>,

    /// More log output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize code, data and model folders
    Init,
    /// Add a resource and its dependencies
    Add {
        /// Resource name
        name: String,
        /// Resource version (latest when omitted)
        version: Option<String>,
    },
    /// Remove a resource
    Remove {
        /// Resource name
        name: String,
    },
    /// List installed resources
    List {
        /// Only this kind (code, data or model)
        kind: Option<ResourceKind>,
    },
    /// List resources available on the registry
    Available {
        /// Only this kind (code, data or model)
        kind: Option<ResourceKind>,
    },
    /// List the dependencies of a resource
    Dependencies {
        /// Resource name
        name: String,
        /// Resource version (installed or latest when omitted)
        version: Option<String>,
    },
    /// Publish a resource to the registry
    Publish {
        /// Resource name
        name: String,
        /// Resource version
        version: String,
        /// Code dependencies, e.g. code.py@1.2.3
        #[arg(long = "codedeps", value_delimiter = ',')]
        code_deps: Vec<String>,
        /// Data dependencies, e.g. dataset.csv@1.0.0
        #[arg(long = "datadeps", value_delimiter = ',')]
        data_deps: Vec<String>,
        /// Model dependencies, e.g. model39.pmml@13.4.2
        #[arg(long = "modeldeps", value_delimiter = ',')]
        model_deps: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = mlpkg::logging::init(cli.verbose) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let overrides = Overrides {
        root: cli.root,
        registry_url: cli.registry,
    };
    let config = Config::load(&overrides).context("Failed to load configuration")?;

    if let Commands::Init = cli.command {
        LocalStore::init(&config.root)
            .with_context(|| format!("Failed to initialize {}", config.root.display()))?;
        println!("Initialized workspace in {}", config.root.display());
        return Ok(Ok(()));
    }

    let store = LocalStore::open(&config.root)?;
    let registry = HttpRegistry::with_timeouts(
        &config.registry_url,
        config.timeout(),
        config.connect_timeout(),
    )
    .context("Failed to create registry client")?;
    let mut pm = PackageManager::new(store, registry);

    let outcome = match cli.command {
        Commands::Init => Ok(()),
        Commands::Add { name, version } => {
            pm.add_package(infer_kind(&name)?, &name, version.as_deref())
        }
        Commands::Remove { name } => pm.remove_package(infer_kind(&name)?, &name),
        Commands::List { kind } => pm.list_resources(kind),
        Commands::Available { kind } => pm.list_available_resources(kind),
        Commands::Dependencies { name, version } => {
            pm.list_dependencies(infer_kind(&name)?, &name, version.as_deref())
        }
        Commands::Publish {
            name,
            version,
            code_deps,
            data_deps,
            model_deps,
        } => pm.publish_resource(
            infer_kind(&name)?,
            &name,
            &version,
            &code_deps,
            &data_deps,
            &model_deps,
        ),
    };

    Ok(outcome)
}
