//! Hedvig Adapter CLI
//!
//! Drives one lifecycle operation per invocation against a Hedvig cluster.
//! Desired attribute sets are read from YAML or JSON files and resulting
//! states are printed to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hedvig_adapter::{
    Cluster, ClusterConfig, DynResource, Error, HttpTransport, ResourceFactory, ResourceKind,
    ResourceState, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Hedvig Adapter - lifecycle of virtual disks, LUNs, mounts and ACL entries
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cluster node address (host or host:port)
    #[arg(long, env = "HV_NODE", default_value = "")]
    node: String,

    /// Cluster username
    #[arg(long, env = "HV_USERNAME", default_value = "")]
    username: String,

    /// Cluster password
    #[arg(long, env = "HV_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// URL scheme of the REST endpoint
    #[arg(long, env = "HV_SCHEME", default_value = "http")]
    scheme: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a resource and print its state
    Create {
        kind: ResourceKind,
        /// Desired attributes (YAML or JSON)
        #[arg(long)]
        attrs: PathBuf,
    },
    /// Read a resource; prints `absent` when it no longer exists
    Read {
        kind: ResourceKind,
        #[arg(long)]
        id: String,
        /// Prior attributes, for fields the cluster does not report
        #[arg(long)]
        attrs: Option<PathBuf>,
    },
    /// Update a resource in place
    Update {
        kind: ResourceKind,
        #[arg(long)]
        id: String,
        /// Attributes currently recorded for the resource
        #[arg(long)]
        prior: PathBuf,
        /// Desired attributes
        #[arg(long)]
        attrs: PathBuf,
    },
    /// Delete a resource
    Delete {
        kind: ResourceKind,
        #[arg(long)]
        id: String,
    },
    /// Print the attribute schema of a kind
    Schema { kind: ResourceKind },
}

impl Args {
    fn cluster_config(&self) -> ClusterConfig {
        let mut config = ClusterConfig::for_node(&self.node)
            .with_credentials(&self.username, &self.password);
        config.scheme = self.scheme.clone();
        config
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args)?;

    let config = args.cluster_config();

    if let Commands::Schema { kind } = &args.command {
        // Schema rendering never touches the network
        let cluster = Arc::new(Cluster::new(&config, Arc::new(HttpTransport::new())));
        let schema = ResourceFactory::create(*kind, cluster).schema()?;
        return print_json(&schema);
    }

    info!("Hedvig adapter v{} targeting {}", hedvig_adapter::VERSION, config.node);
    let cluster = Cluster::connect(&config)?;

    match args.command {
        Commands::Create { kind, attrs } => {
            let resource = ResourceFactory::create(kind, cluster);
            let state = resource.create(load_attrs(&attrs)?).await?;
            print_state(Some(state))
        }
        Commands::Read { kind, id, attrs } => {
            let resource = ResourceFactory::create(kind, cluster);
            let prior = attrs.as_deref().map(load_attrs).transpose()?;
            print_state(resource.read(&id, prior).await?)
        }
        Commands::Update {
            kind,
            id,
            prior,
            attrs,
        } => {
            let resource = ResourceFactory::create(kind, cluster);
            let state = resource
                .update(&id, load_attrs(&prior)?, load_attrs(&attrs)?)
                .await?;
            print_state(state)
        }
        Commands::Delete { kind, id } => {
            let resource: Arc<dyn DynResource> = ResourceFactory::create(kind, cluster);
            resource.delete(&id).await?;
            info!("Deleted {}", id);
            Ok(())
        }
        Commands::Schema { .. } => Ok(()),
    }
}

// =============================================================================
// Attribute Files
// =============================================================================

/// Load an attribute set from a YAML or JSON file
fn load_attrs(path: &Path) -> Result<JsonValue> {
    let content = std::fs::read_to_string(path)?;
    let value: JsonValue = serde_yaml::from_str(&content).map_err(|e| Error::InvalidAttribute {
        field: path.display().to_string(),
        reason: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(Error::InvalidAttribute {
            field: path.display().to_string(),
            reason: "attribute file must contain a mapping".into(),
        });
    }
    Ok(value)
}

fn print_state(state: Option<ResourceState<JsonValue>>) -> Result<()> {
    match state {
        Some(state) => print_json(&state),
        None => {
            println!("absent");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Internal(format!("output rendering failed: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let quiet = |directive: &str| -> Result<Directive> {
        directive
            .parse::<Directive>()
            .map_err(|e| Error::Configuration(format!("bad log directive {}: {}", directive, e)))
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive(quiet("reqwest=warn")?)
        .add_directive(quiet("rustls=warn")?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
