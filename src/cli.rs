use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clusterform")]
#[command(version)]
#[command(about = "Declarative management of Kafka and Cassandra cluster resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Abort remote calls after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub deadline: Option<u64>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection and file locations; each flag falls back to its environment
/// variable, then to the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Config file (default: ~/.config/clusterform/config.toml)
    #[arg(long, global = true, env = "CLUSTERFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// State file (default: ~/.local/state/clusterform/state.json)
    #[arg(long, global = true, env = "CLUSTERFORM_STATE")]
    pub state: Option<PathBuf>,

    /// Management API host
    #[arg(long, global = true, env = "CLUSTERFORM_HOST")]
    pub host: Option<String>,

    /// API key
    #[arg(long, global = true, env = "CLUSTERFORM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Organization id
    #[arg(long, global = true, env = "CLUSTERFORM_ORG_ID")]
    pub org_id: Option<String>,

    /// http or https
    #[arg(long, global = true, env = "CLUSTERFORM_PROTOCOL")]
    pub protocol: Option<String>,

    /// AxonApi or Bearer
    #[arg(long, global = true, env = "CLUSTERFORM_TOKEN_TYPE")]
    pub token_type: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "CLUSTERFORM_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a remote object and start tracking it
    Create(CreateArgs),

    /// Read one tracked record from the remote system
    Read(AddressArgs),

    /// Read every tracked record in parallel
    Refresh(RefreshArgs),

    /// Apply a new spec to a tracked record
    Update(UpdateArgs),

    /// Delete a remote object and stop tracking it
    Delete(AddressArgs),

    /// Start tracking an existing remote object
    Import(ImportArgs),

    /// Show an existing remote object without tracking it
    Lookup(LookupArgs),

    /// List import ids of remote objects on a cluster
    Discover(DiscoverArgs),

    /// List tracked records
    List,

    /// Show a tracked record as stored
    Show(AddressArgs),

    /// Show or validate the configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct AddressArgs {
    /// Record address, e.g. topic.orders
    pub address: String,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Record address, e.g. topic.orders
    pub address: String,

    /// Cluster name
    #[arg(short, long)]
    pub cluster: String,

    /// Cluster type (default depends on the kind)
    #[arg(long)]
    pub cluster_type: Option<String>,

    /// Spec file, JSON or TOML by extension; `-` reads JSON from stdin
    #[arg(short, long)]
    pub spec: PathBuf,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Record address, e.g. topic.orders
    pub address: String,

    /// Spec file, JSON or TOML by extension; `-` reads JSON from stdin
    #[arg(short, long)]
    pub spec: PathBuf,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Record address, e.g. topic.orders
    pub address: String,

    /// Import id, e.g. prod/orders
    pub id: String,
}

#[derive(Args)]
pub struct LookupArgs {
    /// Resource kind, e.g. topic
    pub kind: String,

    /// Import id, e.g. prod/orders
    pub id: String,
}

#[derive(Args)]
pub struct DiscoverArgs {
    /// Resource kind, e.g. topic
    pub kind: String,

    /// Cluster name
    #[arg(short, long)]
    pub cluster: String,

    /// Cluster type (default depends on the kind)
    #[arg(long)]
    pub cluster_type: Option<String>,
}

#[derive(Args)]
pub struct RefreshArgs {
    /// Number of parallel reads
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,

    /// Stop starting new reads after the first failure
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved configuration with secrets masked
    Show,

    /// Check the configuration without contacting the server
    Validate,
}
