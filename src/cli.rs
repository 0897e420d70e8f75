use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "novagg")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile Nova host aggregates with the openstack CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// nova.conf holding the [keystone_authtoken] credentials
    #[arg(
        long,
        global = true,
        env = "NOVAGG_NOVA_CONF",
        default_value = novakit::credentials::DEFAULT_NOVA_CONF
    )]
    pub nova_conf: PathBuf,

    /// Path to the openstack executable (defaults to the one in PATH)
    #[arg(long = "openstack", global = true, env = "NOVAGG_OPENSTACK_BIN")]
    pub openstack_bin: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show desired vs reported state of every aggregate in the manifest
    Status(ManifestArgs),

    /// Preview the commands apply would issue
    Diff(ManifestArgs),

    /// Make the reported aggregates match the manifest
    Apply(ApplyArgs),

    /// Show one aggregate as reported by the CLI
    Show(ShowArgs),

    /// Remove an aggregate, detaching its hosts first
    Destroy(DestroyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Parser)]
pub struct ManifestArgs {
    /// Manifest file (defaults to aggregates.toml in the config dir)
    pub manifest: Option<PathBuf>,

    /// Only handle the named aggregate
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Dry run - show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Aggregate name
    pub name: String,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct DestroyArgs {
    /// Aggregate name
    pub name: String,

    /// Dry run - show what would be done
    #[arg(long)]
    pub dry_run: bool,
}
