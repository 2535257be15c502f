//! Clap derive structures for the `applb` CLI.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use applb_core::Scheme;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// applb -- manage internal application load balancer rules
#[derive(Debug, Parser)]
#[command(
    name = "applb",
    version,
    about = "Manage internal application load balancer rules",
    long_about = "Create, inspect and delete internal load balancer rules on guest networks.\n\n\
        Networks and accounts come from the config file; rules persist in a\n\
        JSON state file between invocations.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "APPLB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Rule state file (defaults to the platform data directory)
    #[arg(long, env = "APPLB_STATE", global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "APPLB_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// User id recorded against usage events
    #[arg(long, default_value_t = 1, global = true)]
    pub caller: u64,

    /// Account id of the calling user
    #[arg(long, default_value_t = 1, global = true)]
    pub caller_account: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchemeArg {
    Internal,
    Public,
}

impl From<SchemeArg> for Scheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Internal => Scheme::Internal,
            SchemeArg::Public => Scheme::Public,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Rule(RuleCommand),

    /// Inspect configuration
    Config(ConfigArgs),
}

/// Subcommands that operate on the rule set and need a loaded session.
#[derive(Debug, Subcommand)]
pub enum RuleCommand {
    /// Create a load balancer rule
    #[command(alias = "add")]
    Create(CreateArgs),

    /// Show one rule
    Get {
        /// Rule id
        id: u64,
    },

    /// Delete a rule
    #[command(alias = "rm")]
    Delete {
        /// Rule id
        id: u64,
    },

    /// List rules
    #[command(alias = "ls")]
    List(ListArgs),

    /// Acknowledge staged rules, moving them to Active
    Ack,
}

// ── Rule arguments ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Rule name
    #[arg(long)]
    pub name: String,

    /// Free-text description (defaults to the name)
    #[arg(long)]
    pub description: Option<String>,

    /// Load balancer scheme
    #[arg(long, default_value = "internal")]
    pub scheme: SchemeArg,

    /// Network the source IP belongs to
    #[arg(long)]
    pub network: u64,

    /// Source IP (allocated from the network when omitted)
    #[arg(long)]
    pub ip: Option<Ipv4Addr>,

    /// Port the rule listens on
    #[arg(long, allow_negative_numbers = true)]
    pub source_port: i32,

    /// Port on the balanced instances
    #[arg(long, allow_negative_numbers = true)]
    pub instance_port: i32,

    /// Balancing algorithm: roundrobin, leastconn or source
    #[arg(long, default_value = "roundrobin")]
    pub algorithm: String,

    /// Network hosting the balanced instances (defaults to --network)
    #[arg(long)]
    pub guest_network: Option<u64>,

    /// Owning account
    #[arg(long, default_value_t = 1)]
    pub account: u64,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only rules owned by this account
    #[arg(long)]
    pub account: Option<u64>,

    /// Only rules whose source IP is on this network
    #[arg(long)]
    pub network: Option<u64>,

    /// Only rules on this source IP
    #[arg(long)]
    pub ip: Option<Ipv4Addr>,
}

// ── Config arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config and state file paths
    Path,
    /// Print the effective configuration as TOML
    Show,
}
