use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "tcpctl",
    about = "Tiered infrastructure control plane: plan, approve, and apply capability declarations",
    version
)]
pub struct Cli {
    /// Base URL of a running tcp-api server.
    #[arg(long, env = "TCPCTL_URL", global = true, default_value = "http://127.0.0.1:8080")]
    pub url: String,

    /// Role sent as the `x-tcp-role` header on every tier-qualified request.
    #[arg(long, env = "TCPCTL_ROLE", global = true, default_value = "tier_admin")]
    pub role: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the control-plane API server (local, in-process store).
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Default provider new plans resolve to when none is specified.
        #[arg(long, default_value = "local")]
        provider: String,
    },

    /// Build a plan for a tier's capability declarations.
    Plan {
        #[arg(value_enum)]
        tier: TierArg,
        org: String,
        env: String,
        #[arg(long)]
        app: Option<String>,
        /// Path to a JSON file holding an array of capability declarations.
        declarations: PathBuf,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },

    /// Approve a pending plan.
    Approve {
        #[arg(value_enum)]
        tier: TierArg,
        plan_id: String,
        #[arg(long, default_value = "operator")]
        approved_by: String,
    },

    /// Apply an approved plan.
    Apply {
        #[arg(value_enum)]
        tier: TierArg,
        plan_id: String,
    },

    /// Show a plan's actions as a table, or as Graphviz DOT with --output dot.
    Graph {
        #[arg(value_enum)]
        tier: TierArg,
        plan_id: String,
        #[arg(long, default_value = "text")]
        output: GraphOutput,
    },

    /// Run one reconciliation cycle against live resources and report drift.
    Reconcile {
        #[arg(value_enum)]
        tier: TierArg,
        org: String,
        env: String,
        #[arg(long)]
        app: Option<String>,
        #[arg(long)]
        provider: Option<String>,
    },

    /// Show resource counts for a tier context.
    Status {
        #[arg(value_enum)]
        tier: TierArg,
        org: String,
        env: String,
        #[arg(long)]
        app: Option<String>,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum TierArg {
    Tier1,
    Tier2,
    Tier3,
}

impl TierArg {
    pub fn segment(&self) -> &'static str {
        match self {
            TierArg::Tier1 => "tier1",
            TierArg::Tier2 => "tier2",
            TierArg::Tier3 => "tier3",
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum GraphOutput {
    Text,
    Dot,
}
