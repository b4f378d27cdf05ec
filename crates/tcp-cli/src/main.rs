mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let url = cli.url;
    let role = cli.role;

    match cli.command {
        Command::Serve { bind, port, provider } => commands::serve(bind, port, provider).await,
        Command::Plan { tier, org, env, app, declarations, provider, dry_run } => {
            commands::plan(url, role, tier, org, env, app, declarations, provider, dry_run).await
        }
        Command::Approve { tier, plan_id, approved_by } => {
            commands::approve(url, role, tier, plan_id, approved_by).await
        }
        Command::Apply { tier, plan_id } => commands::apply(url, role, tier, plan_id).await,
        Command::Graph { tier, plan_id, output } => {
            commands::graph(url, role, tier, plan_id, output).await
        }
        Command::Reconcile { tier, org, env, app, provider } => {
            commands::reconcile(url, role, tier, org, env, app, provider).await
        }
        Command::Status { tier, org, env, app } => {
            commands::status(url, role, tier, org, env, app).await
        }
    }
}
