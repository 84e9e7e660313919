use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tfeval::WalkOperation;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the vertices of one module after enrichment.
    Graph(GraphArgs),
    /// Show the evaluation tree of every vertex for one walk.
    Explain(ExplainArgs),
}

#[derive(clap::Args, Debug)]
pub struct InputArgs {
    /// Configuration tree as JSON.
    #[arg(long, env = "TFEVAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Persisted state as JSON.
    #[arg(long, env = "TFEVAL_STATE")]
    pub state: Option<PathBuf>,

    /// Provider schemas as JSON, keyed by provider type.
    #[arg(long, env = "TFEVAL_SCHEMAS")]
    pub schemas: Option<PathBuf>,

    /// Module path, e.g. `module.net`. Defaults to the root module.
    #[arg(long, default_value = "")]
    pub module: String,
}

#[derive(clap::Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(clap::Args, Debug)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long, default_value = "plan")]
    pub walk: WalkOperation,
}
