//! CLI struct definitions for the tutorpath command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use crate::plugins::{graph, state};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "tutorpath",
    version = env!("CARGO_PKG_VERSION"),
    about = "Adaptive tutoring decisions over a skill prerequisite graph",
    disable_version_flag = true
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). TUTORPATH_LOG wins.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Emit logs as JSON lines on stderr.
    #[clap(long, global = true)]
    pub json_logs: bool,
    /// Project directory containing `.tutorpath/` (default: search upward from cwd).
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
pub struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    pub dir: Option<PathBuf>,
    /// Overwrite an existing config and data files.
    #[clap(long)]
    pub force: bool,
    /// State backend: 'memory' or 'sqlite'.
    #[clap(long, default_value = "sqlite")]
    pub backend: String,
}

#[derive(clap::Args, Debug)]
pub struct IngestCli {
    #[clap(long)]
    pub session: String,
    #[clap(long)]
    pub message: Option<String>,
    /// start | content_only | answer | diagnostic_yes | diagnostic_no
    #[clap(long)]
    pub action: Option<String>,
    #[clap(long)]
    pub question_id: Option<String>,
    #[clap(long)]
    pub answer: Option<String>,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub struct GradeCli {
    #[clap(long)]
    pub session: String,
    #[clap(long)]
    pub question: String,
    #[clap(long)]
    pub answer: String,
}

#[derive(clap::Args, Debug)]
pub struct ResetCli {
    #[clap(long)]
    pub session: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create `.tutorpath/` with a config and editable curriculum data
    #[clap(name = "init")]
    Init(InitCli),

    /// Send one learner event and print the next tutoring turn
    #[clap(name = "ingest")]
    Ingest(IngestCli),

    /// Grade an answer without deciding the next turn
    #[clap(name = "grade")]
    Grade(GradeCli),

    /// Delete all state for a session
    #[clap(name = "reset")]
    Reset(ResetCli),

    /// Inspect learner state
    #[clap(name = "session")]
    Session(state::SessionCli),

    /// Inspect the skill graph
    #[clap(name = "graph")]
    Graph(graph::GraphCli),

    /// Serve newline-delimited JSON requests on stdin
    #[clap(name = "rpc")]
    Rpc,

    /// Liveness check
    #[clap(name = "health")]
    Health,

    /// Describe operations and storage as JSON
    #[clap(name = "schema")]
    Schema,

    /// Show version information
    #[clap(name = "version")]
    Version,
}
