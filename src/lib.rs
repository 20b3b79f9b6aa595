//! tutorpath: adaptive tutoring decisions over a skill prerequisite graph.
//!
//! Given a learner's session, tutorpath picks exactly one next pedagogical action:
//! offer a diagnostic, ask a question, review a prerequisite, advance, or answer a
//! content request. Each choice carries the evidence behind it and a coarse
//! confidence tier, so the rendered rationale is explainable.
//!
//! # Architecture
//!
//! - The skill graph and question bank are loaded once, validated, and shared
//!   read-only.
//! - Learner state lives behind a `StateStore` (in-memory or SQLite), chosen by
//!   configuration. SQLite access goes through `DbBroker`, which serializes access and
//!   appends to `broker.events.jsonl`.
//! - Every session operation runs under a per-session lock.
//!
//! # Examples
//!
//! ```bash
//! tutorpath init --backend sqlite
//! tutorpath ingest --session s1 --action start
//! tutorpath ingest --session s1 --action diagnostic_yes
//! tutorpath ingest --session s1 --action answer --question-id math.1 --answer 32
//! tutorpath graph path --id core.search.binary
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: configuration, errors, storage plumbing, audit log, locking
//! - [`plugins`]: skill graph, question bank, scoring, policy, state, orchestration

pub mod cli;
pub mod core;
pub mod plugins;

use crate::core::{
    assets,
    config::{CONFIG_FILE_NAME, TutorConfig},
    error::TutorError,
    rpc::{self, RpcRequest},
    store::StoreKind,
    time,
};
use crate::plugins::{
    graph::{self, SkillGraph},
    orchestrator::{self, IngestEvent, IngestResponse, Tutor},
    state,
};

use crate::cli::{Cli, Command, IngestCli, InitCli};
use colored::Colorize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const PROJECT_DIR_NAME: &str = ".tutorpath";
pub const DATA_DIR_NAME: &str = "data";

/// Walk up from `start_dir` to the first directory holding `.tutorpath/`.
pub fn find_tutorpath_root(start_dir: &Path) -> Result<PathBuf, TutorError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(PROJECT_DIR_NAME).exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(TutorError::NotFound(
                "'.tutorpath' directory not found in current or parent directories. Run `tutorpath init` first.".to_string(),
            ));
        }
    }
}

/// Create `.tutorpath/` under `dir`. Returns the store root.
pub fn init_project(dir: &Path, backend: StoreKind, force: bool) -> Result<PathBuf, TutorError> {
    let store_root = dir.join(PROJECT_DIR_NAME);
    let data_dir = store_root.join(DATA_DIR_NAME);
    fs::create_dir_all(&data_dir)?;

    let config_path = store_root.join(CONFIG_FILE_NAME);
    if !config_path.exists() || force {
        let mut config = TutorConfig::default();
        config.store.backend = backend;
        config.data.dir = Some(PathBuf::from(DATA_DIR_NAME));
        fs::write(&config_path, config.to_toml()?)?;
    }

    for name in assets::list_embedded() {
        let target = data_dir.join(name);
        if target.exists() && !force {
            continue;
        }
        if let Some(content) = assets::get_embedded(name) {
            fs::write(&target, content)?;
        }
    }

    tracing::info!(root = %store_root.display(), backend = backend.as_str(), "project initialized");
    Ok(store_root)
}

fn store_root(cli_root: Option<&Path>) -> Result<PathBuf, TutorError> {
    let project = match cli_root {
        Some(dir) => dir.to_path_buf(),
        None => find_tutorpath_root(&std::env::current_dir()?)?,
    };
    Ok(project.join(PROJECT_DIR_NAME))
}

fn open_tutor(store_root: &Path) -> Result<Tutor, TutorError> {
    let config = TutorConfig::load_with_env(store_root)?;
    Tutor::from_config(store_root, &config)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "service": "tutorpath",
        "version": env!("CARGO_PKG_VERSION"),
        "subsystems": [
            orchestrator::schema(),
            graph::schema(),
            state::schema(),
        ]
    })
}

pub fn health() -> serde_json::Value {
    serde_json::json!({ "status": "ok", "service": "tutorpath" })
}

/// Dispatch one RPC request against a live tutor.
pub fn handle_rpc(tutor: &Tutor, req: &RpcRequest) -> Result<serde_json::Value, TutorError> {
    let params = &req.params;
    match req.op.as_str() {
        "ingest" => {
            let event: IngestEvent = serde_json::from_value(params.clone())?;
            Ok(serde_json::to_value(tutor.ingest(&event)?)?)
        }
        "grade" => {
            let outcome = tutor.grade_answer(
                rpc::str_param(params, "session_id")?,
                rpc::str_param(params, "question_id")?,
                params.get("answer").and_then(|v| v.as_str()).unwrap_or_default(),
            )?;
            Ok(serde_json::to_value(outcome)?)
        }
        "reset" => {
            let existed = tutor.reset_session(rpc::str_param(params, "session_id")?)?;
            Ok(serde_json::json!({ "reset": existed }))
        }
        "session.show" => {
            let session_id = rpc::str_param(params, "session_id")?;
            let state = tutor
                .snapshot(session_id)?
                .ok_or_else(|| TutorError::NotFound(format!("session '{}'", session_id)))?;
            Ok(serde_json::to_value(state)?)
        }
        "session.list" => Ok(serde_json::json!({ "sessions": tutor.list_sessions()? })),
        "health" => Ok(health()),
        "schema" => Ok(schema()),
        other => Err(TutorError::ValidationError(format!("unknown op '{}'", other))),
    }
}

fn print_turn(resp: &IngestResponse) {
    if let Some(graded) = &resp.graded {
        match graded {
            orchestrator::GradeReport::Graded(g) if g.correct => {
                println!("{} {}", "✓".bright_green(), "correct".bright_green())
            }
            orchestrator::GradeReport::Graded(g) => println!(
                "{} expected {}",
                "✗".bright_red(),
                g.expected.bright_white()
            ),
            orchestrator::GradeReport::Failed { error } => {
                println!("{} {}", "!".bright_yellow(), error)
            }
        }
    }

    let turn = &resp.result.turn;
    let ui = &resp.result.ui;
    println!(
        "{} {} {}",
        turn.action.as_str().bright_cyan().bold(),
        turn.next_node.as_deref().unwrap_or("-").bright_white(),
        format!("({})", turn.confidence.as_str()).bright_black()
    );
    println!("{}", ui.rationale);
    if let Some(q) = &ui.question {
        println!();
        println!("  [{}] {}", q.id.bright_black(), q.prompt);
        for choice in &q.choices {
            println!("    - {}", choice);
        }
    }
    if let Some(content) = &ui.content {
        println!();
        println!("{}", content.content_markdown);
    }
    for option in &ui.options {
        println!("  > {}", option.bright_yellow());
    }
    if !turn.unlocked.is_empty() {
        println!("  unlocked: {}", turn.unlocked.join(", ").bright_green());
    }
}

fn run_ingest(tutor: &Tutor, args: IngestCli) -> Result<(), TutorError> {
    let event = IngestEvent {
        session_id: args.session,
        message: args.message,
        action: args.action,
        question_id: args.question_id,
        answer: args.answer,
    };
    let resp = tutor.ingest(&event)?;
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        print_turn(&resp);
    }
    Ok(())
}

fn run_init(args: InitCli) -> Result<(), TutorError> {
    let backend = StoreKind::parse(&args.backend).ok_or_else(|| {
        TutorError::ValidationError(format!("unknown backend '{}'", args.backend))
    })?;
    let dir = match args.dir {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let store_root = init_project(&dir, backend, args.force)?;
    println!(
        "{} {} ({})",
        "initialized".bright_green(),
        store_root.display(),
        backend.as_str()
    );
    Ok(())
}

pub fn run(cli: Cli) -> Result<(), TutorError> {
    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Health => {
            println!("{}", serde_json::to_string(&health())?);
            Ok(())
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&schema())?);
            Ok(())
        }
        Command::Init(args) => run_init(args),
        Command::Graph(args) => {
            // Works outside a project: falls back to the embedded graph.
            let graph = match store_root(cli.root.as_deref()) {
                Ok(root) => {
                    let config = TutorConfig::load_with_env(&root)?;
                    SkillGraph::load(config.data_dir(&root).as_deref())?
                }
                Err(TutorError::NotFound(_)) => SkillGraph::builtin()?,
                Err(e) => return Err(e),
            };
            graph::run_graph_cli(&graph, args)
        }
        Command::Ingest(args) => {
            let tutor = open_tutor(&store_root(cli.root.as_deref())?)?;
            run_ingest(&tutor, args)
        }
        Command::Grade(args) => {
            let tutor = open_tutor(&store_root(cli.root.as_deref())?)?;
            let outcome = tutor.grade_answer(&args.session, &args.question, &args.answer)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Command::Reset(args) => {
            let tutor = open_tutor(&store_root(cli.root.as_deref())?)?;
            let existed = tutor.reset_session(&args.session)?;
            println!(
                "{}",
                serde_json::to_string(&time::response_envelope(
                    "reset",
                    "ok",
                    serde_json::json!({ "session_id": args.session, "existed": existed }),
                ))?
            );
            Ok(())
        }
        Command::Session(args) => {
            let tutor = open_tutor(&store_root(cli.root.as_deref())?)?;
            state::run_session_cli(tutor.store(), args)
        }
        Command::Rpc => {
            let tutor = open_tutor(&store_root(cli.root.as_deref())?)?;
            let stdin = io::stdin();
            let handled = rpc::serve(stdin.lock(), io::stdout().lock(), |req| {
                handle_rpc(&tutor, req)
            })?;
            tracing::info!(handled, "rpc input closed");
            Ok(())
        }
    }
}
