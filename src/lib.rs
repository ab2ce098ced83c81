// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod gate;
pub mod graph;
pub mod logging;
pub mod milestone;
pub mod session;
pub mod types;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, GraphArgs, MilestoneArgs, SessionAction, SessionArgs, VerifyArgs};
use crate::config::{load_or_default, ConfigFile};
use crate::gate::{GatePipeline, PipelineResult};
use crate::graph::{
    compute_waves, find_blocked, find_ready, group_status, load_details, load_graph,
    validate_graph, DetailStore, FileOverrides, RequirementGraph,
};
use crate::milestone::{build_dag, compute_execution_waves, get_ready_milestones, load_milestones};
use crate::session::{Session, SessionRegistry};

/// High-level entry point used by `main.rs`.
///
/// Loads the config (defaults when the file is missing), dispatches the
/// subcommand and prints its output to stdout. `validate` and `verify`
/// return an error when the graph has error findings or a gate failed, so
/// the process exit code reflects the outcome.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    debug!(config = %args.config.display(), gates = cfg.gate.len(), "config loaded");

    match &args.command {
        Command::Validate(g) => cmd_validate(g, args.json),
        Command::Ready(g) => cmd_ready(g, args.json),
        Command::Blocked(g) => cmd_blocked(g, args.json),
        Command::Waves(g) => cmd_waves(g, args.json),
        Command::Status(g) => cmd_status(g, args.json),
        Command::Milestones(m) => cmd_milestones(m, args.json),
        Command::Verify(v) => cmd_verify(&cfg, v, args.json).await,
        Command::Sessions(s) => cmd_sessions(&cfg, s, args.json),
    }
}

fn load_graph_inputs(args: &GraphArgs) -> Result<(RequirementGraph, DetailStore)> {
    let graph = load_graph(&args.graph)
        .with_context(|| format!("loading graph index {}", args.graph.display()))?;
    let details = match &args.details {
        Some(path) => {
            load_details(path).with_context(|| format!("loading details {}", path.display()))?
        }
        None => DetailStore::new(),
    };
    Ok((graph, details))
}

fn cmd_validate(args: &GraphArgs, json: bool) -> Result<()> {
    let (graph, details) = load_graph_inputs(args)?;
    let report = validate_graph(&graph, &details);

    if json {
        print_json(&report)?;
    } else if report.findings.is_empty() {
        println!("graph OK ({} requirements)", graph.len());
    } else {
        for finding in &report.findings {
            println!("{:<7} {finding}", finding.severity());
        }
    }

    if !report.is_ok() {
        bail!("graph has {} error finding(s)", report.errors().count());
    }
    Ok(())
}

fn cmd_ready(args: &GraphArgs, json: bool) -> Result<()> {
    let (graph, _) = load_graph_inputs(args)?;
    let ready = find_ready(&graph)?;
    if json {
        return print_json(&ready);
    }
    for id in &ready {
        println!("{id}");
    }
    Ok(())
}

fn cmd_blocked(args: &GraphArgs, json: bool) -> Result<()> {
    let (graph, _) = load_graph_inputs(args)?;
    let blocked = find_blocked(&graph);
    if json {
        return print_json(&blocked);
    }
    for item in &blocked {
        let blockers: Vec<String> = item.blockers.iter().map(|b| b.to_string()).collect();
        println!("{}: {}", item.id, blockers.join(", "));
    }
    Ok(())
}

fn cmd_waves(args: &GraphArgs, json: bool) -> Result<()> {
    let (graph, details) = load_graph_inputs(args)?;
    let ready = find_ready(&graph)?;
    let waves = compute_waves(&ready, &details, &FileOverrides::new());
    if json {
        return print_json(&waves);
    }
    for wave in &waves {
        println!("wave {}: {}", wave.wave_number, wave.members.join(" "));
    }
    Ok(())
}

fn cmd_status(args: &GraphArgs, json: bool) -> Result<()> {
    let (graph, _) = load_graph_inputs(args)?;
    let groups = group_status(&graph)?;
    if json {
        return print_json(&groups);
    }
    for g in &groups {
        let mark = if g.is_complete { "done" } else { "open" };
        println!(
            "{:<4} {} ({}): {}/{} complete, {} in progress, {} rejected",
            mark,
            g.key,
            g.name,
            g.counts.complete,
            g.counts.non_rejected(),
            g.counts.in_progress,
            g.counts.rejected,
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct MilestoneReport {
    plan: crate::milestone::ExecutionPlan,
    ready: Vec<u32>,
}

fn cmd_milestones(args: &MilestoneArgs, json: bool) -> Result<()> {
    let milestones = load_milestones(&args.file)
        .with_context(|| format!("loading milestones {}", args.file.display()))?;
    let dag = build_dag(&milestones)?;
    let plan = compute_execution_waves(&dag);
    let completed: BTreeSet<u32> = args.completed.iter().copied().collect();
    let ready = get_ready_milestones(&dag, &completed);

    if json {
        return print_json(&MilestoneReport { plan, ready });
    }

    for wave in &plan.waves {
        let labels: Vec<String> = wave
            .members
            .iter()
            .filter_map(|n| dag.node(*n))
            .map(|node| node.milestone.label())
            .collect();
        println!("wave {}: {}", wave.wave_number, labels.join(", "));
    }
    println!(
        "max parallelism {}{}",
        plan.max_parallelism,
        if plan.is_sequential { " (sequential)" } else { "" }
    );
    let ready: Vec<String> = ready.iter().map(|n| format!("M{n}")).collect();
    println!("ready: {}", ready.join(", "));
    Ok(())
}

async fn cmd_verify(cfg: &ConfigFile, args: &VerifyArgs, json: bool) -> Result<()> {
    let requested = if args.gates.is_empty() {
        cfg.default_gate_order()
    } else {
        args.gates.clone()
    };
    if requested.is_empty() {
        info!("no gates configured; nothing to verify");
    }

    let options = cfg.pipeline_options().with_iteration(args.iteration);
    let pipeline = GatePipeline::new(cfg.gate_registry(), &args.project_dir);
    let result = pipeline.run(requested.as_slice(), &options).await;

    if json {
        print_json(&result)?;
    } else {
        print_pipeline(&result);
    }

    if !result.passed {
        let failed: Vec<&str> = result.failed_gates().map(|g| g.gate.as_str()).collect();
        bail!("gates failed: {}", failed.join(", "));
    }
    Ok(())
}

fn print_pipeline(result: &PipelineResult) {
    for gate in &result.gates {
        let mark = if gate.passed { "PASS" } else { "FAIL" };
        println!("{mark} {} ({} ms)", gate.gate, gate.duration_ms);
        for err in &gate.errors {
            match (&err.file, err.line) {
                (Some(file), Some(line)) => println!("    {file}:{line}: {}", err.message),
                (Some(file), None) => println!("    {file}: {}", err.message),
                _ => println!("    {}", err.message),
            }
            if let Some(hint) = &err.remediation {
                println!("      hint: {hint}");
            }
        }
        for warning in &gate.warnings {
            println!("    warning: {warning}");
        }
    }
    println!(
        "iteration {}: {}",
        result.iteration,
        if result.passed { "passed" } else { "failed" }
    );
}

fn cmd_sessions(cfg: &ConfigFile, args: &SessionArgs, json: bool) -> Result<()> {
    let registry = open_registry(cfg, &args.repo);
    let sessions = match args.action {
        SessionAction::List => registry.list()?,
        SessionAction::Stale => registry.detect_stale_sessions()?,
        SessionAction::Prune => registry.prune_stale()?,
    };

    if json {
        return print_json(&sessions);
    }
    for s in &sessions {
        print_session(s);
    }
    Ok(())
}

fn open_registry(cfg: &ConfigFile, repo: &Path) -> SessionRegistry {
    SessionRegistry::open(repo).with_lock_options(cfg.lock_options())
}

fn print_session(s: &Session) {
    println!(
        "{} {:<10} pid={} user={} skill={} item={} branch={} started={}",
        s.id,
        s.status,
        s.pid,
        s.user,
        s.skill,
        s.work_item.as_deref().unwrap_or("-"),
        s.branch,
        s.started_at.to_rfc3339(),
    );
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
