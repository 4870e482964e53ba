// src/lib.rs

pub mod cli;
pub mod config;
pub mod deps;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod inspect;
pub mod logging;
pub mod plan;
pub mod probe;
pub mod publish;
pub mod report;
pub mod scan;
pub mod stale;
pub mod types;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{BuildConfig, load_and_validate};
use crate::deps::DependencyTracker;
use crate::engine::{Runtime, RuntimeEvent};
use crate::errors::Result;
use crate::exec::{CommandToolchain, PoolExecutorBackend, Toolchain};
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::{BuildGraph, build_graph};
use crate::plan::{BuildPlan, Scheduler, plan_build};
use crate::probe::{CapabilityProbe, FlagSet, PkgConfigProbe, collect_flags};
use crate::report::{BuildReport, Diagnostic};
use crate::scan::scan_project;
use crate::stale::StalenessEvaluator;

/// Knobs for one [`build_project`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Print the planned actions instead of running them.
    pub dry_run: bool,
    /// Turn Ctrl-C into a graceful stop (the CLI sets this).
    pub handle_ctrl_c: bool,
}

/// The resolved graph of a tree and what would be done to it.
#[derive(Debug)]
pub struct Analysis {
    pub graph: BuildGraph,
    pub plan: BuildPlan,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan, build the graph, load records and plan. Touches nothing.
pub fn analyze(fs: &dyn FileSystem, config: &BuildConfig, flags: &FlagSet) -> Result<Analysis> {
    let scan = scan_project(fs, config)?;
    let mut diagnostics = scan.diagnostics.clone();

    let (graph, graph_diagnostics) = build_graph(&scan, config);
    diagnostics.extend(graph_diagnostics);

    let (tracker, record_diagnostics) = DependencyTracker::load(fs, &graph);
    diagnostics.extend(record_diagnostics);

    let evaluator = StalenessEvaluator::new(fs, &tracker);
    let plan = plan_build(&graph, config, &evaluator, flags);

    Ok(Analysis {
        graph,
        plan,
        diagnostics,
    })
}

/// Bring every target of the tree described by `config` up to date.
///
/// Fatal problems (unreadable sources root, IO failures of the engine
/// itself) are errors; failed compiles and links are recorded in the
/// returned report.
pub async fn build_project<T: Toolchain>(
    config: &BuildConfig,
    fs: Arc<dyn FileSystem>,
    toolchain: Arc<T>,
    probe: &dyn CapabilityProbe,
    options: BuildOptions,
) -> Result<BuildReport> {
    let (flags, probe_diagnostics) = collect_flags(probe, &config.probe.packages).await;
    let Analysis {
        graph,
        plan,
        diagnostics,
    } = analyze(fs.as_ref(), config, &flags)?;

    let mut report = BuildReport::default();
    for diagnostic in probe_diagnostics.into_iter().chain(diagnostics) {
        report.push(diagnostic);
    }
    report.up_to_date = plan.up_to_date.clone();

    if options.dry_run {
        for action in &plan.actions {
            println!("{action}");
        }
        debug!("dry-run complete (no execution)");
        return Ok(report);
    }

    if plan.is_empty() {
        info!("everything up to date");
    } else {
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let backend =
            PoolExecutorBackend::new(toolchain, Arc::clone(&fs), config.effective_jobs(), tx.clone());

        if options.handle_ctrl_c {
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            });
        }

        let runtime = Runtime::new(Scheduler::new(plan.actions), rx, backend, report);
        report = runtime.run().await?;
    }

    if config.build.publish && !report.interrupted {
        publish::publish_targets(fs.as_ref(), config, &graph, &mut report);
    }

    Ok(report)
}

/// High-level entry point used by `main.rs`; returns the exit status.
pub async fn run(args: CliArgs) -> anyhow::Result<i32> {
    let config = load_and_validate(&args.root, args.config.as_deref())?.with_jobs(args.jobs);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let probe = PkgConfigProbe::new();

    let command = args.command();
    info!(root = ?config.root(), ?command, "dirbuild starting");

    match command {
        Command::Clean => {
            let summary = publish::clean(fs.as_ref(), &config)?;
            println!(
                "dirbuild: removed {} director(ies) and {} link(s)",
                summary.removed_dirs.len(),
                summary.removed_links.len()
            );
            Ok(0)
        }
        Command::Inspect { dot } => {
            let (flags, probe_diagnostics) = collect_flags(&probe, &config.probe.packages).await;
            let analysis = analyze(fs.as_ref(), &config, &flags)?;
            for diagnostic in probe_diagnostics.iter().chain(&analysis.diagnostics) {
                diagnostic.log();
            }
            if dot {
                print!("{}", inspect::render_dot(&analysis.graph));
            } else {
                print!("{}", inspect::render_text(&analysis.graph, &analysis.plan));
            }
            Ok(0)
        }
        Command::Build | Command::Rebuild => {
            if command == Command::Rebuild && !args.dry_run {
                publish::clean(fs.as_ref(), &config)?;
            }
            let options = BuildOptions {
                dry_run: args.dry_run,
                handle_ctrl_c: true,
            };
            let toolchain = Arc::new(CommandToolchain::new());
            let report = build_project(&config, fs, toolchain, &probe, options).await?;
            report.print_summary();
            Ok(report.exit_code())
        }
    }
}
