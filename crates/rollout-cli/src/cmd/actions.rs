use crate::output::{one_line, print_json, print_table};
use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use rollout_core::{
    actions::DeclaredAction,
    cache::{open_cache, MemoryCache},
    config::Config,
    orchestrator::{eligible, run_phase, Orchestrator, Phase, RunContext, RunMode},
    report::{MarkdownFileReporter, PhaseReport, Reporter},
    toolchain::{PlatformToolchain, Toolchain},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, ValueEnum)]
pub enum PhaseArg {
    Pre,
    Post,
}

impl From<PhaseArg> for Phase {
    fn from(p: PhaseArg) -> Self {
        match p {
            PhaseArg::Pre => Phase::Pre,
            PhaseArg::Post => Phase::Post,
        }
    }
}

#[derive(Args)]
pub struct Selection {
    /// Which action list to use
    #[arg(long, value_enum)]
    phase: PhaseArg,

    /// Check (dry-run) deployment mode instead of process mode
    #[arg(long)]
    check: bool,
}

impl Selection {
    fn mode(&self) -> RunMode {
        if self.check {
            RunMode::Check
        } else {
            RunMode::Process
        }
    }

    fn context(&self, root: &Path) -> RunContext {
        RunContext::new(self.phase.into(), self.mode(), root)
    }
}

#[derive(Subcommand)]
pub enum ActionsSubcommand {
    /// List the actions eligible for a phase and mode
    List {
        #[command(flatten)]
        selection: Selection,
    },

    /// Build every eligible action and report what would run, without running anything
    Validate {
        #[command(flatten)]
        selection: Selection,
    },

    /// Run every eligible action in declaration order
    Run {
        #[command(flatten)]
        selection: Selection,

        /// Target environment identity used for run-once bookkeeping and templates
        #[arg(long, env = "ROLLOUT_TARGET_ORG")]
        target_org: Option<String>,

        /// Use an in-memory run-once store for this invocation
        #[arg(long)]
        no_cache: bool,

        /// Also write the markdown summary to this file
        #[arg(long, value_name = "PATH")]
        report_file: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ActionsSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match subcmd {
        ActionsSubcommand::List { selection } => list(&config, &selection, json),
        ActionsSubcommand::Validate { selection } => validate(root, &config, &selection, json),
        ActionsSubcommand::Run {
            selection,
            target_org,
            no_cache,
            report_file,
        } => run_actions(
            root,
            &config,
            &selection,
            target_org,
            no_cache,
            report_file.as_deref(),
            json,
        ),
    }
}

fn toolchain(root: &Path, config: &Config) -> Toolchain {
    Toolchain::uniform(Arc::new(PlatformToolchain::new(root, &config.platform)))
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(config: &Config, selection: &Selection, json: bool) -> anyhow::Result<()> {
    let phase: Phase = selection.phase.into();
    let actions: Vec<&DeclaredAction> =
        eligible(config.actions_for(phase), selection.mode()).collect();

    if json {
        return print_json(&actions);
    }
    if actions.is_empty() {
        println!(
            "No {} actions for {} mode.",
            phase.as_str(),
            selection.mode().as_str()
        );
        return Ok(());
    }

    let rows = actions
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                a.label.clone(),
                a.action_type.clone(),
                flags(a),
            ]
        })
        .collect();
    print_table(&["ID", "LABEL", "TYPE", "FLAGS"], rows);
    Ok(())
}

fn flags(action: &DeclaredAction) -> String {
    let mut flags = Vec::new();
    if action.skip_if_error {
        flags.push("skip-if-error");
    }
    if action.allow_failure {
        flags.push("allow-failure");
    }
    if action.run_only_once_by_org {
        flags.push("run-once");
    }
    flags.join(",")
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, config: &Config, selection: &Selection, json: bool) -> anyhow::Result<()> {
    let mut scratch = MemoryCache::default();
    let orchestrator = Orchestrator::new(toolchain(root, config), &mut scratch);
    let report = orchestrator.validate(
        config.actions_for(selection.phase.into()),
        &selection.context(root),
    );

    print_report(&report, json)?;

    let failed = report.failed_count();
    if failed > 0 {
        anyhow::bail!("{failed} action(s) would fail");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn run_actions(
    root: &Path,
    config: &Config,
    selection: &Selection,
    target_org: Option<String>,
    no_cache: bool,
    report_file: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let phase: Phase = selection.phase.into();
    let ctx = selection.context(root).with_target(target_org);
    let mut actions = config.actions_for(phase).to_vec();

    let mut cache = open_cache(no_cache).context("failed to open run-once cache")?;
    let report = run_phase(toolchain(root, config), &mut *cache, &mut actions, &ctx);
    if let Err(e) = cache.flush() {
        tracing::warn!(error = %e, "failed to flush run-once cache");
    }

    if let Some(path) = report_file {
        MarkdownFileReporter::new(path)
            .publish(&report)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    print_report(&report, json)?;

    if report.overall_failed {
        let blocking = report
            .results
            .iter()
            .filter(|o| o.is_blocking_failure())
            .count();
        anyhow::bail!(
            "{} actions failed: {blocking} blocking failure(s)",
            phase.as_str()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_report(report: &PhaseReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    if report.results.is_empty() {
        println!(
            "No {} actions for {} mode.",
            report.phase.as_str(),
            report.mode.as_str()
        );
        return Ok(());
    }

    let rows = report
        .results
        .iter()
        .map(|o| {
            let mut details = o
                .result
                .skipped_reason
                .as_deref()
                .or_else(|| o.result.output.as_deref().filter(|_| o.result.is_failed()))
                .map(|r| one_line(r, 60))
                .unwrap_or_default();
            if o.allow_failure && o.result.is_failed() {
                details.push_str(" (failure allowed)");
            }
            vec![
                o.status().as_str().to_string(),
                o.id.clone(),
                o.label.clone(),
                o.action_type.clone(),
                details.trim().to_string(),
            ]
        })
        .collect();
    print_table(&["STATUS", "ID", "LABEL", "TYPE", "DETAILS"], rows);
    println!();
    println!("{}", report.summary_line());
    Ok(())
}
