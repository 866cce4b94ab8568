//! Runs one phase of declared actions: eligibility, ordering, failure
//! policy, run-once bookkeeping and aggregation.
//!
//! Actions execute strictly in declaration order, one at a time. A failing
//! action never stops the loop; every eligible action ends with a result or
//! an explicit skip, and only the aggregate (`PhaseReport::overall_failed`)
//! decides whether the surrounding deployment fails.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actions::{build_action_instance, ActionEnv, ActionResult, DeclaredAction, StatusCode, Variant};
use crate::cache::KvCache;
use crate::report::{ActionOutcome, PhaseReport};
use crate::run_once::RunOnceStore;
use crate::toolchain::Toolchain;

pub const EARLIER_FAILURE_REASON: &str = "earlier action failed";
pub const ALREADY_RUN_REASON: &str = "already run for this target";

// ---------------------------------------------------------------------------
// Phase / RunMode / RunContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pre,
    Post,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Post => "post",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Phase::Pre => "Pre-deployment",
            Phase::Post => "Post-deployment",
        }
    }
}

/// Whether the surrounding deployment is a check (dry run) or the real thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Check,
    Process,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Check => "check",
            RunMode::Process => "process",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    pub phase: Phase,
    pub mode: RunMode,
    /// Target environment identity; `None` when it could not be resolved.
    pub target: Option<String>,
    pub root: PathBuf,
}

impl RunContext {
    pub fn new(phase: Phase, mode: RunMode, root: impl Into<PathBuf>) -> Self {
        Self {
            phase,
            mode,
            target: None,
            root: root.into(),
        }
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target.filter(|t| !t.trim().is_empty());
        self
    }

    fn env<'a>(&'a self, tools: &'a Toolchain) -> ActionEnv<'a> {
        ActionEnv {
            tools,
            root: Path::new(&self.root),
            target: self.target.as_deref(),
        }
    }
}

/// Actions whose `context` admits `mode`, in declaration order.
pub fn eligible(actions: &[DeclaredAction], mode: RunMode) -> impl Iterator<Item = &DeclaredAction> {
    actions.iter().filter(move |a| a.context.matches(mode))
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'c> {
    tools: Toolchain,
    run_once: RunOnceStore<'c>,
}

impl<'c> Orchestrator<'c> {
    pub fn new(tools: Toolchain, cache: &'c mut dyn KvCache) -> Self {
        Self {
            tools,
            run_once: RunOnceStore::new(cache),
        }
    }

    /// Execute every eligible action of one phase and aggregate the results.
    ///
    /// Each eligible action gets its result attached in place.
    pub fn run_phase(&mut self, actions: &mut [DeclaredAction], ctx: &RunContext) -> PhaseReport {
        let mut outcomes = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut earlier_failed = false;

        for action in actions.iter_mut() {
            if !action.context.matches(ctx.mode) {
                debug!(id = %action.id, context = ?action.context, mode = ctx.mode.as_str(), "not eligible");
                continue;
            }

            let started = Instant::now();
            let result = self.attempt(action, ctx, earlier_failed, &mut seen_ids);
            let duration_ms = started.elapsed().as_millis() as u64;

            info!(
                id = %action.id,
                status = result.status_code.as_str(),
                duration_ms,
                "{} finished",
                action.label
            );
            if result.is_failed() {
                earlier_failed = true;
            }
            outcomes.push(ActionOutcome::new(action, result.clone(), duration_ms));
            action.result = Some(result);
        }

        let report = PhaseReport::new(ctx.phase, ctx.mode, ctx.target.clone(), outcomes);
        info!(phase = ctx.phase.as_str(), "{}", report.summary_line());
        report
    }

    fn attempt(
        &mut self,
        action: &DeclaredAction,
        ctx: &RunContext,
        earlier_failed: bool,
        seen_ids: &mut HashSet<String>,
    ) -> ActionResult {
        if let Some(issue) = id_issue(action, seen_ids) {
            warn!(label = %action.label, "{issue}");
            return ActionResult::failed(issue, None);
        }

        if action.skip_if_error && earlier_failed {
            return ActionResult::skipped(EARLIER_FAILURE_REASON);
        }

        let once_target = self.run_once_target(action, ctx);
        if let Some(target) = once_target {
            match self.run_once.has_run(&action.id, target) {
                Ok(true) => return ActionResult::skipped(ALREADY_RUN_REASON),
                Ok(false) => {}
                Err(e) => warn!(id = %action.id, error = %e, "could not read run-once state, treating as not run"),
            }
        }

        let handle = match build_action_instance(action) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(id = %action.id, error = %e, "action cannot be built");
                return e.to_result();
            }
        };

        // A pre-check result counts as run only when it is terminal (manual).
        let env = ctx.env(&self.tools);
        let (result, attempted) = match handle.check_validity_issues(&env) {
            Some(issue) => {
                debug!(id = %action.id, status = issue.status_code.as_str(), "stopped by validity check");
                let terminal = issue.status_code == StatusCode::Manual;
                (issue, terminal)
            }
            None => {
                info!(id = %action.id, variant = handle.label(), "{} started", action.label);
                (handle.execute(&env), true)
            }
        };

        if let (Some(target), true) = (once_target, attempted) {
            if let Err(e) = self.run_once.mark_run(&action.id, target) {
                warn!(id = %action.id, error = %e, "could not record run-once state");
            }
        }
        result
    }

    /// The identity to dedup against, or `None` when the action is not
    /// run-once or no identity is known (then it is always eligible).
    fn run_once_target<'a>(&self, action: &DeclaredAction, ctx: &'a RunContext) -> Option<&'a str> {
        if !action.run_only_once_by_org {
            return None;
        }
        match ctx.target.as_deref() {
            Some(target) => Some(target),
            None => {
                warn!(
                    id = %action.id,
                    "runOnlyOnceByOrg set but no target environment identity is known; running it anyway"
                );
                None
            }
        }
    }

    /// Dry validation pass: build each eligible action and run only its
    /// validity check. Nothing executes and the run-once store is untouched.
    ///
    /// An action that would run is reported as `success`.
    pub fn validate(&self, actions: &[DeclaredAction], ctx: &RunContext) -> PhaseReport {
        let mut seen_ids = HashSet::new();
        let env = ctx.env(&self.tools);
        let outcomes = eligible(actions, ctx.mode)
            .map(|action| {
                let result = if let Some(issue) = id_issue(action, &mut seen_ids) {
                    ActionResult::failed(issue, None)
                } else {
                    match build_action_instance(action) {
                        Ok(handle) => handle
                            .check_validity_issues(&env)
                            .unwrap_or_else(|| ActionResult::success(None)),
                        Err(e) => e.to_result(),
                    }
                };
                ActionOutcome::new(action, result, 0)
            })
            .collect();
        PhaseReport::new(ctx.phase, ctx.mode, ctx.target.clone(), outcomes)
    }
}

/// Run one phase with a fresh orchestrator over `cache`.
///
/// The caller owns the cache lifecycle and flushes it afterwards.
pub fn run_phase(
    tools: Toolchain,
    cache: &mut dyn KvCache,
    actions: &mut [DeclaredAction],
    ctx: &RunContext,
) -> PhaseReport {
    Orchestrator::new(tools, cache).run_phase(actions, ctx)
}

/// Empty ids and repeated ids are rejected before anything is built.
fn id_issue(action: &DeclaredAction, seen: &mut HashSet<String>) -> Option<String> {
    let id = action.id.trim();
    if id.is_empty() {
        return Some("invalid action id: id must not be empty".to_string());
    }
    if !seen.insert(id.to_string()) {
        return Some(format!("invalid action id '{id}': duplicate within this list"));
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
