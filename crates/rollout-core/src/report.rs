//! Aggregated phase results and the markdown summary handed to the
//! collaboration reporter (e.g. a merge-request comment).

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::{ActionResult, DeclaredAction, PullRequestRef, StatusCode};
use crate::error::Result;
use crate::orchestrator::{Phase, RunMode};

// ---------------------------------------------------------------------------
// ActionOutcome
// ---------------------------------------------------------------------------

/// One line item of a phase report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub allow_failure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestRef>,
    pub result: ActionResult,
    pub duration_ms: u64,
}

impl ActionOutcome {
    pub fn new(action: &DeclaredAction, result: ActionResult, duration_ms: u64) -> Self {
        Self {
            id: action.id.clone(),
            label: action.label.clone(),
            action_type: action.action_type.clone(),
            allow_failure: action.allow_failure,
            pull_request: action.pull_request.clone(),
            result,
            duration_ms,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.result.status_code
    }

    /// A failure that escalates to the whole run.
    pub fn is_blocking_failure(&self) -> bool {
        self.result.is_failed() && !self.allow_failure
    }
}

// ---------------------------------------------------------------------------
// PhaseReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub phase: Phase,
    pub mode: RunMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ActionOutcome>,
    pub overall_failed: bool,
}

impl PhaseReport {
    /// `overall_failed` is derived here and nowhere else: true iff some
    /// outcome failed without `allowFailure`.
    pub fn new(
        phase: Phase,
        mode: RunMode,
        target: Option<String>,
        results: Vec<ActionOutcome>,
    ) -> Self {
        let overall_failed = results.iter().any(ActionOutcome::is_blocking_failure);
        Self {
            phase,
            mode,
            target,
            generated_at: Utc::now(),
            results,
            overall_failed,
        }
    }

    /// Count of outcomes per status, statuses with zero omitted.
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.results {
            *counts.entry(outcome.status().as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|o| o.result.is_failed())
            .count()
    }

    pub fn summary_line(&self) -> String {
        let verdict = if self.overall_failed { "failed" } else { "passed" };
        let counts: Vec<String> = self
            .summary()
            .iter()
            .map(|(status, n)| format!("{n} {status}"))
            .collect();
        if counts.is_empty() {
            format!("{verdict} (no actions)")
        } else {
            format!("{verdict} ({})", counts.join(", "))
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let target = self
            .target
            .as_deref()
            .map(|t| format!(" on `{t}`"))
            .unwrap_or_default();
        md.push_str(&format!(
            "## {} actions ({}){}\n\n",
            self.phase.title(),
            self.mode.as_str(),
            target
        ));

        if self.results.is_empty() {
            md.push_str("No actions were eligible for this phase.\n\n");
        } else {
            md.push_str("| Status | Action | Type | Details |\n");
            md.push_str("|--------|--------|------|---------|\n");
            for o in &self.results {
                let mut details = o.result.skipped_reason.clone().unwrap_or_default();
                if o.result.is_failed() && o.allow_failure {
                    details = join_detail(details, "failure allowed");
                }
                if let Some(pr) = o.pull_request.as_ref().and_then(PullRequestRef::display) {
                    details = join_detail(details, &format!("PR {pr}"));
                }
                if details.is_empty() {
                    details.push('-');
                }
                md.push_str(&format!(
                    "| {} | {} (`{}`) | {} | {} |\n",
                    o.status(),
                    escape_cell(&o.label),
                    escape_cell(&o.id),
                    escape_cell(&o.action_type),
                    escape_cell(&details)
                ));
            }
            md.push('\n');

            for o in &self.results {
                let Some(output) = o.result.output.as_deref().filter(|s| !s.trim().is_empty())
                else {
                    continue;
                };
                let fence = code_fence(output);
                md.push_str(&format!(
                    "<details><summary>{} output</summary>\n\n{fence}\n{}\n{fence}\n\n</details>\n\n",
                    escape_cell(&o.label),
                    output.trim_end()
                ));
            }
        }

        md.push_str(&format!("**Result:** {}\n", self.summary_line()));
        md
    }
}

/// A backtick fence longer than any backtick run inside `text`.
fn code_fence(text: &str) -> String {
    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

fn join_detail(existing: String, extra: &str) -> String {
    if existing.is_empty() {
        extra.to_string()
    } else {
        format!("{existing}; {extra}")
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Seam for the collaboration poster. It receives the finished report,
/// including any attached pull-request references.
pub trait Reporter {
    fn publish(&self, report: &PhaseReport) -> Result<()>;
}

/// Writes the markdown summary to a file for a CI step to post.
pub struct MarkdownFileReporter {
    path: PathBuf,
}

impl MarkdownFileReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for MarkdownFileReporter {
    fn publish(&self, report: &PhaseReport) -> Result<()> {
        crate::io::atomic_write(&self.path, report.to_markdown().as_bytes())
    }
}
