//! Declared pre/post deployment actions and their five executable variants.
//!
//! A `DeclaredAction` is what the user writes in `.rollout/config.yaml`. The
//! factory turns it into an `ActionHandle` (a closed enum over the variants)
//! whose typed parameters were extracted from the open `parameters` map.

pub mod command;
pub mod data_import;
pub mod factory;
pub mod manual;
pub mod publish;
pub mod result;
pub mod script;
pub mod variant;

pub use factory::{build_action_instance, ActionHandle, FactoryError};
pub use result::{ActionResult, StatusCode};
pub use variant::{ActionEnv, Variant};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::orchestrator::RunMode;

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// The five known variant kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Command,
    Script,
    DataImport,
    PublishContent,
    Manual,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Command => "command",
            ActionType::Script => "script",
            ActionType::DataImport => "data-import",
            ActionType::PublishContent => "publish-content",
            ActionType::Manual => "manual",
        }
    }

    /// Parse a declared `type` string. Legacy names (`apex`, `data`,
    /// `publish-community`) are accepted as aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "command" => Some(ActionType::Command),
            "script" | "apex" => Some(ActionType::Script),
            "data-import" | "data" => Some(ActionType::DataImport),
            "publish-content" | "publish-community" => Some(ActionType::PublishContent),
            "manual" => Some(ActionType::Manual),
            _ => None,
        }
    }

    pub fn all() -> &'static [ActionType] {
        &[
            ActionType::Command,
            ActionType::Script,
            ActionType::DataImport,
            ActionType::PublishContent,
            ActionType::Manual,
        ]
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// Restricts which orchestration mode an action is eligible in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionContext {
    #[default]
    All,
    CheckOnly,
    ProcessOnly,
}

impl ActionContext {
    pub fn matches(&self, mode: RunMode) -> bool {
        match self {
            ActionContext::All => true,
            ActionContext::CheckOnly => mode == RunMode::Check,
            ActionContext::ProcessOnly => mode == RunMode::Process,
        }
    }
}

// ---------------------------------------------------------------------------
// PullRequestRef
// ---------------------------------------------------------------------------

/// Collaboration-surface context attached to an action. Carried through to
/// the report untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PullRequestRef {
    /// Short human form: `#42`, the title, or the url, whichever is known first.
    pub fn display(&self) -> Option<String> {
        if let Some(id) = self.id.as_deref().filter(|s| !s.is_empty()) {
            return Some(format!("#{}", id.trim_start_matches('#')));
        }
        self.title
            .clone()
            .or_else(|| self.url.clone())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// DeclaredAction
// ---------------------------------------------------------------------------

fn default_action_type() -> String {
    ActionType::Command.as_str().to_string()
}

/// One configured pre/post deployment step.
///
/// `action_type` is kept as the raw string so that an unknown type still
/// loads and is reported by the factory instead of failing the whole config.
/// `result` is attached by the orchestrator and never read back from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredAction {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default = "default_action_type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub context: ActionContext,
    #[serde(default)]
    pub skip_if_error: bool,
    #[serde(default)]
    pub allow_failure: bool,
    #[serde(default)]
    pub run_only_once_by_org: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestRef>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
}

impl DeclaredAction {
    /// A `command` action with every flag off.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            action_type: default_action_type(),
            parameters: BTreeMap::new(),
            command: None,
            context: ActionContext::All,
            skip_if_error: false,
            allow_failure: false,
            run_only_once_by_org: false,
            pull_request: None,
            result: None,
        }
    }

    pub fn kind(&self) -> Option<ActionType> {
        ActionType::parse(&self.action_type)
    }

    pub fn with_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = action_type.into();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}
