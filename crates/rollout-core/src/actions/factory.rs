//! Maps a declared action's `type` to its variant, extracting typed
//! parameters from the open `parameters` map on the way.

use std::path::PathBuf;

use thiserror::Error;

use super::command::CommandAction;
use super::data_import::DataImportAction;
use super::manual::ManualAction;
use super::publish::PublishContentAction;
use super::result::ActionResult;
use super::script::ScriptAction;
use super::variant::{ActionEnv, Variant};
use super::{ActionType, DeclaredAction};

pub const NOT_IMPLEMENTED_REASON: &str = "Action type not implemented";

/// Reasons a declared action cannot be turned into a variant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactoryError {
    #[error("unknown action type '{0}'")]
    UnknownType(String),

    #[error("parameter '{key}' must be a {expected}")]
    InvalidParameter { key: String, expected: &'static str },
}

impl FactoryError {
    /// The sentinel result attached in place of running the action.
    pub fn to_result(&self) -> ActionResult {
        match self {
            FactoryError::UnknownType(_) => {
                ActionResult::failed(NOT_IMPLEMENTED_REASON, Some(self.to_string()))
            }
            FactoryError::InvalidParameter { .. } => ActionResult::failed(self.to_string(), None),
        }
    }
}

/// Closed set of executable variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionHandle {
    Command(CommandAction),
    Script(ScriptAction),
    DataImport(DataImportAction),
    PublishContent(PublishContentAction),
    Manual(ManualAction),
}

impl ActionHandle {
    fn inner(&self) -> &dyn Variant {
        match self {
            ActionHandle::Command(v) => v,
            ActionHandle::Script(v) => v,
            ActionHandle::DataImport(v) => v,
            ActionHandle::PublishContent(v) => v,
            ActionHandle::Manual(v) => v,
        }
    }
}

impl Variant for ActionHandle {
    fn label(&self) -> &'static str {
        self.inner().label()
    }

    fn check_validity_issues(&self, env: &ActionEnv<'_>) -> Option<ActionResult> {
        self.inner().check_validity_issues(env)
    }

    fn execute(&self, env: &ActionEnv<'_>) -> ActionResult {
        self.inner().execute(env)
    }
}

/// Build the variant for `action`.
///
/// Missing parameters are not an error here; the variant's validity check
/// reports them. Present parameters of the wrong shape are rejected.
pub fn build_action_instance(action: &DeclaredAction) -> Result<ActionHandle, FactoryError> {
    let kind = action
        .kind()
        .ok_or_else(|| FactoryError::UnknownType(action.action_type.clone()))?;

    let handle = match kind {
        ActionType::Command => ActionHandle::Command(CommandAction {
            command: action.command.clone().unwrap_or_default(),
        }),
        ActionType::Script => ActionHandle::Script(ScriptAction {
            script_path: string_param(action, "scriptPath")?.map(PathBuf::from),
        }),
        ActionType::DataImport => ActionHandle::DataImport(DataImportAction {
            data_workspace: string_param(action, "dataWorkspace")?,
        }),
        ActionType::PublishContent => ActionHandle::PublishContent(PublishContentAction {
            content_name: string_param(action, "contentName")?,
        }),
        ActionType::Manual => ActionHandle::Manual(ManualAction {
            instructions: string_param(action, "instructions")?,
        }),
    };
    Ok(handle)
}

/// Read a string parameter. Absent and `null` are `None`; any other
/// non-string value is rejected rather than coerced.
fn string_param(action: &DeclaredAction, key: &str) -> Result<Option<String>, FactoryError> {
    match action.parameters.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FactoryError::InvalidParameter {
            key: key.to_string(),
            expected: "string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::StatusCode;
    use serde_json::json;

    #[test]
    fn builds_each_known_type() {
        let cases = [
            ("command", "CommandAction"),
            ("script", "ScriptAction"),
            ("data-import", "DataImportAction"),
            ("publish-content", "PublishContentAction"),
            ("manual", "ManualAction"),
        ];
        for (ty, label) in cases {
            let action = DeclaredAction::new("a", "A").with_type(ty);
            let handle = build_action_instance(&action).unwrap();
            assert_eq!(handle.label(), label, "type {ty}");
        }
    }

    #[test]
    fn unknown_type_yields_not_implemented_sentinel() {
        let action = DeclaredAction::new("a", "A").with_type("teleport");
        let err = build_action_instance(&action).unwrap_err();
        assert_eq!(err, FactoryError::UnknownType("teleport".into()));
        let result = err.to_result();
        assert_eq!(result.status_code, StatusCode::Failed);
        assert_eq!(result.skipped_reason.as_deref(), Some(NOT_IMPLEMENTED_REASON));
    }

    #[test]
    fn typed_parameters_are_extracted() {
        let action = DeclaredAction::new("s", "S")
            .with_type("script")
            .with_parameter("scriptPath", json!("scripts/a.apex"))
            .with_parameter("ignoredKey", json!({"nested": true}));
        let handle = build_action_instance(&action).unwrap();
        assert_eq!(
            handle,
            ActionHandle::Script(ScriptAction {
                script_path: Some(PathBuf::from("scripts/a.apex"))
            })
        );
    }

    #[test]
    fn wrong_parameter_shape_is_rejected() {
        let action = DeclaredAction::new("m", "M")
            .with_type("manual")
            .with_parameter("instructions", json!(42));
        let err = build_action_instance(&action).unwrap_err();
        assert!(matches!(err, FactoryError::InvalidParameter { .. }));
        assert!(err.to_result().skipped_reason.unwrap().contains("instructions"));
    }

    #[test]
    fn null_parameter_counts_as_missing() {
        let action = DeclaredAction::new("m", "M")
            .with_type("manual")
            .with_parameter("instructions", serde_json::Value::Null);
        let handle = build_action_instance(&action).unwrap();
        assert_eq!(
            handle,
            ActionHandle::Manual(ManualAction { instructions: None })
        );
    }
}
