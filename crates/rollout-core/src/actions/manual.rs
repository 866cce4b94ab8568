use super::result::ActionResult;
use super::variant::{ActionEnv, Variant};

/// Hands instructions to a human. Never runs anything and never claims success.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualAction {
    /// From `parameters.instructions`.
    pub instructions: Option<String>,
}

impl Variant for ManualAction {
    fn label(&self) -> &'static str {
        "ManualAction"
    }

    fn check_validity_issues(&self, _env: &ActionEnv<'_>) -> Option<ActionResult> {
        match self.instructions.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                Some(ActionResult::manual(text.to_string()))
            }
            _ => Some(ActionResult::skipped(
                "manual action has no instructions",
            )),
        }
    }

    fn execute(&self, env: &ActionEnv<'_>) -> ActionResult {
        // Unreachable through `run`: the validity check always short-circuits.
        self.check_validity_issues(env)
            .unwrap_or_else(|| ActionResult::skipped("manual action has no instructions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::StatusCode;
    use crate::toolchain::testing::SpyToolchain;
    use crate::toolchain::Toolchain;
    use std::path::Path;
    use std::sync::Arc;

    fn env_run(action: &ManualAction) -> (ActionResult, Vec<String>) {
        let spy = Arc::new(SpyToolchain::default());
        let tools = Toolchain::uniform(spy.clone());
        let env = ActionEnv {
            tools: &tools,
            root: Path::new("."),
            target: None,
        };
        (action.run(&env), spy.calls())
    }

    #[test]
    fn instructions_become_manual_output() {
        let action = ManualAction {
            instructions: Some("do X".into()),
        };
        let (result, calls) = env_run(&action);
        assert_eq!(result.status_code, StatusCode::Manual);
        assert_eq!(result.output.as_deref(), Some("do X"));
        assert!(calls.is_empty());
    }

    #[test]
    fn missing_instructions_are_skipped() {
        let action = ManualAction { instructions: None };
        let (result, _) = env_run(&action);
        assert_eq!(result.status_code, StatusCode::Skipped);
        assert!(result.skipped_reason.is_some());
    }
}
