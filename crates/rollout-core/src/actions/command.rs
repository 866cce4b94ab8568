use tracing::debug;

use super::result::ActionResult;
use super::variant::{ActionEnv, Variant};

/// Runs the raw `command` string through the process executor.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandAction {
    pub command: String,
}

impl Variant for CommandAction {
    fn label(&self) -> &'static str {
        "CommandAction"
    }

    fn check_validity_issues(&self, _env: &ActionEnv<'_>) -> Option<ActionResult> {
        if self.command.trim().is_empty() {
            return Some(ActionResult::failed(
                "missing required field 'command'",
                None,
            ));
        }
        None
    }

    fn execute(&self, env: &ActionEnv<'_>) -> ActionResult {
        debug!(command = %self.command, "running command action");
        let out = env.tools.executor.exec(&self.command);
        if out.success() {
            ActionResult::success(Some(out.combined()))
        } else {
            ActionResult::failed(
                format!("command exited with code {}", out.exit_code),
                Some(out.combined()),
            )
        }
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

    fn env_with(spy: &Arc<SpyToolchain>) -> Toolchain {
        Toolchain::uniform(spy.clone())
    }

    #[test]
    fn empty_command_fails_before_execution() {
        let spy = Arc::new(SpyToolchain::default());
        let tools = env_with(&spy);
        let env = ActionEnv { tools: &tools, root: Path::new("."), target: None };
        let result = CommandAction { command: "  ".into() }.run(&env);
        assert_eq!(result.status_code, StatusCode::Failed);
        assert!(spy.calls().is_empty());
    }

    #[test]
    fn non_zero_exit_is_failed_with_output() {
        let mut spy = SpyToolchain::default();
        spy.exit_codes.insert("exit 1".into(), 1);
        let spy = Arc::new(spy);
        let tools = env_with(&spy);
        let env = ActionEnv { tools: &tools, root: Path::new("."), target: None };
        let result = CommandAction { command: "exit 1".into() }.run(&env);
        assert_eq!(result.status_code, StatusCode::Failed);
        assert_eq!(result.output.as_deref(), Some("ran exit 1"));
        assert_eq!(spy.calls(), vec!["exec:exit 1".to_string()]);
    }

    #[test]
    fn zero_exit_is_success() {
        let spy = Arc::new(SpyToolchain::default());
        let tools = env_with(&spy);
        let env = ActionEnv { tools: &tools, root: Path::new("."), target: None };
        let result = CommandAction { command: "echo ok".into() }.run(&env);
        assert_eq!(result.status_code, StatusCode::Success);
    }
}
