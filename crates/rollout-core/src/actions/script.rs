use std::path::PathBuf;

use super::result::ActionResult;
use super::variant::{ActionEnv, Variant};

/// Runs a script file against the target through the platform script runner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptAction {
    /// From `parameters.scriptPath`; relative paths resolve against the project root.
    pub script_path: Option<PathBuf>,
}

impl ScriptAction {
    fn resolved_path(&self, env: &ActionEnv<'_>) -> Option<PathBuf> {
        self.script_path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                env.root.join(p)
            }
        })
    }
}

impl Variant for ScriptAction {
    fn label(&self) -> &'static str {
        "ScriptAction"
    }

    fn check_validity_issues(&self, env: &ActionEnv<'_>) -> Option<ActionResult> {
        let Some(path) = self.resolved_path(env) else {
            return Some(ActionResult::failed(
                "missing required parameter 'scriptPath'",
                None,
            ));
        };
        if !path.is_file() {
            return Some(ActionResult::failed(
                format!("script file not found: {}", path.display()),
                None,
            ));
        }
        None
    }

    fn execute(&self, env: &ActionEnv<'_>) -> ActionResult {
        let Some(path) = self.resolved_path(env) else {
            return ActionResult::failed("missing required parameter 'scriptPath'", None);
        };
        let out = env.tools.scripts.run_script(&path, env.target);
        if out.success() {
            ActionResult::success(Some(out.combined()))
        } else {
            ActionResult::failed(
                format!("script exited with code {}", out.exit_code),
                Some(out.combined()),
            )
        }
    }
}
