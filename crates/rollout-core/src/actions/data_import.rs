use super::result::ActionResult;
use super::variant::{ActionEnv, Variant};

/// Imports a named data workspace into the target environment.
#[derive(Debug, Clone, PartialEq)]
pub struct DataImportAction {
    /// From `parameters.dataWorkspace`.
    pub data_workspace: Option<String>,
}

impl DataImportAction {
    fn workspace_name(&self) -> Option<&str> {
        self.data_workspace
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl Variant for DataImportAction {
    fn label(&self) -> &'static str {
        "DataImportAction"
    }

    fn check_validity_issues(&self, env: &ActionEnv<'_>) -> Option<ActionResult> {
        let Some(name) = self.workspace_name() else {
            return Some(ActionResult::failed(
                "missing required parameter 'dataWorkspace'",
                None,
            ));
        };
        if env.tools.workspaces.find_workspace_by_name(name).is_none() {
            return Some(ActionResult::failed(
                format!("data workspace '{name}' not found"),
                None,
            ));
        }
        None
    }

    fn execute(&self, env: &ActionEnv<'_>) -> ActionResult {
        let Some(workspace) = self
            .workspace_name()
            .and_then(|name| env.tools.workspaces.find_workspace_by_name(name))
        else {
            return ActionResult::failed("data workspace could not be resolved", None);
        };
        match env.tools.importer.import_data(&workspace, env.target) {
            Ok(out) if out.success() => ActionResult::success(Some(out.combined())),
            Ok(out) => ActionResult::failed(
                format!("data import exited with code {}", out.exit_code),
                Some(out.combined()),
            ),
            Err(e) => ActionResult::failed_with_output(e.to_string()),
        }
    }
}
