use super::result::ActionResult;
use super::variant::{ActionEnv, Variant};

/// Publishes named content (e.g. a site) on the target.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishContentAction {
    /// From `parameters.contentName`.
    pub content_name: Option<String>,
}

impl Variant for PublishContentAction {
    fn label(&self) -> &'static str {
        "PublishContentAction"
    }

    fn check_validity_issues(&self, _env: &ActionEnv<'_>) -> Option<ActionResult> {
        match self.content_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => None,
            _ => Some(ActionResult::failed(
                "missing required parameter 'contentName'",
                None,
            )),
        }
    }

    fn execute(&self, env: &ActionEnv<'_>) -> ActionResult {
        let name = self.content_name.as_deref().unwrap_or_default().trim();
        let out = env.tools.publisher.publish(name, env.target);
        if out.success() {
            ActionResult::success(Some(out.combined()))
        } else {
            ActionResult::failed(
                format!("publish exited with code {}", out.exit_code),
                Some(out.combined()),
            )
        }
    }
}
