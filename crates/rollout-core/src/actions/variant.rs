use std::path::Path;

use super::result::ActionResult;
use crate::toolchain::Toolchain;

/// Everything a variant may touch while validating or running.
pub struct ActionEnv<'a> {
    pub tools: &'a Toolchain,
    /// Project root; relative script paths resolve against it.
    pub root: &'a Path,
    /// Target environment identity, when one could be resolved.
    pub target: Option<&'a str>,
}

/// Capability set shared by the five action kinds.
pub trait Variant {
    /// Stable diagnostic name, e.g. `CommandAction`.
    fn label(&self) -> &'static str;

    /// Side-effect-free precondition check. `None` means the action may run.
    ///
    /// Implementations only read (parameters, the filesystem, lookups) and
    /// must return the same answer every time they are called.
    fn check_validity_issues(&self, env: &ActionEnv<'_>) -> Option<ActionResult>;

    /// Perform the effect. Only called after `check_validity_issues` passed.
    fn execute(&self, env: &ActionEnv<'_>) -> ActionResult;

    fn run(&self, env: &ActionEnv<'_>) -> ActionResult {
        if let Some(issue) = self.check_validity_issues(env) {
            return issue;
        }
        self.execute(env)
    }
}
