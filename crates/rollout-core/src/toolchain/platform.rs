//! Default collaborators backed by the platform CLI.
//!
//! Script, data-import and publish operations are shell command templates
//! from `platform:` in `.rollout/config.yaml`, e.g.
//! `sf apex run --file {path} --target-org {target}`. Placeholder values are
//! shell-quoted before substitution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::{
    ContentPublisher, DataImporter, ProcessExecutor, ProcessOutput, ScriptRunner, ShellExecutor,
    WorkspaceResolver,
};
use crate::config::PlatformConfig;
use crate::error::{Result, RolloutError};
use crate::paths;

/// Placeholders `scriptCommand` is rendered with.
pub const SCRIPT_PLACEHOLDERS: &[&str] = &["path", "target"];
/// Placeholders `dataImportCommand` is rendered with.
pub const DATA_IMPORT_PLACEHOLDERS: &[&str] = &["workspace", "target"];
/// Placeholders `publishCommand` is rendered with.
pub const PUBLISH_PLACEHOLDERS: &[&str] = &["name", "target"];

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

/// Names of every `{placeholder}` in `template`, in order of appearance.
pub fn template_placeholders(template: &str) -> Vec<String> {
    placeholder_re()
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Substitute `{key}` placeholders with shell-quoted values.
///
/// Every placeholder must have a value in `vars`.
pub fn render_template(template: &str, vars: &HashMap<&str, String>) -> Result<String> {
    if let Some(missing) = template_placeholders(template)
        .into_iter()
        .find(|name| !vars.contains_key(name.as_str()))
    {
        return Err(RolloutError::InvalidTemplate {
            template: template.to_string(),
            reason: format!("unknown placeholder {{{missing}}}"),
        });
    }
    let rendered = placeholder_re().replace_all(template, |caps: &regex::Captures<'_>| {
        vars.get(&caps[1]).map(|v| quote_arg(v)).unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

/// Quote a single argument for shell execution. Plain words pass through.
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let plain = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '=' | ','));
    if plain {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\\''"))
}

// ---------------------------------------------------------------------------
// PlatformToolchain
// ---------------------------------------------------------------------------

/// Implements every collaborator role on top of one `ShellExecutor`.
pub struct PlatformToolchain {
    root: PathBuf,
    config: PlatformConfig,
    executor: ShellExecutor,
}

impl PlatformToolchain {
    pub fn new(root: &Path, config: &PlatformConfig) -> Self {
        let executor = ShellExecutor::new(root)
            .with_shell(config.shell.as_deref())
            .with_timeout_secs(config.timeout_seconds);
        Self {
            root: root.to_path_buf(),
            config: config.clone(),
            executor,
        }
    }

    fn vars(target: Option<&str>) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        vars.insert("target", target.unwrap_or_default().to_string());
        vars
    }

    fn run_template(&self, template: &str, vars: &HashMap<&str, String>) -> ProcessOutput {
        match render_template(template, vars) {
            Ok(command) => self.executor.exec(&command),
            Err(e) => ProcessOutput::failure(e.to_string()),
        }
    }
}

impl ProcessExecutor for PlatformToolchain {
    fn exec(&self, command: &str) -> ProcessOutput {
        self.executor.exec(command)
    }
}

impl ScriptRunner for PlatformToolchain {
    fn run_script(&self, path: &Path, target: Option<&str>) -> ProcessOutput {
        let mut vars = Self::vars(target);
        vars.insert("path", path.to_string_lossy().into_owned());
        self.run_template(&self.config.script_command, &vars)
    }
}

impl WorkspaceResolver for PlatformToolchain {
    fn find_workspace_by_name(&self, name: &str) -> Option<PathBuf> {
        let dir = paths::data_workspace_dir(&self.root, &self.config.data_dir, name);
        dir.is_dir().then_some(dir)
    }
}

impl DataImporter for PlatformToolchain {
    fn import_data(&self, workspace: &Path, target: Option<&str>) -> Result<ProcessOutput> {
        let mut vars = Self::vars(target);
        vars.insert("workspace", workspace.to_string_lossy().into_owned());
        let command = render_template(&self.config.data_import_command, &vars)?;
        self.executor
            .try_exec(&command)
            .map_err(|e| RolloutError::Collaborator(format!("data import could not start: {e}")))
    }
}

impl ContentPublisher for PlatformToolchain {
    fn publish(&self, content_name: &str, target: Option<&str>) -> ProcessOutput {
        let mut vars = Self::vars(target);
        vars.insert("name", content_name.to_string());
        self.run_template(&self.config.publish_command, &vars)
    }
}
