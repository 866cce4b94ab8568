use crate::actions::{ActionType, DeclaredAction};
use crate::error::{Result, RolloutError};
use crate::orchestrator::Phase;
use crate::paths;
use crate::toolchain::platform::{
    template_placeholders, DATA_IMPORT_PLACEHOLDERS, PUBLISH_PLACEHOLDERS, SCRIPT_PLACEHOLDERS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

impl ConfigWarning {
    fn warning(message: String) -> Self {
        Self {
            level: WarnLevel::Warning,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: WarnLevel::Error,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// PlatformConfig
// ---------------------------------------------------------------------------

/// Command templates the default collaborators render and run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default = "default_script_command")]
    pub script_command: String,
    #[serde(default = "default_data_import_command")]
    pub data_import_command: String,
    #[serde(default = "default_publish_command")]
    pub publish_command: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Per-process timeout; 0 disables it.
    #[serde(default)]
    pub timeout_seconds: u64,
}

fn default_script_command() -> String {
    "sf apex run --file {path} --target-org {target}".to_string()
}

fn default_data_import_command() -> String {
    "sf data tree import --plan {workspace}/plan.json --target-org {target}".to_string()
}

fn default_publish_command() -> String {
    "sf community publish --name {name} --target-org {target}".to_string()
}

fn default_data_dir() -> String {
    "scripts/data".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            shell: None,
            script_command: default_script_command(),
            data_import_command: default_data_import_command(),
            publish_command: default_publish_command(),
            data_dir: default_data_dir(),
            timeout_seconds: 0,
        }
    }
}

impl PlatformConfig {
    /// Each template with the placeholders it is rendered with.
    fn templates(&self) -> [(&'static str, &str, &'static [&'static str]); 3] {
        [
            ("scriptCommand", self.script_command.as_str(), SCRIPT_PLACEHOLDERS),
            (
                "dataImportCommand",
                self.data_import_command.as_str(),
                DATA_IMPORT_PLACEHOLDERS,
            ),
            ("publishCommand", self.publish_command.as_str(), PUBLISH_PLACEHOLDERS),
        ]
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub commands_pre_deploy: Vec<DeclaredAction>,
    #[serde(default)]
    pub commands_post_deploy: Vec<DeclaredAction>,
    #[serde(default)]
    pub platform: PlatformConfig,
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            commands_pre_deploy: Vec::new(),
            commands_post_deploy: Vec::new(),
            platform: PlatformConfig::default(),
        }
    }

    pub fn actions_for(&self, phase: Phase) -> &[DeclaredAction] {
        match phase {
            Phase::Pre => &self.commands_pre_deploy,
            Phase::Post => &self.commands_post_deploy,
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(RolloutError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (list, actions) in [
            ("commandsPreDeploy", &self.commands_pre_deploy),
            ("commandsPostDeploy", &self.commands_post_deploy),
        ] {
            let mut seen = HashSet::new();
            for (i, action) in actions.iter().enumerate() {
                let id = action.id.trim();
                if id.is_empty() {
                    warnings.push(ConfigWarning::error(format!(
                        "{list}[{i}] has an empty id"
                    )));
                } else if !seen.insert(id) {
                    warnings.push(ConfigWarning::error(format!(
                        "duplicate action id '{id}' in {list}"
                    )));
                }

                let name = if id.is_empty() {
                    format!("{list}[{i}]")
                } else {
                    format!("'{id}'")
                };

                if action.label.trim().is_empty() {
                    warnings.push(ConfigWarning::warning(format!(
                        "action {name} in {list} has an empty label"
                    )));
                }

                match action.kind() {
                    None => warnings.push(ConfigWarning::warning(format!(
                        "action {name} in {list} has unknown type '{}'",
                        action.action_type
                    ))),
                    Some(ActionType::Command)
                        if action.command.as_deref().map_or(true, |c| c.trim().is_empty()) =>
                    {
                        warnings.push(ConfigWarning::warning(format!(
                            "command action {name} in {list} has no command"
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        for (key, template, allowed) in self.platform.templates() {
            for placeholder in template_placeholders(template) {
                if !allowed.contains(&placeholder.as_str()) {
                    warnings.push(ConfigWarning::error(format!(
                        "platform.{key} uses unknown placeholder {{{placeholder}}}"
                    )));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionContext;
    use tempfile::TempDir;

    fn errors(warnings: &[ConfigWarning]) -> Vec<&str> {
        warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message.as_str())
            .collect()
    }

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("test-project");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project.name, "test-project");
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.platform, PlatformConfig::default());
    }

    #[test]
    fn parses_action_lists_with_platform_defaults() {
        let yaml = r#"
version: 1
project:
  name: acme
commandsPreDeploy:
  - id: lint
    label: Lint metadata
    command: npm run lint
    context: check-only
commandsPostDeploy:
  - id: seed
    label: Seed accounts
    type: data-import
    runOnlyOnceByOrg: true
    parameters:
      dataWorkspace: accounts
platform:
  dataDir: data
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.actions_for(Phase::Pre)[0].context, ActionContext::CheckOnly);
        let seed = &cfg.actions_for(Phase::Post)[0];
        assert_eq!(seed.kind(), Some(ActionType::DataImport));
        assert!(seed.run_only_once_by_org);
        assert_eq!(cfg.platform.data_dir, "data");
        assert_eq!(cfg.platform.script_command, default_script_command());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(RolloutError::NotInitialized)
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("acme");
        cfg.commands_pre_deploy
            .push(DeclaredAction::new("hello", "Say hello").with_command("echo hello"));
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.commands_pre_deploy, cfg.commands_pre_deploy);
    }

    #[test]
    fn validate_flags_ids_labels_and_types() {
        let mut cfg = Config::new("acme");
        cfg.commands_pre_deploy = vec![
            DeclaredAction::new("a", "A").with_command("true"),
            DeclaredAction::new("a", "Again").with_command("true"),
            DeclaredAction::new("", "No id").with_command("true"),
            DeclaredAction::new("b", "").with_command("true"),
            DeclaredAction::new("c", "Teleport").with_type("teleport"),
            DeclaredAction::new("d", "Nothing to run"),
        ];
        // Same id in the other list is fine.
        cfg.commands_post_deploy = vec![DeclaredAction::new("a", "A").with_command("true")];

        let warnings = cfg.validate();
        let errs = errors(&warnings);
        assert_eq!(errs.len(), 2, "{errs:?}");
        assert!(errs.iter().any(|m| m.contains("duplicate action id 'a'")));
        assert!(errs.iter().any(|m| m.contains("empty id")));

        let warns: Vec<&str> = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Warning)
            .map(|w| w.message.as_str())
            .collect();
        assert_eq!(warns.len(), 3, "{warns:?}");
        assert!(warns.iter().any(|m| m.contains("empty label")));
        assert!(warns.iter().any(|m| m.contains("unknown type 'teleport'")));
        assert!(warns.iter().any(|m| m.contains("'d'") && m.contains("no command")));
    }

    #[test]
    fn validate_flags_unknown_template_placeholder() {
        let mut cfg = Config::new("acme");
        cfg.platform.publish_command = "sf community publish --name {site}".to_string();
        let warnings = cfg.validate();
        assert_eq!(
            errors(&warnings),
            vec!["platform.publishCommand uses unknown placeholder {site}"]
        );
    }

    #[test]
    fn validate_flags_placeholder_from_another_template() {
        let mut cfg = Config::new("acme");
        cfg.platform.script_command =
            "sf apex run --name {name} --target-org {target}".to_string();
        cfg.platform.data_import_command = "import {path}".to_string();
        let warnings = cfg.validate();
        assert_eq!(
            errors(&warnings),
            vec![
                "platform.scriptCommand uses unknown placeholder {name}",
                "platform.dataImportCommand uses unknown placeholder {path}",
            ]
        );
    }
}
