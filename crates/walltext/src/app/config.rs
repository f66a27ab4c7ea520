use std::{collections::BTreeMap, path::Path};

use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walltext_placement_manager::DEFAULT_TABLE_NAME;
use walltext_placement_models::{GroupStyle, GroupStyles};

pub const CONFIG_FILE_NAME: &str = "walltext.toml";
pub const CONFIG_VERSION: u32 = 3;

/// Names the operator types to reach each command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandNames {
    pub add: String,
    pub remove: String,
    #[serde(rename = "move")]
    pub move_menu: String,
    pub import: String,
    pub refresh: String,
}

impl Default for CommandNames {
    fn default() -> Self {
        Self {
            add: "text".to_owned(),
            remove: "rtext".to_owned(),
            move_menu: "mtext".to_owned(),
            import: "importtext".to_owned(),
            refresh: "refreshtext".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// sqlite file, relative to the data directory unless absolute
    pub path: String,
    pub table_name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "walltext.db".to_owned(),
            table_name: DEFAULT_TABLE_NAME.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditSettings {
    pub step: f32,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            step: walltext_edit_manager::DEFAULT_STEP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub inserts_per_tick: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            inserts_per_tick: 1,
        }
    }
}

/// Content of `walltext.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallTextConfig {
    pub config_version: u32,
    pub enable_database: bool,
    pub remove_distance: f32,
    pub command_permission: String,
    pub commands: CommandNames,
    pub database: DatabaseSettings,
    pub edit: EditSettings,
    pub import: ImportSettings,
    pub groups: GroupStyles,
}

fn default_group(number: i32) -> GroupStyle {
    GroupStyle {
        lines: ["First", "Second", "Third"]
            .iter()
            .map(|nth| format!("{{White}}{nth} line of text from Group {number}."))
            .collect(),
        ..Default::default()
    }
}

impl Default for WallTextConfig {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(1, default_group(1));
        groups.insert(2, default_group(2));
        Self {
            config_version: CONFIG_VERSION,
            enable_database: true,
            remove_distance: 200.0,
            command_permission: "@css/root".to_owned(),
            commands: CommandNames::default(),
            database: DatabaseSettings::default(),
            edit: EditSettings::default(),
            import: ImportSettings::default(),
            groups: GroupStyles::new(groups),
        }
    }
}

impl WallTextConfig {
    pub fn validate(&self) -> Result<()> {
        if self.remove_distance.is_nan() || self.remove_distance < 0.0 {
            return Err(miette::miette!(
                "remove_distance must be a positive number, found {}",
                self.remove_distance
            ));
        }
        if !self.edit.step.is_finite() || self.edit.step <= 0.0 {
            return Err(miette::miette!(
                "edit.step must be a positive number, found {}",
                self.edit.step
            ));
        }
        if self.import.inserts_per_tick == 0 {
            return Err(miette::miette!("import.inserts_per_tick must be at least 1"));
        }
        Ok(())
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .into_diagnostic()
            .wrap_err("failed to parse configuration")?;
        config.validate()?;
        if config.config_version < CONFIG_VERSION {
            warn!(
                "Configuration version mismatch (Expected: {} | Current: {})",
                CONFIG_VERSION, config.config_version
            );
        }
        Ok(config)
    }

    /// Reads the configuration file of `data_path`, writing the default one first if there is none.
    pub fn load_or_create(data_path: &Path) -> Result<Self> {
        let path = data_path.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Self::default();
            let content = toml::to_string_pretty(&config)
                .into_diagnostic()
                .wrap_err("failed to serialize default configuration")?;
            std::fs::write(&path, content)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(?path, "default configuration written");
            return Ok(config);
        }
        let content = std::fs::read_to_string(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).wrap_err_with(|| format!("invalid {}", path.display()))
    }

    pub fn database_path(&self, data_path: &Path) -> std::path::PathBuf {
        data_path.join(&self.database.path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_written_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let written = WallTextConfig::load_or_create(dir.path()).unwrap();
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
        let read = WallTextConfig::load_or_create(dir.path()).unwrap();
        similar_asserts::assert_eq!(written.commands, read.commands);
        assert_eq!(read.groups.len(), 2);
        assert_eq!(
            read.groups.get(1).unwrap().lines[0],
            "{White}First line of text from Group 1."
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = WallTextConfig::parse(
            r#"
            enable_database = false

            [commands]
            add = "walltext"

            [groups.7]
            lines = ["{Gold}Welcome"]
            text_alignment = "center"
            background_enabled = true
            z_offset = 12.5
            "#,
        )
        .unwrap();
        assert!(!config.enable_database);
        assert_eq!(config.commands.add, "walltext");
        assert_eq!(config.commands.remove, "rtext");
        assert_eq!(config.remove_distance, 200.0);
        assert_eq!(config.edit.step, 5.0);
        assert_eq!(config.import.inserts_per_tick, 1);
        let group = config.groups.get(7).unwrap();
        assert_eq!(group.font_size, 24);
        assert_eq!(group.z_offset, 12.5);
        assert!(config.groups.get(1).is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(WallTextConfig::parse("remove_distance = -1.0").is_err());
        assert!(WallTextConfig::parse("[edit]\nstep = 0.0").is_err());
        assert!(WallTextConfig::parse("[import]\ninserts_per_tick = 0").is_err());
        assert!(WallTextConfig::parse("[groups.one]\nlines = []").is_err());
        assert!(WallTextConfig::parse("enable_database = \"yes\"").is_err());
    }
}
