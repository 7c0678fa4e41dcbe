//! Persistent editor settings

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::command::{UndoStack, DEFAULT_UNDO_LIMIT};
use crate::model::{Model, VERSION_2_0, VERSION_2_1};
use crate::util::{Result, EPSILON};
use crate::validator::{SeverityMask, Validator};

/// Editor settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Serialization
    pub codec: Codec,
    pub default_version: f32,

    // Validation
    pub severity: SeverityMask,

    // Editing
    pub undo_limit: usize,
    pub solver_epsilon: f32,
    pub reload_after_material_delete: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            codec: Codec::Utf16,
            default_version: VERSION_2_0,
            severity: SeverityMask::default(),
            undo_limit: DEFAULT_UNDO_LIMIT,
            solver_epsilon: EPSILON,
            reload_after_material_delete: true,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let mut settings: Self = serde_json::from_str(&text)?;

        if settings.default_version != VERSION_2_0 && settings.default_version != VERSION_2_1 {
            tracing::warn!(version = settings.default_version, "unsupported default version, using 2.0");
            settings.default_version = VERSION_2_0;
        }
        if !settings.solver_epsilon.is_finite() || settings.solver_epsilon <= 0.0 {
            settings.solver_epsilon = EPSILON;
        }
        settings.undo_limit = settings.undo_limit.max(1);

        tracing::info!(path = %path.as_ref().display(), "settings loaded");
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Empty document using the configured version and codec
    pub fn new_model(&self) -> Model {
        let mut model = Model::with_version(self.default_version);
        model.codec = self.codec;
        model
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.severity)
    }

    pub fn undo_stack(&self) -> UndoStack {
        UndoStack::new(self.undo_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Severity;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_settings_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let settings = Settings {
            codec: Codec::Utf8,
            default_version: VERSION_2_1,
            severity: SeverityMask::at_least(Severity::Error),
            undo_limit: 16,
            solver_epsilon: 1e-5,
            reload_after_material_delete: false,
        };
        settings.save(file.path()).unwrap();
        assert_eq!(Settings::load(file.path()).unwrap(), settings);
    }

    #[test]
    fn test_settings_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "undo_limit": 0, "default_version": 3.0 }}"#).unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.undo_limit, 1);
        assert_eq!(settings.default_version, VERSION_2_0);
        assert!(settings.reload_after_material_delete);
        assert_eq!(settings.codec, Codec::Utf16);
    }

    #[test]
    fn test_settings_new_model() {
        let settings = Settings { codec: Codec::Utf8, default_version: VERSION_2_1, ..Default::default() };
        let model = settings.new_model();
        assert_eq!(model.codec, Codec::Utf8);
        assert!(model.is_v21());
        assert_eq!(settings.undo_stack().limit(), DEFAULT_UNDO_LIMIT);
    }

    #[test]
    fn test_settings_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Settings::load(file.path()).is_err());
    }
}
