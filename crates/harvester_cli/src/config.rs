//! Run configuration loaded from a RON file.
//!
//! Every field has a default, so an empty `()` document or a missing file
//! yields the stock settings.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_logging::engine_info;
use harvester_core::{InclusionPolicy, DEFAULT_RETENTION};
use harvester_engine::{system_clock, HarvestSettings, RenderSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Requested feed localization, sent as the `hl` query parameter.
    pub language: String,
    pub same_language_only: bool,
    pub comments_only: bool,
    pub retention_window: usize,
    pub wait_timeout_secs: u64,
    pub settle_delay_ms: u64,
    /// Elements a replayed snapshot renders on open.
    pub initial_render: usize,
    /// Elements a replayed snapshot renders per load request.
    pub render_batch: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            same_language_only: false,
            comments_only: false,
            retention_window: DEFAULT_RETENTION,
            wait_timeout_secs: 30,
            settle_delay_ms: 1000,
            initial_render: 10,
            render_batch: 10,
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        engine_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn harvest_settings(&self) -> HarvestSettings {
        HarvestSettings {
            language: self.language.clone(),
            policy: InclusionPolicy {
                same_language_only: self.same_language_only,
                comments_only: self.comments_only,
            },
            retention_window: self.retention_window,
            wait_timeout: Duration::from_secs(self.wait_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            harvested_at: system_clock(),
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            initial: self.initial_render,
            batch: self.render_batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(AppConfig::parse("()").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_document_overrides_named_fields() {
        let config =
            AppConfig::parse("(language: \"de\", comments_only: true, retention_window: 40)")
                .unwrap();
        assert_eq!(config.language, "de");
        assert!(config.comments_only);
        assert!(!config.same_language_only);
        assert_eq!(config.retention_window, 40);
        assert_eq!(config.render_batch, 10);

        let settings = config.harvest_settings();
        assert!(settings.policy.comments_only);
        assert_eq!(settings.settle_delay, Duration::from_secs(1));
    }

    #[test]
    fn unknown_fields_are_rejected_with_context() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("harvest.ron");
        fs::write(&path, "(langauge: \"fr\")").unwrap();

        let err = AppConfig::load(Some(path.as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }
}
