//! Pipeline configuration
use serde::{Deserialize, Serialize};

/// Knobs for one pipeline instance.
///
/// `max_revisions` bounds worst-case latency and API cost; it is a
/// correctness control, not just tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub max_revisions: u32,
    pub model: String,
    pub temperature: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_revisions: 2,
            model: "gpt-4-0125-preview".to_string(),
            temperature: 0.7,
        }
    }
}

impl PipelineConfig {
    /// Read overrides from the environment (SAKUMON_MAX_REVISIONS,
    /// SAKUMON_MODEL), falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("SAKUMON_MAX_REVISIONS") {
            if let Ok(n) = raw.parse() {
                config.max_revisions = n;
            }
        }
        if let Ok(model) = std::env::var("SAKUMON_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_revisions, 2);
        assert!(!config.model.is_empty());
    }
}
