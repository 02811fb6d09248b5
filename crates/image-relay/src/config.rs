use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::relay::{SlotId, MAX_SLOTS};
use crate::runtime::NodeConfig;

/// Relay configuration.
///
/// Topic names are suffixes; the runtime scopes them under
/// `bubbaloop/{scope}/{machine_id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Number of `cam_{i}` output pairs, fixed at startup
    #[serde(default = "default_num_slots")]
    pub num_slots: usize,
    /// Upstream raw image stream
    #[serde(default = "default_image_topic")]
    pub image_topic: String,
    /// Upstream calibration stream
    #[serde(default = "default_camera_info_topic")]
    pub camera_info_topic: String,
    /// Save command (SaveCommand payload)
    #[serde(default = "default_save_topic")]
    pub save_topic: String,
    /// Publish-all command (payload ignored)
    #[serde(default = "default_publish_topic")]
    pub publish_topic: String,
    /// Clear command (payload ignored)
    #[serde(default = "default_clear_topic")]
    pub clear_topic: String,
    /// Output prefix: slot `i` publishes on `{prefix}_{i}/image_color`
    /// and `{prefix}_{i}/camera_info`
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
}

fn default_num_slots() -> usize {
    10
}

fn default_image_topic() -> String {
    "camera/color/image_raw".to_string()
}

fn default_camera_info_topic() -> String {
    "camera/color/camera_info".to_string()
}

fn default_save_topic() -> String {
    "save_image".to_string()
}

fn default_publish_topic() -> String {
    "publish_latched".to_string()
}

fn default_clear_topic() -> String {
    "clear_buffer".to_string()
}

fn default_output_prefix() -> String {
    "cam".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            num_slots: default_num_slots(),
            image_topic: default_image_topic(),
            camera_info_topic: default_camera_info_topic(),
            save_topic: default_save_topic(),
            publish_topic: default_publish_topic(),
            clear_topic: default_clear_topic(),
            output_prefix: default_output_prefix(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_slots == 0 || self.num_slots > MAX_SLOTS {
            return Err(ConfigError::ValidationError(format!(
                "num_slots must be 1-{}, got {}",
                MAX_SLOTS, self.num_slots
            )));
        }
        for (field, topic) in [
            ("image_topic", &self.image_topic),
            ("camera_info_topic", &self.camera_info_topic),
            ("save_topic", &self.save_topic),
            ("publish_topic", &self.publish_topic),
            ("clear_topic", &self.clear_topic),
            ("output_prefix", &self.output_prefix),
        ] {
            validate_topic(topic)
                .map_err(|e| ConfigError::ValidationError(format!("{field}: {e}")))?;
        }
        Ok(())
    }

    pub fn image_output_topic(&self, slot: SlotId) -> String {
        format!("{}_{}/image_color", self.output_prefix, slot)
    }

    pub fn camera_info_output_topic(&self, slot: SlotId) -> String {
        format!("{}_{}/camera_info", self.output_prefix, slot)
    }

    /// Every configured slot id, `0..num_slots`.
    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> {
        (0..self.num_slots.min(MAX_SLOTS)).map(|i| i as SlotId)
    }
}

impl NodeConfig for RelayConfig {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        RelayConfig::from_file(path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        RelayConfig::validate(self)
    }
}

/// Validate a topic suffix: 1-256 chars, no wildcards, no empty segments,
/// and a valid Zenoh key expression once scoped.
fn validate_topic(topic: &str) -> Result<(), String> {
    if topic.is_empty() || topic.len() > 256 {
        return Err(format!("topic must be 1-256 characters, got {}", topic.len()));
    }
    if topic.split('/').any(str::is_empty) {
        return Err(format!("topic '{topic}' must not contain empty segments"));
    }
    if topic.contains('*') {
        return Err(format!("topic '{topic}' must not contain wildcards"));
    }
    if !topic.chars().all(|c| c.is_alphanumeric() || "/-_.".contains(c)) {
        return Err(format!("topic '{topic}' contains invalid characters"));
    }
    zenoh::key_expr::KeyExpr::try_from(topic)
        .map_err(|e| format!("topic '{topic}' is not a valid key expression: {e}"))?;
    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
