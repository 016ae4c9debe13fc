use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration from tracker.toml in the storage directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Which conversation the chat-local snapshot belongs to
    #[serde(default = "default_chat_id")]
    pub chat_id: String,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where the default template comes from. With neither set, the built-in
/// template is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Length of the modal close animation in milliseconds
    #[serde(default = "default_close_animation_ms")]
    pub close_animation_ms: u64,
}

impl UiConfig {
    pub fn close_animation(&self) -> Duration {
        Duration::from_millis(self.close_animation_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            close_animation_ms: default_close_animation_ms(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            chat_id: default_chat_id(),
            template: TemplateConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

fn default_chat_id() -> String {
    "default".to_string()
}

fn default_close_animation_ms() -> u64 {
    200
}
