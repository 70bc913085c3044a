//! Application configuration: a single flat record persisted as JSON.
//!
//! Every field has a serde default so a config written by an older build (or
//! a hand-edited one with missing keys) loads cleanly; absence is backfilled,
//! never an error. The file is rewritten wholesale on every save.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const OPENAI_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-3.5-turbo",
];
pub const GEMINI_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash"];
pub const IMAGE_SIZES: &[&str] = &["1024x1024", "1024x1792", "1792x1024"];
pub const ASPECT_RATIOS: &[&str] = &["16:9", "9:16", "1:1", "4:3", "3:4"];

/// Which provider backs the single-chat and duet modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    #[default]
    OpenAi,
    Gemini,
}

impl ChatProvider {
    pub fn label(self) -> &'static str {
        match self {
            ChatProvider::OpenAi => "openai",
            ChatProvider::Gemini => "gemini",
        }
    }

    pub fn models(self) -> &'static [&'static str] {
        match self {
            ChatProvider::OpenAi => OPENAI_MODELS,
            ChatProvider::Gemini => GEMINI_MODELS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// One AI persona for duet mode: a display name plus its system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub system_prompt: String,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_font_family() -> String {
    "Inter".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant.".to_string()
}

fn default_persona_one() -> Persona {
    Persona {
        name: "Aria".to_string(),
        system_prompt: "You are the first AI in a conversation. Be creative and engaging."
            .to_string(),
    }
}

fn default_persona_two() -> Persona {
    Persona {
        name: "Basil".to_string(),
        system_prompt: "You are the second AI in a conversation. Respond thoughtfully."
            .to_string(),
    }
}

/// The whole user-editable configuration. Empty key strings mean
/// "not configured" for that provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default)]
    pub luma_api_key: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default)]
    pub chat_provider: ChatProvider,

    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,

    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_true")]
    pub auto_check_updates: bool,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_persona_one")]
    pub persona_one: Persona,
    #[serde(default = "default_persona_two")]
    pub persona_two: Persona,
}

impl Default for AppSettings {
    fn default() -> Self {
        // Round-trips through an empty object so every serde default applies
        // in exactly one place.
        serde_json::from_value(serde_json::json!({})).expect("defaults are total")
    }
}

impl AppSettings {
    /// Model identifier for the currently selected chat provider.
    pub fn chat_model(&self) -> &str {
        match self.chat_provider {
            ChatProvider::OpenAi => &self.openai_model,
            ChatProvider::Gemini => &self.gemini_model,
        }
    }

    /// Platform config file location, e.g. `~/.config/kaleido/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("kaleido");
            p.push("settings.json");
            p
        })
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or unreadable. Startup never fails on a bad config.
    pub fn load_or_default(path: Option<&std::path::Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("ignoring malformed settings file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Overwrite the whole file. Failure is logged and otherwise swallowed;
    /// the in-memory settings stay authoritative for this session.
    pub fn save(&self, path: Option<&std::path::Path>) {
        let Some(path) = path else { return };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    tracing::warn!("failed to save settings to {:?}: {}", path, e);
                }
            }
            Err(e) => tracing::warn!("failed to serialize settings: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fully_populated() {
        let settings = AppSettings::default();
        assert_eq!(settings.openai_model, "gpt-4o-mini");
        assert_eq!(settings.chat_provider, ChatProvider::OpenAi);
        assert_eq!(settings.max_tokens, 2048);
        assert!(settings.auto_check_updates);
        assert_eq!(settings.persona_one.name, "Aria");
        assert!(settings.openai_api_key.is_empty());
    }

    #[test]
    fn test_partial_json_backfills_missing_fields() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"openai_api_key":"sk-test","theme":"light"}"#).unwrap();
        assert_eq!(settings.openai_api_key, "sk-test");
        assert_eq!(settings.theme, Theme::Light);
        // Everything absent comes back as a default, not an error.
        assert_eq!(settings.gemini_model, "gemini-2.0-flash");
        assert_eq!(settings.temperature, 0.7);
    }

    #[test]
    fn test_chat_model_follows_provider() {
        let mut settings = AppSettings::default();
        assert_eq!(settings.chat_model(), "gpt-4o-mini");
        settings.chat_provider = ChatProvider::Gemini;
        assert_eq!(settings.chat_model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = AppSettings::default();
        settings.luma_api_key = "luma-key".to_string();
        settings.temperature = 1.3;
        settings.save(Some(&path));

        let loaded = AppSettings::load_or_default(Some(&path));
        assert_eq!(loaded.luma_api_key, "luma-key");
        assert_eq!(loaded.temperature, 1.3);
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let loaded = AppSettings::load_or_default(Some(&path));
        assert_eq!(loaded.openai_model, "gpt-4o-mini");
    }
}
