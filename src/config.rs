use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, ScriptlocError};
use crate::prompts::{BOKUHIME_SYSTEM_PROMPT, DEFAULT_SYSTEM_PROMPT};
use crate::script::{BlockSyntax, SpeakerLinePolicy};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

fn default_text_field() -> String {
    "Text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub translate: TranslateConfig,
    pub games: Vec<GameProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Base URL of the chat-completions API
    pub endpoint: String,
    /// Model used for translation
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Attempts per file before giving up on pending blocks
    pub max_retries: u32,
    /// Wait for the reset when fewer requests than this remain
    pub min_remaining_requests: u64,
    /// Wait for the reset when fewer tokens than this remain
    pub min_remaining_tokens: u64,
    /// HTTP timeout per request, in seconds
    pub timeout_secs: u64,
    /// Files translated at the same time in batch mode
    pub max_concurrent_files: usize,
}

/// Directories and conventions of one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameProfile {
    /// Name used on the command line
    pub name: String,
    /// Exported original-language scripts
    pub export_dir: PathBuf,
    /// Machine-translated mirror of the export directory
    pub translated_dir: PathBuf,
    /// Bilingual output, defaults to `Combined` next to the export directory
    #[serde(default)]
    pub combined_dir: Option<PathBuf>,
    /// Translations without speaker notes, defaults to `Stripped` next to the export directory
    #[serde(default)]
    pub stripped_dir: Option<PathBuf>,
    /// JSON field holding the script blob
    #[serde(default = "default_text_field")]
    pub text_field: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub speaker_line_policy: SpeakerLinePolicy,
    #[serde(default)]
    pub syntax: BlockSyntax,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            translate: TranslateConfig::default(),
            games: vec![GameProfile::bokuhime()],
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_retries: 3,
            min_remaining_requests: 5,
            min_remaining_tokens: 5000,
            timeout_secs: 300,
            max_concurrent_files: 8,
        }
    }
}

impl GameProfile {
    /// Profile with the default conventions rooted at `root`
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            name: name.into(),
            export_dir: root.join("Export"),
            translated_dir: root.join("Translated"),
            combined_dir: None,
            stripped_dir: None,
            text_field: default_text_field(),
            system_prompt: None,
            speaker_line_policy: SpeakerLinePolicy::default(),
            syntax: BlockSyntax::default(),
        }
    }

    pub fn bokuhime() -> Self {
        Self {
            system_prompt: Some(BOKUHIME_SYSTEM_PROMPT.to_string()),
            ..Self::new("bokuhime", "bokuhime")
        }
    }

    pub fn combined_dir(&self) -> PathBuf {
        self.combined_dir
            .clone()
            .unwrap_or_else(|| self.export_dir.with_file_name("Combined"))
    }

    pub fn stripped_dir(&self) -> PathBuf {
        self.stripped_dir
            .clone()
            .unwrap_or_else(|| self.export_dir.with_file_name("Stripped"))
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScriptlocError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ScriptlocError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ScriptlocError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ScriptlocError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load `path`, else `config.toml` in the working directory, else the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            debug!("Loading configuration from {}", local.display());
            return Self::from_file(local);
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn game(&self, name: &str) -> Result<&GameProfile> {
        self.games
            .iter()
            .find(|game| game.name == name)
            .ok_or_else(|| ScriptlocError::Config(format!("Unknown game: {}", name)))
    }

    pub fn game_names(&self) -> Vec<&str> {
        self.games.iter().map(|game| game.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_has_bokuhime() {
        let config = Config::default();
        let game = config.game("bokuhime").unwrap();

        assert_eq!(game.export_dir, Path::new("bokuhime/Export"));
        assert_eq!(game.translated_dir, Path::new("bokuhime/Translated"));
        assert_eq!(game.combined_dir(), Path::new("bokuhime/Combined"));
        assert_eq!(game.stripped_dir(), Path::new("bokuhime/Stripped"));
        assert!(game.system_prompt().contains("Bokuhime Project"));
        assert_eq!(config.translate.max_retries, 3);
    }

    #[test]
    fn test_unknown_game() {
        let err = Config::default().game("nope").unwrap_err();
        assert!(err.to_string().contains("Unknown game: nope"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[translate]
model = "gpt-4o"

[[games]]
name = "demo"
export_dir = "demo/in"
translated_dir = "demo/out"
speaker_line_policy = "strip_brackets"

[games.syntax]
prefix = "//"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.translate.model, "gpt-4o");
        assert_eq!(config.translate.max_concurrent_files, 8);

        let game = config.game("demo").unwrap();
        assert_eq!(game.text_field, "Text");
        assert_eq!(game.speaker_line_policy, SpeakerLinePolicy::StripBrackets);
        assert_eq!(game.syntax.prefix.as_deref(), Some("//"));
        assert_eq!(game.syntax.open, "MSG([[");
        assert_eq!(game.combined_dir(), Path::new("demo/Combined"));
        assert_eq!(game.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.translate.max_retries = 5;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.translate.max_retries, 5);
        assert_eq!(loaded.game_names(), vec!["bokuhime"]);
        assert_eq!(loaded.games[0].syntax, BlockSyntax::default());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "translate = 3").unwrap();

        assert!(matches!(Config::from_file(&path), Err(ScriptlocError::Config(_))));
    }
}
