use crate::combo::Combo;
use anyhow::{bail, Context};
use log::info;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Opens the palette.
    pub toggle_hotkey: String,
    /// Holds `<app>.json` and `<app>/*.json` shortcut sources.
    pub hotkeys_dir: PathBuf,
    /// Pause after every press and release while replaying.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "keypress_delay_ms")]
    pub keypress_delay: Duration,
    /// Command reading entry names on stdin and printing the chosen one.
    /// Without it `listen` has no way to ask which shortcut to run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picker: Option<Vec<String>>,
    pub grab: bool,
    /// Only keyboards whose name contains one of these are used.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub device_names: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            toggle_hotkey: "ctrl+shift+p".to_string(),
            hotkeys_dir: PathBuf::from("data/hotkeys"),
            keypress_delay: Duration::from_millis(50),
            picker: Some(vec!["fuzzel".to_string(), "--dmenu".to_string()]),
            grab: true,
            device_names: Vec::new(),
        }
    }
}

enum ConfigFiletype {
    Yaml,
    Toml,
}

fn get_file_ext(filename: &Path) -> ConfigFiletype {
    match filename.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFiletype::Toml,
        _ => ConfigFiletype::Yaml,
    }
}

/// `$XDG_CONFIG_HOME/fasthotkey/config.toml`, falling back to `~/.config`.
pub fn default_path() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("fasthotkey").join("config.toml")
}

/// Reads the config at `filename`. A missing file is created with the
/// default settings, which are then used.
pub fn load_config(filename: &Path) -> anyhow::Result<Config> {
    if !filename.exists() {
        let config = Config::default();
        write_config(filename, &config)?;
        info!("Wrote default config to {}", filename.display());
        return Ok(config);
    }

    let text = fs::read_to_string(filename).with_context(|| format!("failed to read {}", filename.display()))?;
    let config: Config = match get_file_ext(filename) {
        ConfigFiletype::Toml => toml::from_str(&text).with_context(|| format!("invalid TOML in {}", filename.display()))?,
        ConfigFiletype::Yaml => {
            serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", filename.display()))?
        }
    };
    config.validate()?;
    Ok(config)
}

pub fn write_config(filename: &Path, config: &Config) -> anyhow::Result<()> {
    let text = match get_file_ext(filename) {
        ConfigFiletype::Toml => toml::to_string(config)?,
        ConfigFiletype::Yaml => serde_yaml::to_string(config)?,
    };
    if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(filename, text).with_context(|| format!("failed to write {}", filename.display()))
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        Combo::parse(&self.toggle_hotkey).with_context(|| format!("toggle_hotkey {:?}", self.toggle_hotkey))?;
        if self.picker.as_ref().is_some_and(|cmd| cmd.is_empty()) {
            bail!("picker must name a command");
        }
        Ok(())
    }
}
