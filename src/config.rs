//! Configuration loading and types for dictype
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/dictype/config.toml)
//! 3. Environment variables (DICTYPE_*)
//! 4. CLI arguments (highest priority)

use crate::error::DictypeError;
use crate::keybinding::Binding;
use crate::keymap::LayoutIdentifier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Dictype Configuration
#
# Location: ~/.config/dictype/config.toml
# All settings can be overridden via CLI flags

# Prefix for keybindings registered by `dictype bindings apply`.
# Entries carrying this prefix are replaced on every apply.
keybinding_namespace = "dictype"

[layout]
# Layout used when the active layout cannot be determined
default_layout = "us"
default_variant = ""

# How the active layout is detected: "auto", "gnome" or "xkb"
# - gnome: GNOME input sources (gsettings)
# - xkb: setxkbmap -query
# - auto: GNOME first, then setxkbmap
source = "auto"

# Always use this layout instead of detecting it, e.g. "de+nodeadkeys"
# pin = "fr"

[injection]
# Key event backend: "uinput" or "ydotool"
# - uinput: virtual keyboard via /dev/uinput (user must be in 'input' group)
# - ydotool: requires the ydotoold daemon
backend = "uinput"

# Delay between typed characters in milliseconds
# 0 = fastest possible, increase if characters are dropped
type_delay_ms = 0

# Delay before typing starts, in milliseconds
pre_type_delay_ms = 0

# Retry a transient key event failure once before giving up
retry_transient = true

[fallback]
# Delivery for characters the layout cannot type: "unicode", "clipboard" or "none"
# - unicode: direct code-point injection (requires wtype)
# - clipboard: paste via clipboard, restoring it afterwards (requires wl-clipboard)
strategy = "unicode"

# Wait around the clipboard paste, in milliseconds
paste_delay_ms = 50

[notification]
# Show a desktop notification when output was degraded
# (fallback used, characters failed, or layout unknown)
on_degraded = true

# Hotkeys registered with `dictype bindings apply`
# [[keybindings]]
# name = "Toggle dictation"
# key_combo = "<Super>Insert"
# command = "sh -c \"echo toggle >> /tmp/dictate_trigger\""
"#;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_namespace")]
    pub keybinding_namespace: String,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub injection: InjectionConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,

    #[serde(default)]
    pub notification: NotificationConfig,

    #[serde(default)]
    pub keybindings: Vec<Binding>,
}

/// How the active layout is detected
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDetection {
    /// GNOME input sources, then setxkbmap
    #[default]
    Auto,
    Gnome,
    Xkb,
}

/// Layout detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayoutConfig {
    #[serde(default = "default_layout")]
    pub default_layout: String,

    #[serde(default)]
    pub default_variant: String,

    #[serde(default)]
    pub source: LayoutDetection,

    /// Layout forced instead of detection, as `layout[+variant]`
    #[serde(default, rename = "pin", skip_serializing_if = "Option::is_none")]
    pub pinned: Option<String>,
}

impl LayoutConfig {
    /// Layout used when detection fails
    pub fn default_identifier(&self) -> LayoutIdentifier {
        LayoutIdentifier::new(
            self.default_layout.clone(),
            self.default_variant.clone(),
            0,
        )
    }

    /// The pinned layout, if one is configured and valid
    pub fn pinned_identifier(&self) -> Option<LayoutIdentifier> {
        self.pinned
            .as_deref()
            .and_then(|spec| LayoutIdentifier::parse(spec, 0))
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_layout: default_layout(),
            default_variant: String::new(),
            source: LayoutDetection::default(),
            pinned: None,
        }
    }
}

/// Key event backend
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InjectionBackend {
    #[default]
    Uinput,
    Ydotool,
}

impl std::str::FromStr for InjectionBackend {
    type Err = DictypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uinput" => Ok(InjectionBackend::Uinput),
            "ydotool" => Ok(InjectionBackend::Ydotool),
            other => Err(DictypeError::Config(format!(
                "Unknown injection backend '{}' (expected uinput or ydotool)",
                other
            ))),
        }
    }
}

/// Keystroke injection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InjectionConfig {
    #[serde(default)]
    pub backend: InjectionBackend,

    /// Delay between typed characters in milliseconds
    #[serde(default)]
    pub type_delay_ms: u32,

    /// Delay before typing starts in milliseconds
    #[serde(default)]
    pub pre_type_delay_ms: u32,

    #[serde(default = "default_true")]
    pub retry_transient: bool,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            backend: InjectionBackend::default(),
            type_delay_ms: 0,
            pre_type_delay_ms: 0,
            retry_transient: true,
        }
    }
}

/// Delivery strategy for characters without a keystroke
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackStrategy {
    #[default]
    Unicode,
    Clipboard,
    None,
}

impl std::str::FromStr for FallbackStrategy {
    type Err = DictypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unicode" => Ok(FallbackStrategy::Unicode),
            "clipboard" => Ok(FallbackStrategy::Clipboard),
            "none" | "off" | "disabled" => Ok(FallbackStrategy::None),
            other => Err(DictypeError::Config(format!(
                "Unknown fallback strategy '{}' (expected unicode, clipboard or none)",
                other
            ))),
        }
    }
}

/// Fallback channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub strategy: FallbackStrategy,

    #[serde(default = "default_paste_delay")]
    pub paste_delay_ms: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            strategy: FallbackStrategy::default(),
            paste_delay_ms: default_paste_delay(),
        }
    }
}

/// Desktop notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Notify when a session used the fallback, failed, or ran on an
    /// unknown layout
    #[serde(default = "default_true")]
    pub on_degraded: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { on_degraded: true }
    }
}

fn default_layout() -> String {
    "us".to_string()
}

fn default_namespace() -> String {
    "dictype".to_string()
}

fn default_paste_delay() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keybinding_namespace: default_namespace(),
            layout: LayoutConfig::default(),
            injection: InjectionConfig::default(),
            fallback: FallbackConfig::default(),
            notification: NotificationConfig::default(),
            keybindings: Vec::new(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dictype")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, DictypeError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| DictypeError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| DictypeError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Override config fields from `DICTYPE_*` variables
fn apply_env_overrides(
    config: &mut Config,
    var: impl Fn(&str) -> Option<String>,
) -> Result<(), DictypeError> {
    if let Some(layout) = var("DICTYPE_LAYOUT") {
        config.layout.pinned = Some(layout);
    }
    if let Some(backend) = var("DICTYPE_BACKEND") {
        config.injection.backend = backend.parse()?;
    }
    if let Some(strategy) = var("DICTYPE_FALLBACK") {
        config.fallback.strategy = strategy.parse()?;
    }
    Ok(())
}

fn validate(config: &Config) -> Result<(), DictypeError> {
    if let Some(ref pinned) = config.layout.pinned {
        if config.layout.pinned_identifier().is_none() {
            return Err(DictypeError::Config(format!(
                "Invalid pinned layout '{}' (expected layout or layout+variant)",
                pinned
            )));
        }
    }
    if config.layout.default_layout.trim().is_empty() {
        return Err(DictypeError::Config(
            "layout.default_layout must not be empty".to_string(),
        ));
    }
    if config.keybinding_namespace.trim().is_empty()
        || config.keybinding_namespace.contains(['/', ':'])
    {
        return Err(DictypeError::Config(format!(
            "Invalid keybinding_namespace '{}'",
            config.keybinding_namespace
        )));
    }
    Ok(())
}
