//! Global hotkey registration
//!
//! Registers the hotkeys that trigger dictation as custom keybindings in the
//! desktop's settings store. Every entry this application creates carries
//! the namespace prefix in its name, so [`KeybindingManager::apply`] can
//! remove its own entries and recreate exactly the configured set without
//! touching the user's other shortcuts.

pub mod gsettings;

use crate::error::KeybindingError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

/// Dictation commands a binding can trigger
pub const TRIGGER_COMMANDS: &[&str] = &["record", "stop", "toggle", "record till pause", "echo"];

/// One configured hotkey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    /// Accelerator, e.g. `<Super>Insert` or `Ctrl+Alt+D`
    pub key_combo: String,
    /// Shell command run when the hotkey is pressed
    pub command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComboModifier {
    Control,
    Alt,
    Shift,
    Super,
    Hyper,
    Meta,
}

impl ComboModifier {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "primary" | "control" | "ctrl" => Some(ComboModifier::Control),
            "alt" | "mod1" => Some(ComboModifier::Alt),
            "shift" => Some(ComboModifier::Shift),
            "super" | "mod4" | "win" => Some(ComboModifier::Super),
            "hyper" => Some(ComboModifier::Hyper),
            "meta" => Some(ComboModifier::Meta),
            _ => None,
        }
    }

    fn accel_name(self) -> &'static str {
        match self {
            ComboModifier::Control => "Control",
            ComboModifier::Alt => "Alt",
            ComboModifier::Shift => "Shift",
            ComboModifier::Super => "Super",
            ComboModifier::Hyper => "Hyper",
            ComboModifier::Meta => "Meta",
        }
    }
}

/// A validated key combination in GTK accelerator form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifiers: BTreeSet<ComboModifier>,
    pub key: String,
}

impl KeyCombo {
    /// Parse `<Super><Shift>Insert` or `Super+Shift+Insert`
    pub fn parse(combo: &str) -> Result<Self, KeybindingError> {
        let invalid = || KeybindingError::InvalidCombo(combo.to_string());
        let trimmed = combo.trim();
        let mut modifiers = BTreeSet::new();

        let key = if trimmed.starts_with('<') {
            let mut rest = trimmed;
            while let Some(stripped) = rest.strip_prefix('<') {
                let end = stripped.find('>').ok_or_else(invalid)?;
                modifiers.insert(ComboModifier::parse(&stripped[..end]).ok_or_else(invalid)?);
                rest = &stripped[end + 1..];
            }
            rest
        } else {
            let mut parts: Vec<&str> = trimmed.split('+').map(str::trim).collect();
            let key = parts.pop().unwrap_or_default();
            for part in parts {
                modifiers.insert(ComboModifier::parse(part).ok_or_else(invalid)?);
            }
            key
        };

        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }

        Ok(Self {
            modifiers,
            key: key.to_string(),
        })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "<{}>", m.accel_name())?;
        }
        write!(f, "{}", self.key)
    }
}

/// A custom keybinding as stored by the desktop
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredBinding {
    pub name: String,
    pub command: String,
    pub binding: String,
}

/// Persistent store of custom keybindings
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// Paths of all registered custom keybindings
    async fn list_paths(&self) -> Result<Vec<String>, KeybindingError>;

    async fn read(&self, path: &str) -> Result<StoredBinding, KeybindingError>;

    async fn write(&self, path: &str, binding: &StoredBinding) -> Result<(), KeybindingError>;

    /// Reset the entry at `path` to its defaults
    async fn remove(&self, path: &str) -> Result<(), KeybindingError>;

    /// Replace the list of registered paths
    async fn set_paths(&self, paths: &[String]) -> Result<(), KeybindingError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Result of applying one configured binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOutcome {
    pub name: String,
    /// Path the binding was registered at
    pub result: Result<String, KeybindingError>,
}

/// Everything [`KeybindingManager::apply`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Paths of previous entries that were removed
    pub removed: Vec<String>,
    /// Previous entries that could not be removed
    pub removal_failures: Vec<(String, KeybindingError)>,
    pub outcomes: Vec<BindingOutcome>,
}

impl ApplyReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.removal_failures.len() + self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failures() == 0
    }
}

/// A registered binding of this application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredBinding {
    pub path: String,
    pub name: String,
    pub key_combo: String,
    pub command: String,
}

/// Registered bindings plus the dictation commands nothing triggers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingListing {
    pub bound: Vec<RegisteredBinding>,
    pub unbound_commands: Vec<&'static str>,
}

pub struct KeybindingManager {
    store: Box<dyn SettingsStore>,
    namespace: String,
}

impl KeybindingManager {
    pub fn new(store: Box<dyn SettingsStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Name under which a binding is stored
    fn stored_name(&self, name: &str) -> String {
        format!("{}: {}", self.namespace, name)
    }

    fn owns(&self, stored_name: &str) -> bool {
        stored_name
            .strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.starts_with(':'))
    }

    /// Remove this application's previous entries, then register exactly
    /// `bindings`. Individual failures are reported, not fatal; only an
    /// unreadable path list stops the whole operation.
    pub async fn apply(&self, bindings: &[Binding]) -> Result<ApplyReport, KeybindingError> {
        let mut report = ApplyReport::default();
        let mut paths = Vec::new();

        for path in self.store.list_paths().await? {
            let stored = match self.store.read(&path).await {
                Ok(stored) => stored,
                Err(e) => {
                    tracing::warn!("Could not read keybinding {}: {}", path, e);
                    paths.push(path);
                    continue;
                }
            };
            if !self.owns(&stored.name) {
                paths.push(path);
                continue;
            }
            match self.store.remove(&path).await {
                Ok(()) => {
                    tracing::debug!("Removed keybinding '{}' at {}", stored.name, path);
                    report.removed.push(path);
                }
                Err(e) => {
                    tracing::warn!("Could not remove keybinding {}: {}", path, e);
                    report.removal_failures.push((path.clone(), e));
                    paths.push(path);
                }
            }
        }

        let mut created = Vec::new();
        let mut next_index = 0;
        for binding in bindings {
            let result = match KeyCombo::parse(&binding.key_combo) {
                Ok(combo) => {
                    let path = loop {
                        let candidate = gsettings::binding_path(&self.namespace, next_index);
                        next_index += 1;
                        if !paths.contains(&candidate) {
                            break candidate;
                        }
                    };
                    let stored = StoredBinding {
                        name: self.stored_name(&binding.name),
                        command: binding.command.clone(),
                        binding: combo.to_string(),
                    };
                    self.store.write(&path, &stored).await.map(|_| path)
                }
                Err(e) => Err(e),
            };

            match &result {
                Ok(path) => {
                    tracing::debug!("Registered '{}' at {}", binding.name, path);
                    created.push(report.outcomes.len());
                    paths.push(path.clone());
                }
                Err(e) => tracing::warn!("Keybinding '{}' not applied: {}", binding.name, e),
            }
            report.outcomes.push(BindingOutcome {
                name: binding.name.clone(),
                result,
            });
        }

        if let Err(e) = self.store.set_paths(&paths).await {
            tracing::warn!("Could not update keybinding list: {}", e);
            for index in created {
                report.outcomes[index].result = Err(e.clone());
            }
        }

        tracing::info!(
            "Applied {} of {} keybindings via {} ({} previous removed)",
            report.applied(),
            bindings.len(),
            self.store.name(),
            report.removed.len()
        );
        Ok(report)
    }

    /// This application's registered bindings and the trigger commands that
    /// have none
    pub async fn list(&self) -> Result<BindingListing, KeybindingError> {
        let mut listing = BindingListing::default();
        let mut bound_commands = BTreeSet::new();

        for path in self.store.list_paths().await? {
            let stored = match self.store.read(&path).await {
                Ok(stored) => stored,
                Err(e) => {
                    tracing::warn!("Could not read keybinding {}: {}", path, e);
                    continue;
                }
            };
            if !self.owns(&stored.name) || stored.binding.is_empty() {
                continue;
            }
            if let Some(trigger) = trigger_command(&stored.command) {
                bound_commands.insert(trigger);
            }
            let name = stored.name[self.namespace.len() + 1..].trim().to_string();
            listing.bound.push(RegisteredBinding {
                path,
                name,
                key_combo: stored.binding,
                command: stored.command,
            });
        }

        listing.unbound_commands = TRIGGER_COMMANDS
            .iter()
            .copied()
            .filter(|c| !bound_commands.contains(*c))
            .collect();
        listing.unbound_commands.sort_unstable();
        Ok(listing)
    }
}

/// Dictation command a shell command sends, e.g. `toggle` for
/// `sh -c "echo toggle >> /tmp/dictate_trigger"`
pub fn trigger_command(command: &str) -> Option<String> {
    static ECHO: OnceLock<Regex> = OnceLock::new();
    let echo = ECHO.get_or_init(|| Regex::new(r"echo\s+([^>]+?)\s*>>").expect("valid regex"));

    if let Some(caps) = echo.captures(command) {
        return Some(caps[1].trim().to_string());
    }
    let trimmed = command.trim();
    TRIGGER_COMMANDS
        .contains(&trimmed)
        .then(|| trimmed.to_string())
}
