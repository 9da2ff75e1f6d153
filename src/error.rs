//! Error types for dictype
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the dictype application
#[derive(Error, Debug)]
pub enum DictypeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Layout query error: {0}")]
    Layout(#[from] LayoutQueryError),

    #[error("Injection error: {0}")]
    Injection(#[from] InjectionError),

    #[error("Keybinding error: {0}")]
    Keybinding(#[from] KeybindingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while determining the active layout or its symbol table
#[derive(Error, Debug, Clone)]
pub enum LayoutQueryError {
    #[error("{0} not found in PATH. Install xkb utilities (setxkbmap, xkbcomp) via your package manager.")]
    ToolNotFound(String),

    #[error("{tool} failed: {stderr}")]
    CommandFailed { tool: String, stderr: String },

    #[error("Malformed layout data: {0}")]
    Malformed(String),

    #[error("IO error while querying layout: {0}")]
    Io(String),
}

/// How an OS-level send failure should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorKind {
    /// May succeed if retried once
    Transient,
    /// The target or the input subsystem is gone; the session must stop
    TargetGone,
    /// The physical key cannot be produced by this device
    KeyUnavailable,
    /// A dead key reached the OS but the key it composes with did not, so
    /// whatever is typed next would pick up the accent
    DeadKeyPending,
}

/// The OS refused or failed to deliver a key event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
}

impl SendError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SendErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn target_gone(message: impl Into<String>) -> Self {
        Self {
            kind: SendErrorKind::TargetGone,
            message: message.into(),
        }
    }

    pub fn key_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SendErrorKind::KeyUnavailable,
            message: message.into(),
        }
    }
}

/// Errors that end an injection request as a whole
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectionError {
    #[error("Another injection session is already active")]
    Busy,

    #[error("Key event delivery failed: {0}")]
    Send(#[from] SendError),

    #[error("Injection cancelled")]
    Cancelled,

    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool\n  Enable at boot: systemctl --user enable ydotool")]
    YdotoolNotRunning,

    #[error("Cannot create virtual keyboard: {0}\n  Is the user in the 'input' group with access to /dev/uinput?")]
    DeviceSetup(String),
}

/// Per-character failures of the fallback channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackError {
    #[error("{0} not found in PATH. Install it via your package manager.")]
    ToolNotFound(String),

    #[error("Clipboard access failed: {0}")]
    Clipboard(String),

    #[error("Fallback injection failed: {0}")]
    Failed(String),

    #[error("Paste keystroke failed: {0}")]
    Send(#[from] SendError),

    #[error("No fallback channel configured")]
    Disabled,
}

/// Errors applying a single keybinding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeybindingError {
    #[error("Invalid key combination '{0}'")]
    InvalidCombo(String),

    #[error("Settings store {op} failed for {path}: {message}")]
    Store {
        op: &'static str,
        path: String,
        message: String,
    },
}

/// Result type alias using DictypeError
pub type Result<T> = std::result::Result<T, DictypeError>;

impl From<std::io::Error> for LayoutQueryError {
    fn from(e: std::io::Error) -> Self {
        LayoutQueryError::Io(e.to_string())
    }
}
