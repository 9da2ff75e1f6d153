//! Fallback delivery for characters the layout cannot type
//!
//! Two strategies:
//! - unicode - direct code-point injection via wtype (no keysym needed)
//! - clipboard - stash the character in the clipboard, paste, restore
//!
//! The clipboard strategy is a last resort: it briefly clobbers the
//! clipboard and is slower.

pub mod clipboard;
pub mod unicode;

use crate::config::{FallbackConfig, FallbackStrategy};
use crate::error::FallbackError;
use crate::inject::InjectionSession;

/// Trait for delivering single characters without a layout keystroke
#[async_trait::async_trait]
pub trait FallbackChannel: Send + Sync {
    /// Deliver one character. The session is available for strategies that
    /// need keystrokes of their own (e.g. Ctrl+V).
    async fn send(
        &self,
        ch: char,
        session: &mut InjectionSession<'_>,
    ) -> Result<(), FallbackError>;

    /// Check whether the required tools are installed
    async fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Fallback that refuses every character
pub struct NoFallback;

#[async_trait::async_trait]
impl FallbackChannel for NoFallback {
    async fn send(
        &self,
        _ch: char,
        _session: &mut InjectionSession<'_>,
    ) -> Result<(), FallbackError> {
        Err(FallbackError::Disabled)
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Factory function that returns the configured fallback channel
pub fn create_fallback(config: &FallbackConfig) -> Box<dyn FallbackChannel> {
    match config.strategy {
        FallbackStrategy::Unicode => Box::new(unicode::UnicodeFallback::new()),
        FallbackStrategy::Clipboard => {
            Box::new(clipboard::ClipboardFallback::new(config.paste_delay_ms))
        }
        FallbackStrategy::None => Box::new(NoFallback),
    }
}

/// Check if a command exists in PATH
pub(crate) fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fallback_names() {
        let mut config = FallbackConfig::default();
        config.strategy = FallbackStrategy::Clipboard;
        assert_eq!(create_fallback(&config).name(), "clipboard");
        config.strategy = FallbackStrategy::Unicode;
        assert_eq!(create_fallback(&config).name(), "unicode (wtype)");
        config.strategy = FallbackStrategy::None;
        assert_eq!(create_fallback(&config).name(), "none");
    }
}
