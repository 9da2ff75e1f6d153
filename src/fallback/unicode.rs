//! Direct code-point injection via wtype
//!
//! wtype uploads a temporary keymap containing the character, so any Unicode
//! scalar value can be produced regardless of the active layout.
//!
//! Requires:
//! - wtype installed
//! - Running on Wayland (WAYLAND_DISPLAY set)

use super::{command_exists, FallbackChannel};
use crate::error::FallbackError;
use crate::inject::InjectionSession;
use std::process::Stdio;
use tokio::process::Command;

pub struct UnicodeFallback;

impl UnicodeFallback {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnicodeFallback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FallbackChannel for UnicodeFallback {
    async fn send(
        &self,
        ch: char,
        _session: &mut InjectionSession<'_>,
    ) -> Result<(), FallbackError> {
        // The -- ensures a '-' isn't treated as an option
        let output = Command::new("wtype")
            .arg("--")
            .arg(ch.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FallbackError::ToolNotFound("wtype".to_string())
                } else {
                    FallbackError::Failed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FallbackError::Failed(format!("wtype: {}", stderr.trim())));
        }

        tracing::debug!("Sent {:?} via wtype", ch);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        std::env::var("WAYLAND_DISPLAY").is_ok() && command_exists("wtype")
    }

    fn name(&self) -> &'static str {
        "unicode (wtype)"
    }
}
