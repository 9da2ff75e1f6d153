//! ydotool-based key events
//!
//! Sends each key event as one `ydotool key <code>:<state>` call. ydotool
//! drives its own uinput device through the ydotoold daemon, which is useful
//! when the user cannot open /dev/uinput directly.
//!
//! Requires:
//! - ydotool installed
//! - ydotoold daemon running (systemctl --user start ydotool)

use super::{KeyDirection, KeyEvent, KeyEventSink};
use crate::error::{InjectionError, SendError};
use std::process::Stdio;
use tokio::process::Command;

pub struct YdotoolSink;

impl YdotoolSink {
    pub fn new() -> Result<Self, InjectionError> {
        which::which("ydotool").map_err(|_| {
            InjectionError::DeviceSetup("ydotool not found in PATH".to_string())
        })?;
        Ok(Self)
    }
}

/// `ydotool key` argument for one event
fn key_arg(event: KeyEvent) -> String {
    let state = match event.direction {
        KeyDirection::Press => 1,
        KeyDirection::Release => 0,
    };
    format!("{}:{}", event.key.code(), state)
}

/// Map ydotool's stderr to a send error kind
fn classify_failure(stderr: &str) -> SendError {
    if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon") {
        SendError::target_gone(InjectionError::YdotoolNotRunning.to_string())
    } else {
        SendError::transient(stderr.trim().to_string())
    }
}

#[async_trait::async_trait]
impl KeyEventSink for YdotoolSink {
    async fn send(&mut self, event: KeyEvent) -> Result<(), SendError> {
        let output = Command::new("ydotool")
            .arg("key")
            .arg(key_arg(event))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SendError::target_gone("ydotool not found in PATH")
                } else {
                    SendError::transient(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ydotool"
    }
}
