//! Clipboard paste fallback
//!
//! Saves the current clipboard, puts the character on the clipboard,
//! presses Ctrl+V through the active injection session, then restores the
//! saved contents with their original MIME type. Restoration happens on
//! every exit path; if the future is dropped midway, the guard restores
//! synchronously. A clipboard that cannot be read is never touched.
//!
//! Requires: wl-clipboard package installed

use super::{command_exists, FallbackChannel};
use crate::error::FallbackError;
use crate::inject::InjectionSession;
use crate::keymap::{Keypress, ModifierSet, PhysicalKey};
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Types a text selection may be offered as, most useful first
const TEXT_TYPES: &[&str] = &["text/plain;charset=utf-8", "text/plain", "UTF8_STRING"];

/// Clipboard contents taken before a paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedClipboard {
    /// Nothing was copied
    Empty,
    Contents { mime: String, data: Vec<u8> },
}

/// Access to the system clipboard
#[async_trait::async_trait]
pub trait ClipboardBackend: Send + Sync {
    /// Read the current selection. `Empty` means nothing is copied; a
    /// clipboard that cannot be read is an error.
    async fn save(&self) -> Result<SavedClipboard, FallbackError>;

    /// Replace the selection with plain text
    async fn set_text(&self, text: &str) -> Result<(), FallbackError>;

    /// Put saved contents back, clearing the selection if it was empty
    async fn restore(&self, saved: &SavedClipboard) -> Result<(), FallbackError>;

    /// Same as [`restore`](Self::restore), without an async runtime
    fn restore_blocking(&self, saved: &SavedClipboard) -> std::io::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

pub struct ClipboardFallback {
    /// Wait after setting the clipboard and after pasting
    paste_delay: Duration,
    backend: Box<dyn ClipboardBackend>,
}

impl ClipboardFallback {
    pub fn new(paste_delay_ms: u32) -> Self {
        Self::with_backend(paste_delay_ms, Box::new(WlClipboard))
    }

    pub fn with_backend(paste_delay_ms: u32, backend: Box<dyn ClipboardBackend>) -> Self {
        Self {
            paste_delay: Duration::from_millis(paste_delay_ms as u64),
            backend,
        }
    }

    async fn paste(
        &self,
        ch: char,
        session: &mut InjectionSession<'_>,
    ) -> Result<(), FallbackError> {
        self.backend.set_text(&ch.to_string()).await?;
        tokio::time::sleep(self.paste_delay).await;

        let paste = Keypress {
            key: session.paste_key(),
            modifiers: ModifierSet::None,
        };
        session.tap_with(&[PhysicalKey::LEFT_CTRL], paste).await?;

        // Let the target read the clipboard before it is restored
        tokio::time::sleep(self.paste_delay).await;
        Ok(())
    }
}

/// Prior clipboard contents, restored when the paste is over
struct ClipboardGuard<'a> {
    backend: &'a dyn ClipboardBackend,
    saved: Option<SavedClipboard>,
}

impl<'a> ClipboardGuard<'a> {
    async fn acquire(backend: &'a dyn ClipboardBackend) -> Result<Self, FallbackError> {
        let saved = backend.save().await?;
        Ok(Self {
            backend,
            saved: Some(saved),
        })
    }

    async fn restore(mut self) -> Result<(), FallbackError> {
        match self.saved.take() {
            Some(saved) => self.backend.restore(&saved).await,
            None => Ok(()),
        }
    }
}

impl Drop for ClipboardGuard<'_> {
    fn drop(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        tracing::debug!("Restoring clipboard after interrupted paste");
        if let Err(e) = self.backend.restore_blocking(&saved) {
            tracing::warn!("Failed to restore clipboard: {}", e);
        }
    }
}

/// Wayland clipboard through wl-paste / wl-copy
pub struct WlClipboard;

#[async_trait::async_trait]
impl ClipboardBackend for WlClipboard {
    async fn save(&self) -> Result<SavedClipboard, FallbackError> {
        let listed = Command::new("wl-paste")
            .arg("--list-types")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error("wl-paste", e))?;

        if !listed.status.success() {
            let stderr = String::from_utf8_lossy(&listed.stderr);
            if is_empty_selection(&stderr) {
                return Ok(SavedClipboard::Empty);
            }
            return Err(FallbackError::Clipboard(format!(
                "cannot read clipboard: {}",
                stderr.trim()
            )));
        }

        let Some(mime) = preferred_type(&String::from_utf8_lossy(&listed.stdout)) else {
            return Ok(SavedClipboard::Empty);
        };

        let output = Command::new("wl-paste")
            .args(["--no-newline", "--type", mime.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error("wl-paste", e))?;

        if !output.status.success() {
            return Err(FallbackError::Clipboard(format!(
                "cannot read clipboard as {}: {}",
                mime,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(SavedClipboard::Contents {
            mime,
            data: output.stdout,
        })
    }

    async fn set_text(&self, text: &str) -> Result<(), FallbackError> {
        wl_copy(None, text.as_bytes()).await
    }

    async fn restore(&self, saved: &SavedClipboard) -> Result<(), FallbackError> {
        match saved {
            SavedClipboard::Contents { mime, data } => wl_copy(Some(mime.as_str()), data).await,
            SavedClipboard::Empty => {
                let status = Command::new("wl-copy")
                    .arg("--clear")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .map_err(|e| spawn_error("wl-copy", e))?;
                if !status.success() {
                    return Err(FallbackError::Clipboard(
                        "wl-copy --clear exited with error".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn restore_blocking(&self, saved: &SavedClipboard) -> std::io::Result<()> {
        match saved {
            SavedClipboard::Contents { mime, data } => std::process::Command::new("wl-copy")
                .args(["--type", mime.as_str()])
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .and_then(|mut child| {
                    if let Some(mut stdin) = child.stdin.take() {
                        stdin.write_all(data)?;
                    }
                    child.wait().map(|_| ())
                }),
            SavedClipboard::Empty => std::process::Command::new("wl-copy")
                .arg("--clear")
                .status()
                .map(|_| ()),
        }
    }

    fn name(&self) -> &'static str {
        "wl-clipboard"
    }
}

async fn wl_copy(mime: Option<&str>, contents: &[u8]) -> Result<(), FallbackError> {
    let mut command = Command::new("wl-copy");
    if let Some(mime) = mime {
        command.args(["--type", mime]);
    }
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error("wl-copy", e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(contents)
            .await
            .map_err(|e| FallbackError::Clipboard(e.to_string()))?;
        // Close stdin to signal EOF
        drop(stdin);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| FallbackError::Clipboard(e.to_string()))?;
    if !status.success() {
        return Err(FallbackError::Clipboard(
            "wl-copy exited with error".to_string(),
        ));
    }
    Ok(())
}

/// wl-paste exits non-zero with one of these when nothing is copied
fn is_empty_selection(stderr: &str) -> bool {
    stderr.contains("Nothing is copied") || stderr.contains("No selection")
}

/// Type to save the selection as: plain text when offered, otherwise the
/// source's first type
fn preferred_type(listed: &str) -> Option<String> {
    let types: Vec<&str> = listed
        .lines()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    TEXT_TYPES
        .iter()
        .find(|t| types.contains(*t))
        .or_else(|| types.first())
        .map(|t| t.to_string())
}

fn spawn_error(tool: &str, e: std::io::Error) -> FallbackError {
    if e.kind() == std::io::ErrorKind::NotFound {
        FallbackError::ToolNotFound(tool.to_string())
    } else {
        FallbackError::Clipboard(format!("{}: {}", tool, e))
    }
}

#[async_trait::async_trait]
impl FallbackChannel for ClipboardFallback {
    async fn send(
        &self,
        ch: char,
        session: &mut InjectionSession<'_>,
    ) -> Result<(), FallbackError> {
        let guard = ClipboardGuard::acquire(self.backend.as_ref()).await?;
        let pasted = self.paste(ch, session).await;
        let restored = guard.restore().await;

        if let Err(ref e) = restored {
            tracing::warn!("Failed to restore clipboard: {}", e);
        }
        pasted?;
        restored?;
        tracing::debug!("Pasted {:?} via {}", ch, self.backend.name());
        Ok(())
    }

    async fn is_available(&self) -> bool {
        command_exists("wl-copy") && command_exists("wl-paste")
    }

    fn name(&self) -> &'static str {
        "clipboard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SendError;
    use crate::inject::{CancelFlag, KeyDirection, KeyEvent, KeyEventSink};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct ClipboardState {
        current: Option<SavedClipboard>,
        unreadable: bool,
        /// Text on the clipboard when each Ctrl+V went down
        pasted: Vec<String>,
        writes: usize,
    }

    #[derive(Clone, Default)]
    struct MemoryClipboard(Arc<Mutex<ClipboardState>>);

    impl MemoryClipboard {
        fn holding(saved: SavedClipboard) -> Self {
            let clipboard = Self::default();
            clipboard.0.lock().unwrap().current = Some(saved);
            clipboard
        }

        fn current(&self) -> Option<SavedClipboard> {
            self.0.lock().unwrap().current.clone()
        }
    }

    #[async_trait::async_trait]
    impl ClipboardBackend for MemoryClipboard {
        async fn save(&self) -> Result<SavedClipboard, FallbackError> {
            let state = self.0.lock().unwrap();
            if state.unreadable {
                return Err(FallbackError::Clipboard(
                    "Failed to connect to a Wayland server".to_string(),
                ));
            }
            Ok(state.current.clone().unwrap_or(SavedClipboard::Empty))
        }

        async fn set_text(&self, text: &str) -> Result<(), FallbackError> {
            let mut state = self.0.lock().unwrap();
            state.writes += 1;
            state.current = Some(SavedClipboard::Contents {
                mime: "text/plain;charset=utf-8".to_string(),
                data: text.as_bytes().to_vec(),
            });
            Ok(())
        }

        async fn restore(&self, saved: &SavedClipboard) -> Result<(), FallbackError> {
            self.restore_blocking(saved)
                .map_err(|e| FallbackError::Clipboard(e.to_string()))
        }

        fn restore_blocking(&self, saved: &SavedClipboard) -> std::io::Result<()> {
            let mut state = self.0.lock().unwrap();
            state.writes += 1;
            state.current = Some(saved.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    /// Keyboard that notes what the clipboard held at each paste
    struct PasteRecorder {
        clipboard: MemoryClipboard,
        ctrl_down: bool,
        fail: Option<SendError>,
        events: usize,
    }

    #[async_trait::async_trait]
    impl KeyEventSink for PasteRecorder {
        async fn send(&mut self, event: KeyEvent) -> Result<(), SendError> {
            if event.direction == KeyDirection::Press && event.key != PhysicalKey::LEFT_CTRL {
                if let Some(e) = self.fail.take() {
                    return Err(e);
                }
            }
            self.events += 1;
            let pressed = event.direction == KeyDirection::Press;
            if event.key == PhysicalKey::LEFT_CTRL {
                self.ctrl_down = pressed;
            } else if pressed && self.ctrl_down {
                let mut state = self.clipboard.0.lock().unwrap();
                if let Some(SavedClipboard::Contents { data, .. }) = state.current.clone() {
                    state.pasted.push(String::from_utf8_lossy(&data).to_string());
                }
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "paste-recorder"
        }
    }

    fn keyboard(clipboard: &MemoryClipboard) -> PasteRecorder {
        PasteRecorder {
            clipboard: clipboard.clone(),
            ctrl_down: false,
            fail: None,
            events: 0,
        }
    }

    async fn paste_with(
        clipboard: &MemoryClipboard,
        keys: &mut PasteRecorder,
        ch: char,
    ) -> Result<(), FallbackError> {
        let fallback = ClipboardFallback::with_backend(0, Box::new(clipboard.clone()));
        let mut session = InjectionSession::new(keys, CancelFlag::new(), false, PhysicalKey::V);
        let result = fallback.send(ch, &mut session).await;
        session.release_all().await;
        result
    }

    fn image() -> SavedClipboard {
        SavedClipboard::Contents {
            mime: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn test_prior_contents_restored_after_paste() {
        let clipboard = MemoryClipboard::holding(image());
        let mut keys = keyboard(&clipboard);

        paste_with(&clipboard, &mut keys, '€').await.unwrap();

        assert_eq!(clipboard.0.lock().unwrap().pasted, vec!["€".to_string()]);
        assert_eq!(clipboard.current(), Some(image()));
    }

    #[tokio::test]
    async fn test_prior_contents_restored_when_paste_fails() {
        let clipboard = MemoryClipboard::holding(image());
        let mut keys = keyboard(&clipboard);
        keys.fail = Some(SendError::target_gone("device removed"));

        let result = paste_with(&clipboard, &mut keys, '€').await;

        assert!(matches!(result, Err(FallbackError::Send(_))));
        assert_eq!(clipboard.current(), Some(image()));
    }

    #[tokio::test]
    async fn test_empty_clipboard_left_empty() {
        let clipboard = MemoryClipboard::holding(SavedClipboard::Empty);
        let mut keys = keyboard(&clipboard);

        paste_with(&clipboard, &mut keys, 'Ω').await.unwrap();

        assert_eq!(clipboard.current(), Some(SavedClipboard::Empty));
    }

    #[tokio::test]
    async fn test_unreadable_clipboard_is_not_touched() {
        let clipboard = MemoryClipboard::holding(image());
        clipboard.0.lock().unwrap().unreadable = true;
        let mut keys = keyboard(&clipboard);

        let result = paste_with(&clipboard, &mut keys, '€').await;

        assert!(matches!(result, Err(FallbackError::Clipboard(_))));
        assert_eq!(clipboard.0.lock().unwrap().writes, 0);
        assert_eq!(clipboard.current(), Some(image()));
        assert_eq!(keys.events, 0);
    }

    #[test]
    fn test_dropped_guard_restores() {
        let clipboard = MemoryClipboard::holding(image());
        {
            let _guard = ClipboardGuard {
                backend: &clipboard,
                saved: Some(image()),
            };
            clipboard.0.lock().unwrap().current = None;
        }
        assert_eq!(clipboard.current(), Some(image()));
    }

    #[test]
    fn test_preferred_type() {
        let listed = "text/html\ntext/plain;charset=utf-8\nUTF8_STRING\n";
        assert_eq!(
            preferred_type(listed).as_deref(),
            Some("text/plain;charset=utf-8")
        );
        assert_eq!(preferred_type("image/png\nimage/bmp\n").as_deref(), Some("image/png"));
        assert_eq!(preferred_type("\n"), None);
    }

    #[test]
    fn test_empty_selection_told_apart_from_failure() {
        assert!(is_empty_selection("Nothing is copied\n"));
        assert!(!is_empty_selection("Failed to connect to a Wayland server\n"));
    }

    #[test]
    fn test_new() {
        let fallback = ClipboardFallback::new(75);
        assert_eq!(fallback.paste_delay, Duration::from_millis(75));
        assert_eq!(fallback.backend.name(), "wl-clipboard");
    }
}
