//! State of one in-flight injection
//!
//! Every key pressed through a session is tracked until released, so
//! [`InjectionSession::release_all`] can always return the keyboard to a
//! state with nothing held, whatever happened in between.

use super::{KeyDirection, KeyEvent, KeyEventSink};
use crate::error::{SendError, SendErrorKind};
use crate::keymap::{Keypress, ModifierSet, PhysicalKey};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation signal checked between steps
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The single active injection. Only the injector creates one, while it
/// holds exclusive access to the key event sink.
pub struct InjectionSession<'s> {
    sink: &'s mut dyn KeyEventSink,
    /// Keys currently held, in press order
    held: Vec<PhysicalKey>,
    step: usize,
    cancel: CancelFlag,
    retry_transient: bool,
    paste_key: PhysicalKey,
}

impl<'s> InjectionSession<'s> {
    pub(crate) fn new(
        sink: &'s mut dyn KeyEventSink,
        cancel: CancelFlag,
        retry_transient: bool,
        paste_key: PhysicalKey,
    ) -> Self {
        Self {
            sink,
            held: Vec::new(),
            step: 0,
            cancel,
            retry_transient,
            paste_key,
        }
    }

    pub fn step_index(&self) -> usize {
        self.step
    }

    pub(crate) fn set_step(&mut self, step: usize) {
        self.step = step;
    }

    pub fn held(&self) -> &[PhysicalKey] {
        &self.held
    }

    pub fn modifiers_held(&self) -> bool {
        self.held.iter().any(|k| k.is_modifier())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn supports(&self, key: PhysicalKey) -> bool {
        self.sink.supports(key)
    }

    /// Physical key producing `v` on the active layout, for Ctrl+V
    pub fn paste_key(&self) -> PhysicalKey {
        self.paste_key
    }

    async fn send(&mut self, event: KeyEvent) -> Result<(), SendError> {
        match self.sink.send(event).await {
            Err(e) if e.kind == SendErrorKind::Transient && self.retry_transient => {
                tracing::debug!("Transient send failure ({}), retrying once", e);
                self.sink.send(event).await
            }
            other => other,
        }
    }

    pub async fn press(&mut self, key: PhysicalKey) -> Result<(), SendError> {
        // Tracked before sending: a failed press may still have reached the OS
        if !self.held.contains(&key) {
            self.held.push(key);
        }
        self.send(KeyEvent {
            key,
            direction: KeyDirection::Press,
        })
        .await
    }

    pub async fn release(&mut self, key: PhysicalKey) -> Result<(), SendError> {
        self.send(KeyEvent {
            key,
            direction: KeyDirection::Release,
        })
        .await?;
        self.held.retain(|k| *k != key);
        Ok(())
    }

    /// Press modifiers in their fixed order (Shift before AltGr)
    pub async fn press_modifiers(&mut self, modifiers: ModifierSet) -> Result<(), SendError> {
        for key in modifiers.keys() {
            self.press(*key).await?;
        }
        Ok(())
    }

    /// Release modifiers in reverse press order
    pub async fn release_modifiers(&mut self, modifiers: ModifierSet) -> Result<(), SendError> {
        for key in modifiers.keys().iter().rev() {
            self.release(*key).await?;
        }
        Ok(())
    }

    /// Press and release a key with optional extra held keys (e.g. Ctrl)
    pub async fn tap_with(
        &mut self,
        hold: &[PhysicalKey],
        press: Keypress,
    ) -> Result<(), SendError> {
        for key in hold {
            self.press(*key).await?;
        }
        self.press_modifiers(press.modifiers).await?;
        self.press(press.key).await?;
        self.release(press.key).await?;
        self.release_modifiers(press.modifiers).await?;
        for key in hold.iter().rev() {
            self.release(*key).await?;
        }
        Ok(())
    }

    /// Release every held key, most recently pressed first. Each release is
    /// attempted twice before it is given up on.
    pub async fn release_all(&mut self) {
        while let Some(key) = self.held.last().copied() {
            let event = KeyEvent {
                key,
                direction: KeyDirection::Release,
            };
            let mut result = self.sink.send(event).await;
            if result.is_err() {
                result = self.sink.send(event).await;
            }
            if let Err(e) = result {
                tracing::error!("Failed to release {} during cleanup: {}", key, e);
            }
            self.held.pop();
        }
    }
}
