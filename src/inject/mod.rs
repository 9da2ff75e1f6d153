//! Key event injection
//!
//! Drives the OS input subsystem through a [`KeyEventSink`]:
//! - uinput - virtual keyboard via /dev/uinput, no daemon needed
//! - ydotool - one `ydotool key` call per event, requires ydotoold
//!
//! Each keystroke walks a small state machine
//! (Idle → PrefixDown → KeyDown → Releasing → Done, or Failed), and every
//! step ends with nothing held, whether it succeeded or not.

pub mod report;
pub mod session;
#[cfg(target_os = "linux")]
pub mod uinput;
pub mod ydotool;

pub use report::{InjectionReport, StepOutcome, StepRecord};
pub use session::{CancelFlag, InjectionSession};

use crate::config::{InjectionBackend, InjectionConfig};
use crate::error::{FallbackError, InjectionError, SendError, SendErrorKind};
use crate::fallback::FallbackChannel;
use crate::keymap::{CharacterMap, KeystrokeSpec, ModifierSet, PhysicalKey};
use crate::translate::InjectionStep;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Press,
    Release,
}

/// A single key-down or key-up event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: PhysicalKey,
    pub direction: KeyDirection,
}

/// Trait for OS-level key event delivery
#[async_trait::async_trait]
pub trait KeyEventSink: Send {
    /// Deliver one key event
    async fn send(&mut self, event: KeyEvent) -> Result<(), SendError>;

    /// Whether this sink can produce the key at all. Routes through keys it
    /// cannot produce are skipped before any of their events are sent.
    fn supports(&self, _key: PhysicalKey) -> bool {
        true
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function that returns the configured key event sink
pub async fn create_sink(
    config: &InjectionConfig,
) -> Result<Box<dyn KeyEventSink>, InjectionError> {
    match config.backend {
        #[cfg(target_os = "linux")]
        InjectionBackend::Uinput => {
            let sink = uinput::UinputSink::new()?;
            // Give the compositor time to pick up the new device
            tokio::time::sleep(Duration::from_millis(uinput::SETTLE_MS)).await;
            Ok(Box::new(sink))
        }
        #[cfg(not(target_os = "linux"))]
        InjectionBackend::Uinput => Err(InjectionError::DeviceSetup(
            "uinput is only available on Linux".to_string(),
        )),
        InjectionBackend::Ydotool => Ok(Box::new(ydotool::YdotoolSink::new()?)),
    }
}

/// Progress of one keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystrokeState {
    Idle,
    PrefixDown,
    KeyDown,
    Releasing,
    Done,
    Failed,
}

/// Injector tuning
#[derive(Debug, Clone, Default)]
pub struct InjectorOptions {
    /// Pause between steps; zero in tests
    pub type_delay: Duration,
    /// Pause before the first step
    pub pre_type_delay: Duration,
    /// Retry a transient send failure once before giving up
    pub retry_transient: bool,
}

impl From<&InjectionConfig> for InjectorOptions {
    fn from(config: &InjectionConfig) -> Self {
        Self {
            type_delay: Duration::from_millis(config.type_delay_ms as u64),
            pre_type_delay: Duration::from_millis(config.pre_type_delay_ms as u64),
            retry_transient: config.retry_transient,
        }
    }
}

/// Emits injection steps. Owns the key event sink; at most one session can
/// use it at a time.
pub struct Injector {
    sink: Mutex<Box<dyn KeyEventSink>>,
    fallback: Box<dyn FallbackChannel>,
    options: InjectorOptions,
}

impl Injector {
    pub fn new(
        sink: Box<dyn KeyEventSink>,
        fallback: Box<dyn FallbackChannel>,
        options: InjectorOptions,
    ) -> Self {
        Self {
            sink: Mutex::new(sink),
            fallback,
            options,
        }
    }

    pub fn fallback_name(&self) -> &'static str {
        self.fallback.name()
    }

    /// Inject the steps in order.
    ///
    /// Returns [`InjectionError::Busy`] without touching the keyboard if
    /// another session is active. Every other failure is recorded in the
    /// returned report.
    pub async fn inject(
        &self,
        steps: &[InjectionStep],
        map: Option<&CharacterMap>,
        cancel: &CancelFlag,
    ) -> Result<InjectionReport, InjectionError> {
        let mut sink = self.sink.try_lock().map_err(|_| InjectionError::Busy)?;
        let sink_name = sink.name();
        let mut session = InjectionSession::new(
            sink.as_mut(),
            cancel.clone(),
            self.options.retry_transient,
            paste_key(map),
        );
        let mut report = InjectionReport::pending(steps);
        report.layout = map.map(|m| m.identifier().clone());

        tracing::debug!(
            "Injecting {} steps via {} (fallback: {})",
            steps.len(),
            sink_name,
            self.fallback.name()
        );

        if !self.options.pre_type_delay.is_zero() && !steps.is_empty() {
            tokio::time::sleep(self.options.pre_type_delay).await;
        }

        for (index, step) in steps.iter().enumerate() {
            if session.is_cancelled() {
                session.release_all().await;
                tracing::info!("Injection cancelled before step {}", index + 1);
                report.fatal = Some(InjectionError::Cancelled);
                break;
            }

            session.set_step(index);
            let outcome = match *step {
                InjectionStep::Type { ch, stroke } => {
                    self.type_char(&mut session, ch, stroke, map).await
                }
                InjectionStep::Fallback(ch) => self.send_fallback(&mut session, ch).await,
            };
            // Nothing may stay held past a step
            session.release_all().await;

            let fatal = match outcome {
                StepOutcome::Failed(ref e) => Some(e.clone()),
                _ => None,
            };
            report.steps[index].outcome = outcome;

            if let Some(e) = fatal {
                tracing::warn!("Injection aborted at step {}: {}", index + 1, e);
                report.fatal = Some(InjectionError::Send(e));
                break;
            }

            if !self.options.type_delay.is_zero() && index + 1 < steps.len() {
                tokio::time::sleep(self.options.type_delay).await;
            }
        }

        tracing::info!("Injection finished: {}", report.summary());
        Ok(report)
    }

    /// Type one character, moving to the next candidate keystroke when a key
    /// is unavailable and to the fallback channel when none remain
    async fn type_char(
        &self,
        session: &mut InjectionSession<'_>,
        ch: char,
        preferred: KeystrokeSpec,
        map: Option<&CharacterMap>,
    ) -> StepOutcome {
        let alternates = map
            .and_then(|m| m.candidates(ch))
            .unwrap_or(&[])
            .iter()
            .filter(|c| **c != preferred)
            .copied();
        let candidates = std::iter::once(preferred).chain(alternates);

        for (attempt, stroke) in candidates.enumerate() {
            if let Some(key) = stroke_keys(stroke).find(|k| !session.supports(*k)) {
                tracing::debug!("{:?} via {} skipped: {} not supported", ch, stroke, key);
                continue;
            }
            match emit_keystroke(session, stroke).await {
                Ok(()) => {
                    return StepOutcome::Typed {
                        composed: stroke.is_composed(),
                        alternate: attempt > 0,
                    }
                }
                Err(e) if e.kind == SendErrorKind::KeyUnavailable => {
                    tracing::debug!("{:?} via {} unavailable: {}", ch, stroke, e);
                }
                Err(e) => return StepOutcome::Failed(e),
            }
        }

        tracing::debug!("No usable keystroke for {:?}, using fallback", ch);
        self.send_fallback(session, ch).await
    }

    async fn send_fallback(&self, session: &mut InjectionSession<'_>, ch: char) -> StepOutcome {
        match self.fallback.send(ch, session).await {
            Ok(()) => StepOutcome::Fallback,
            // A paste keystroke that lost the target ends the session like any other
            Err(FallbackError::Send(e)) if e.kind == SendErrorKind::TargetGone => {
                StepOutcome::Failed(e)
            }
            Err(e) => {
                tracing::warn!("Fallback {} failed for {:?}: {}", self.fallback.name(), ch, e);
                StepOutcome::FallbackFailed(e)
            }
        }
    }
}

/// Key for Ctrl+V: wherever `v` sits unshifted on the active layout
fn paste_key(map: Option<&CharacterMap>) -> PhysicalKey {
    map.and_then(|m| m.candidates('v'))
        .and_then(|c| {
            c.iter()
                .find(|s| !s.is_composed() && s.modifiers == ModifierSet::None)
        })
        .map(|s| s.key)
        .unwrap_or(PhysicalKey::V)
}

/// Every key a stroke presses, prefix first
fn stroke_keys(stroke: KeystrokeSpec) -> impl Iterator<Item = PhysicalKey> {
    let prefix = stroke
        .dead_key_prefix
        .into_iter()
        .flat_map(|p| p.modifiers.keys().iter().copied().chain(std::iter::once(p.key)));
    prefix
        .chain(stroke.modifiers.keys().iter().copied())
        .chain(std::iter::once(stroke.key))
}

/// Walk one keystroke through its states. On failure every held key is
/// released before the error is returned.
///
/// Once a dead-key prefix has gone down, an unavailable base key is reported
/// as [`SendErrorKind::DeadKeyPending`]: another route would compose with
/// the pending accent.
pub async fn emit_keystroke(
    session: &mut InjectionSession<'_>,
    stroke: KeystrokeSpec,
) -> Result<(), SendError> {
    let mut state = KeystrokeState::Idle;
    while state != KeystrokeState::Done {
        let next = match state {
            KeystrokeState::Idle => press_prefix(session, stroke)
                .await
                .map(|_| KeystrokeState::PrefixDown),
            KeystrokeState::PrefixDown => prefix_to_key(session, stroke)
                .await
                .map(|_| KeystrokeState::KeyDown),
            KeystrokeState::KeyDown => release_key(session, stroke)
                .await
                .map(|_| KeystrokeState::Releasing),
            KeystrokeState::Releasing | KeystrokeState::Done | KeystrokeState::Failed => {
                Ok(KeystrokeState::Done)
            }
        };

        match next {
            Ok(next) => {
                tracing::trace!("step {}: {:?} -> {:?}", session.step_index() + 1, state, next);
                state = next;
            }
            Err(e) => {
                tracing::trace!(
                    "step {}: {:?} -> {:?}: {}",
                    session.step_index() + 1,
                    state,
                    KeystrokeState::Failed,
                    e
                );
                session.release_all().await;
                let prefix_sent =
                    stroke.dead_key_prefix.is_some() && state != KeystrokeState::Idle;
                if prefix_sent && e.kind == SendErrorKind::KeyUnavailable {
                    return Err(SendError {
                        kind: SendErrorKind::DeadKeyPending,
                        message: format!("dead key sent without its base key: {}", e),
                    });
                }
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Press the dead-key prefix with its modifiers, if the stroke has one
async fn press_prefix(
    session: &mut InjectionSession<'_>,
    stroke: KeystrokeSpec,
) -> Result<(), SendError> {
    if let Some(prefix) = stroke.dead_key_prefix {
        session.press_modifiers(prefix.modifiers).await?;
        session.press(prefix.key).await?;
    }
    Ok(())
}

/// Release the dead-key prefix (if any), then press modifiers and the key
async fn prefix_to_key(
    session: &mut InjectionSession<'_>,
    stroke: KeystrokeSpec,
) -> Result<(), SendError> {
    if let Some(prefix) = stroke.dead_key_prefix {
        session.release(prefix.key).await?;
        session.release_modifiers(prefix.modifiers).await?;
    }
    session.press_modifiers(stroke.modifiers).await?;
    session.press(stroke.key).await
}

async fn release_key(
    session: &mut InjectionSession<'_>,
    stroke: KeystrokeSpec,
) -> Result<(), SendError> {
    session.release(stroke.key).await?;
    session.release_modifiers(stroke.modifiers).await
}
