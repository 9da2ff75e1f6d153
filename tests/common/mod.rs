//! Shared helpers for integration tests: compiled keymap fixtures, a
//! simulated keyboard that turns key events back into text, and a fallback
//! channel that writes into the same text buffer.

#![allow(dead_code)]

use dictype::error::{FallbackError, LayoutQueryError, SendError};
use dictype::fallback::FallbackChannel;
use dictype::inject::{InjectionSession, KeyDirection, KeyEvent, KeyEventSink};
use dictype::keymap::compose::DeadKey;
use dictype::keymap::keysym::Keysym;
use dictype::keymap::{CharacterMap, LayoutIdentifier, ModifierSet, PhysicalKey};
use dictype::layout::{xkbcomp, LayoutSource, RawSymbolData};
use dictype::symbols;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Path to compiled keymap fixtures (`xkbcomp -xkb $DISPLAY -` output)
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/xkb")
}

pub fn read_fixture(layout: &str) -> String {
    let path = fixtures_dir().join(format!("{}.xkb", layout));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Parse a fixture keymap (first group)
pub fn load_raw(layout: &str) -> RawSymbolData {
    xkbcomp::parse_keymap(&read_fixture(layout), 0)
        .unwrap_or_else(|e| panic!("Failed to parse {}.xkb: {}", layout, e))
}

/// Parse a fixture keymap and build its character map
pub fn load_map(layout: &str) -> (CharacterMap, Arc<RawSymbolData>) {
    let raw = load_raw(layout);
    let map = symbols::build(LayoutIdentifier::new(layout, "", 0), &raw);
    (map, Arc::new(raw))
}

/// Characters the map can type, sorted for deterministic sampling
pub fn typeable_chars(map: &CharacterMap) -> Vec<char> {
    let mut chars: Vec<char> = map.chars().collect();
    chars.sort_unstable();
    chars
}

/// Failure to inject into the simulated keyboard
#[derive(Debug, Clone)]
pub enum Fault {
    /// The n-th event sent (zero-based) fails once with this error
    AtEvent(usize, SendError),
    /// The keyboard does not support this key: it says so up front, and
    /// every press of it fails as unavailable
    Unavailable(PhysicalKey),
}

#[derive(Debug, Default)]
pub struct KeyboardState {
    /// Keys the simulated OS considers held
    pub held: HashSet<PhysicalKey>,
    pending_dead: Option<DeadKey>,
    /// Text the focused application received
    pub output: String,
    /// Every event accepted by the keyboard
    pub events: Vec<KeyEvent>,
    /// Events offered, including rejected ones
    pub offered: usize,
    /// Characters delivered through the fallback channel
    pub fallback_chars: Vec<char>,
    /// Paste shortcuts seen (Ctrl held while another key went down)
    pub pastes: usize,
}

/// Keyboard that applies XKB level rules and dead-key composition to the
/// events it receives, the way a compositor would
#[derive(Clone)]
pub struct SimulatedKeyboard {
    raw: Arc<RawSymbolData>,
    state: Arc<Mutex<KeyboardState>>,
    faults: Arc<Mutex<Vec<Fault>>>,
}

impl SimulatedKeyboard {
    pub fn new(raw: Arc<RawSymbolData>) -> Self {
        Self {
            raw,
            state: Arc::new(Mutex::new(KeyboardState::default())),
            faults: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_fault(self, fault: Fault) -> Self {
        self.faults.lock().unwrap().push(fault);
        self
    }

    pub fn output(&self) -> String {
        self.state.lock().unwrap().output.clone()
    }

    pub fn held(&self) -> Vec<PhysicalKey> {
        let mut held: Vec<_> = self.state.lock().unwrap().held.iter().copied().collect();
        held.sort();
        held
    }

    pub fn events(&self) -> Vec<KeyEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn fallback_chars(&self) -> Vec<char> {
        self.state.lock().unwrap().fallback_chars.clone()
    }

    pub fn pastes(&self) -> usize {
        self.state.lock().unwrap().pastes
    }

    /// A fallback channel writing into this keyboard's output
    pub fn fallback(&self) -> RecordingFallback {
        RecordingFallback {
            state: Arc::clone(&self.state),
        }
    }

    fn check_faults(&self, index: usize, event: KeyEvent) -> Result<(), SendError> {
        let mut faults = self.faults.lock().unwrap();
        let hit = faults.iter().position(|fault| match fault {
            Fault::AtEvent(at, _) => *at == index,
            Fault::Unavailable(key) => {
                *key == event.key && event.direction == KeyDirection::Press
            }
        });
        match hit.map(|i| &faults[i]) {
            Some(Fault::AtEvent(_, e)) => {
                let e = e.clone();
                faults.retain(|f| !matches!(f, Fault::AtEvent(at, _) if *at == index));
                Err(e)
            }
            Some(Fault::Unavailable(key)) => {
                Err(SendError::key_unavailable(format!("{} not on device", key)))
            }
            None => Ok(()),
        }
    }

    fn apply(&self, state: &mut KeyboardState, event: KeyEvent) {
        state.events.push(event);
        if event.direction == KeyDirection::Release {
            state.held.remove(&event.key);
            return;
        }

        state.held.insert(event.key);
        if event.key.is_modifier() {
            return;
        }
        if state.held.contains(&PhysicalKey::LEFT_CTRL) {
            state.pastes += 1;
            return;
        }

        let level = ModifierSet::from_held(
            state.held.contains(&PhysicalKey::LEFT_SHIFT),
            state.held.contains(&PhysicalKey::RIGHT_ALT),
        );
        let symbol = self
            .raw
            .key(event.key)
            .map_or(Keysym::NoSymbol, |k| k.symbol(level));

        match (symbol, state.pending_dead.take()) {
            (Keysym::Dead(dead), Some(pending)) if dead == pending => {
                if let Some(accent) = dead.doubled() {
                    state.output.push(accent);
                }
            }
            (Keysym::Dead(dead), _) => state.pending_dead = Some(dead),
            (Keysym::Char(c), Some(pending)) => {
                state.output.push(pending.compose(c).unwrap_or(c));
            }
            (Keysym::Char(c), None) => state.output.push(c),
            (Keysym::NoSymbol, pending) => state.pending_dead = pending,
        }
    }
}

#[async_trait::async_trait]
impl KeyEventSink for SimulatedKeyboard {
    async fn send(&mut self, event: KeyEvent) -> Result<(), SendError> {
        let index = {
            let mut state = self.state.lock().unwrap();
            state.offered += 1;
            state.offered - 1
        };
        self.check_faults(index, event)?;

        let mut state = self.state.lock().unwrap();
        self.apply(&mut state, event);
        Ok(())
    }

    fn supports(&self, key: PhysicalKey) -> bool {
        !self
            .faults
            .lock()
            .unwrap()
            .iter()
            .any(|f| matches!(f, Fault::Unavailable(k) if *k == key))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Fallback that writes characters straight into the simulated output
pub struct RecordingFallback {
    state: Arc<Mutex<KeyboardState>>,
}

#[async_trait::async_trait]
impl FallbackChannel for RecordingFallback {
    async fn send(
        &self,
        ch: char,
        _session: &mut InjectionSession<'_>,
    ) -> Result<(), FallbackError> {
        let mut state = self.state.lock().unwrap();
        state.output.push(ch);
        state.fallback_chars.push(ch);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Layout source serving fixture keymaps; the active layout can be switched
/// between requests, or made undetectable
pub struct FixtureSource {
    active: Mutex<Option<LayoutIdentifier>>,
}

impl FixtureSource {
    pub fn new(layout: &str) -> Self {
        Self {
            active: Mutex::new(Some(LayoutIdentifier::new(layout, "", 0))),
        }
    }

    pub fn switch_to(&self, layout: Option<&str>) {
        *self.active.lock().unwrap() = layout.map(|l| LayoutIdentifier::new(l, "", 0));
    }
}

#[async_trait::async_trait]
impl LayoutSource for FixtureSource {
    async fn current_identifier(&self) -> Result<LayoutIdentifier, LayoutQueryError> {
        self.active.lock().unwrap().clone().ok_or_else(|| {
            LayoutQueryError::CommandFailed {
                tool: "setxkbmap".to_string(),
                stderr: "Cannot open display".to_string(),
            }
        })
    }

    async fn raw_symbol_table(
        &self,
        id: &LayoutIdentifier,
    ) -> Result<RawSymbolData, LayoutQueryError> {
        let path = fixtures_dir().join(format!("{}.xkb", id.layout));
        let text = std::fs::read_to_string(&path)
            .map_err(|e| LayoutQueryError::Io(format!("{}: {}", path.display(), e)))?;
        xkbcomp::parse_keymap(&text, id.group_index)
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
