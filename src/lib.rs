//! Dictype: layout-aware text injection for dictation on Linux
//!
//! This library provides the core functionality for:
//! - Detecting the active keyboard layout (GNOME input sources, setxkbmap)
//! - Building a character → keystroke map from the compiled XKB keymap,
//!   including dead-key compositions
//! - Translating text into per-character injection steps
//! - Emitting key events through uinput or ydotool, with nothing left held
//!   after a failure
//! - Delivering unmappable characters via wtype or the clipboard
//! - Registering dictation hotkeys as GNOME custom keybindings
//!
//! # Architecture
//!
//! ```text
//!          ┌──────────────┐        ┌──────────────┐
//!          │ LayoutSource │ ─────▶ │   symbols    │  raw keysyms → CharacterMap
//!          │ (xkb tools)  │        │   (build)    │
//!          └──────────────┘        └──────────────┘
//!                                         │
//!                                         ▼
//!                                  ┌──────────────┐
//!                                  │ LayoutCache  │  one build per layout
//!                                  └──────────────┘
//!                                         │
//!                                         ▼ CharacterMap
//!                                  ┌──────────────┐
//!                      text ─────▶ │  translate   │
//!                                  └──────────────┘
//!                                         │
//!                                         ▼ InjectionSteps
//!                                  ┌──────────────┐
//!                                  │   Injector   │ ──▶ KeyEventSink (uinput/ydotool)
//!                                  └──────────────┘
//!                                         │
//!                                         ▼ unmappable characters
//!                                  ┌──────────────┐
//!                                  │   Fallback   │  wtype / clipboard paste
//!                                  └──────────────┘
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod inject;
pub mod keybinding;
pub mod keymap;
pub mod layout;
pub mod notification;
pub mod symbols;
pub mod translate;

pub use cli::{BindingsAction, Cli, Commands};
pub use config::Config;
pub use engine::{LayoutResolver, TypingEngine};
pub use error::{DictypeError, Result};
