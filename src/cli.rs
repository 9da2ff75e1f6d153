// Command-line interface definitions for dictype
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dictype")]
#[command(author, version, about = "Layout-aware text injection for dictation on Linux")]
#[command(long_about = "
Dictype types text into the focused application as real keystrokes for the
keyboard layout that is currently active, so dictated text comes out right
on AZERTY, QWERTZ and other non-US layouts. Characters the layout cannot
produce are delivered through a fallback (wtype or clipboard paste).

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Install xkb utilities (setxkbmap, xkbcomp) for layout detection
  4. Optional: install wtype or wl-clipboard for the fallback channel

USAGE:
  echo 'Grüße, café' | dictype type
  dictype layout --chars 'é€'
  dictype bindings apply
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Use this layout instead of detecting it (e.g. fr, de+nodeadkeys)
    #[arg(long, value_name = "LAYOUT")]
    pub layout: Option<String>,

    /// Key event backend (uinput, ydotool)
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Fallback for characters the layout cannot type (unicode, clipboard, none)
    #[arg(long, value_name = "STRATEGY")]
    pub fallback: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Type text into the focused window (reads stdin when TEXT is omitted)
    Type {
        /// Text to type
        text: Option<String>,
    },

    /// Show the active keyboard layout and how characters are typed on it
    Layout {
        /// Show the keystrokes for each of these characters
        #[arg(long, value_name = "TEXT")]
        chars: Option<String>,
    },

    /// Manage desktop hotkeys that trigger dictation
    Bindings {
        #[command(subcommand)]
        action: BindingsAction,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
pub enum BindingsAction {
    /// Replace this application's hotkeys with the configured set
    Apply,
    /// List registered hotkeys and dictation commands without one
    List,
}
