//! XKB layout source
//!
//! Detects the active layout via GNOME input sources (gsettings) or
//! `setxkbmap -query`, and obtains symbol tables by compiling the layout
//! with `setxkbmap -print | xkbcomp -xkb - -`.
//!
//! Requires:
//! - setxkbmap and xkbcomp installed (x11-xkb-utils / xkbcomp packages)
//! - gsettings for GNOME input source detection

use super::{xkbcomp, LayoutSource, RawSymbolData};
use crate::config::LayoutDetection;
use crate::error::LayoutQueryError;
use crate::keymap::LayoutIdentifier;
use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Layout source backed by the xkb command-line tools
pub struct XkbLayoutSource {
    /// How the active layout is detected
    detection: LayoutDetection,
    /// Layout forced by configuration, bypassing detection
    pinned: Option<LayoutIdentifier>,
}

impl XkbLayoutSource {
    /// Create a new xkb layout source
    pub fn new(detection: LayoutDetection, pinned: Option<LayoutIdentifier>) -> Self {
        Self { detection, pinned }
    }

    async fn detect_gnome(&self) -> Result<LayoutIdentifier, LayoutQueryError> {
        let sources = run(
            "gsettings",
            &["get", "org.gnome.desktop.input-sources", "sources"],
        )
        .await?;
        let sources = parse_gnome_sources(&sources);

        // The most recently used source is the active one
        let mru = run(
            "gsettings",
            &["get", "org.gnome.desktop.input-sources", "mru-sources"],
        )
        .await?;
        let current = match parse_gnome_sources(&mru).into_iter().next() {
            Some(spec) => spec,
            None => {
                let index = run(
                    "gsettings",
                    &["get", "org.gnome.desktop.input-sources", "current"],
                )
                .await?;
                let index = parse_gvariant_uint(&index).unwrap_or(0) as usize;
                sources.get(index).cloned().ok_or_else(|| {
                    LayoutQueryError::Malformed("no xkb input sources configured".to_string())
                })?
            }
        };

        let group_index = sources.iter().position(|s| *s == current).unwrap_or(0) as u32;
        LayoutIdentifier::parse(&current, group_index).ok_or_else(|| {
            LayoutQueryError::Malformed(format!("unrecognised input source '{}'", current))
        })
    }

    async fn detect_setxkbmap(&self) -> Result<LayoutIdentifier, LayoutQueryError> {
        let output = run("setxkbmap", &["-query"]).await?;
        parse_setxkbmap_query(&output).ok_or_else(|| {
            LayoutQueryError::Malformed("setxkbmap -query reported no layout".to_string())
        })
    }
}

#[async_trait::async_trait]
impl LayoutSource for XkbLayoutSource {
    async fn current_identifier(&self) -> Result<LayoutIdentifier, LayoutQueryError> {
        if let Some(ref pinned) = self.pinned {
            return Ok(pinned.clone());
        }

        match self.detection {
            LayoutDetection::Gnome => self.detect_gnome().await,
            LayoutDetection::Xkb => self.detect_setxkbmap().await,
            LayoutDetection::Auto => match self.detect_gnome().await {
                Ok(id) => Ok(id),
                Err(e) => {
                    tracing::debug!("GNOME layout detection failed ({}), trying setxkbmap", e);
                    self.detect_setxkbmap().await
                }
            },
        }
    }

    async fn raw_symbol_table(
        &self,
        id: &LayoutIdentifier,
    ) -> Result<RawSymbolData, LayoutQueryError> {
        let mut args = vec!["-layout", id.layout.as_str()];
        if !id.variant.is_empty() {
            args.extend(["-variant", id.variant.as_str()]);
        }
        args.push("-print");
        let keymap_source = run("setxkbmap", &args).await?;

        let compiled = compile_keymap(&keymap_source).await?;

        // The keymap is compiled for this layout alone, so it lives in Group1
        let data = xkbcomp::parse_keymap(&compiled, 0)?;
        tracing::debug!("Symbol table for '{}': {} keys", id, data.keys.len());
        Ok(data)
    }

    fn name(&self) -> &'static str {
        "xkb"
    }
}

/// Run a query tool and return its stdout
async fn run(tool: &str, args: &[&str]) -> Result<String, LayoutQueryError> {
    tracing::trace!("Running: {} {}", tool, args.join(" "));
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LayoutQueryError::ToolNotFound(tool.to_string())
            } else {
                LayoutQueryError::from(e)
            }
        })?;

    if !output.status.success() {
        return Err(LayoutQueryError::CommandFailed {
            tool: tool.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Feed a keymap description to `xkbcomp -xkb - -` and return the result
async fn compile_keymap(source: &str) -> Result<String, LayoutQueryError> {
    let mut child = Command::new("xkbcomp")
        .args(["-w", "0", "-xkb", "-", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LayoutQueryError::ToolNotFound("xkbcomp".to_string())
            } else {
                LayoutQueryError::from(e)
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(source.as_bytes()).await?;
        // Close stdin to signal EOF
        drop(stdin);
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(LayoutQueryError::CommandFailed {
            tool: "xkbcomp".to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract xkb layout specs from a GVariant `a(ss)` list such as
/// `[('xkb', 'us'), ('ibus', 'mozc-jp'), ('xkb', 'de+nodeadkeys')]`.
/// Non-xkb input methods are dropped.
pub fn parse_gnome_sources(text: &str) -> Vec<String> {
    static PAIR: OnceLock<Regex> = OnceLock::new();
    let pair = PAIR.get_or_init(|| {
        Regex::new(r"\(\s*'([^']*)'\s*,\s*'([^']*)'\s*\)").expect("valid regex")
    });

    pair.captures_iter(text)
        .filter(|c| &c[1] == "xkb")
        .map(|c| c[2].to_string())
        .collect()
}

/// Parse a GVariant unsigned integer such as `uint32 1`
fn parse_gvariant_uint(text: &str) -> Option<u32> {
    text.split_whitespace().last()?.parse().ok()
}

/// Parse `setxkbmap -query` output. The first configured layout is used.
pub fn parse_setxkbmap_query(text: &str) -> Option<LayoutIdentifier> {
    let field = |name: &str| {
        text.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.trim() == name)
            .map(|(_, value)| value.trim().to_string())
    };

    let layouts = field("layout")?;
    let variants = field("variant").unwrap_or_default();

    let layout = layouts.split(',').next()?.trim();
    let variant = variants.split(',').next().unwrap_or("").trim();
    if layout.is_empty() {
        return None;
    }
    Some(LayoutIdentifier::new(layout, variant, 0))
}
