//! GNOME custom keybindings via gsettings
//!
//! Custom shortcuts live under the media-keys schema: a list of paths in
//! `custom-keybindings`, and a relocatable `custom-keybinding` schema at each
//! path holding `name`, `command` and `binding`.

use super::{SettingsStore, StoredBinding};
use crate::error::KeybindingError;
use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;

const MEDIA_KEYS_SCHEMA: &str = "org.gnome.settings-daemon.plugins.media-keys";
const CUSTOM_SCHEMA: &str = "org.gnome.settings-daemon.plugins.media-keys.custom-keybinding";
const BASE_PATH: &str = "/org/gnome/settings-daemon/plugins/media-keys/custom-keybindings";

/// Settings path for the `index`th binding of a namespace
pub fn binding_path(namespace: &str, index: usize) -> String {
    format!("{}/{}{}/", BASE_PATH, namespace, index)
}

pub struct GsettingsStore;

impl GsettingsStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GsettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn gsettings(op: &'static str, path: &str, args: &[&str]) -> Result<String, KeybindingError> {
    tracing::trace!("Running: gsettings {}", args.join(" "));
    let store_error = |message: String| KeybindingError::Store {
        op,
        path: path.to_string(),
        message,
    };

    let output = Command::new("gsettings")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                store_error("gsettings not found in PATH".to_string())
            } else {
                store_error(e.to_string())
            }
        })?;

    if !output.status.success() {
        return Err(store_error(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

async fn get_string(path: &str, schema: &str, key: &str) -> Result<String, KeybindingError> {
    let out = gsettings("read", path, &["get", schema, key]).await?;
    Ok(parse_string(&out).unwrap_or_default())
}

fn relocatable(path: &str) -> String {
    format!("{}:{}", CUSTOM_SCHEMA, path)
}

#[async_trait::async_trait]
impl SettingsStore for GsettingsStore {
    async fn list_paths(&self) -> Result<Vec<String>, KeybindingError> {
        let out = gsettings(
            "list",
            BASE_PATH,
            &["get", MEDIA_KEYS_SCHEMA, "custom-keybindings"],
        )
        .await?;
        Ok(parse_string_array(&out))
    }

    async fn read(&self, path: &str) -> Result<StoredBinding, KeybindingError> {
        let schema = relocatable(path);
        Ok(StoredBinding {
            name: get_string(path, &schema, "name").await?,
            command: get_string(path, &schema, "command").await?,
            binding: get_string(path, &schema, "binding").await?,
        })
    }

    async fn write(&self, path: &str, binding: &StoredBinding) -> Result<(), KeybindingError> {
        let schema = relocatable(path);
        for (key, value) in [
            ("name", &binding.name),
            ("command", &binding.command),
            ("binding", &binding.binding),
        ] {
            gsettings("write", path, &["set", &schema, key, &quote(value)]).await?;
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), KeybindingError> {
        let schema = relocatable(path);
        for key in ["name", "command", "binding"] {
            gsettings("remove", path, &["reset", &schema, key]).await?;
        }
        Ok(())
    }

    async fn set_paths(&self, paths: &[String]) -> Result<(), KeybindingError> {
        let list = format!(
            "[{}]",
            paths.iter().map(|p| quote(p)).collect::<Vec<_>>().join(", ")
        );
        gsettings(
            "set",
            BASE_PATH,
            &["set", MEDIA_KEYS_SCHEMA, "custom-keybindings", &list],
        )
        .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gsettings"
    }
}

/// Quote a string as a GVariant string literal
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn string_literal() -> &'static Regex {
    static LITERAL: OnceLock<Regex> = OnceLock::new();
    LITERAL.get_or_init(|| {
        Regex::new(r#"'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)""#).expect("valid regex")
    })
}

/// Parse a GVariant string such as `'Toggle dictation'`
pub fn parse_string(text: &str) -> Option<String> {
    let caps = string_literal().captures(text.trim())?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| unescape(m.as_str()))
}

/// Parse a GVariant string array such as `['/a/', '/b/']` or `@as []`
pub fn parse_string_array(text: &str) -> Vec<String> {
    string_literal()
        .captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| unescape(m.as_str()))
        .collect()
}
