//! Dictype - layout-aware text injection for dictation
//!
//! Use `dictype type <text>` to type text on the active keyboard layout.
//! Use `dictype layout` to inspect how characters map to keystrokes.
//! Use `dictype bindings apply` to register dictation hotkeys.

use clap::Parser;
use dictype::cli::{BindingsAction, Cli, Commands};
use dictype::config::{self, Config};
use dictype::engine::{LayoutResolver, TypingEngine};
use dictype::inject::CancelFlag;
use dictype::keybinding::{gsettings::GsettingsStore, KeybindingManager};
use dictype::notification;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("dictype={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(layout) = cli.layout {
        config.layout.pinned = Some(layout);
    }
    if let Some(backend) = cli.backend {
        config.injection.backend = backend.parse()?;
    }
    if let Some(fallback) = cli.fallback {
        config.fallback.strategy = fallback.parse()?;
    }

    match cli.command {
        Commands::Type { text } => run_type(&config, text).await?,
        Commands::Layout { chars } => show_layout(&config, chars.as_deref()).await,
        Commands::Bindings { action } => run_bindings(&config, action).await?,
        Commands::Config => show_config(&config)?,
    }

    Ok(())
}

/// Drop the single line ending `echo` (or a CRLF producer) appends to piped
/// text; it was not dictated
fn strip_line_ending(mut input: String) -> String {
    if input.ends_with("\r\n") {
        input.truncate(input.len() - 2);
    } else if input.ends_with('\n') {
        input.pop();
    }
    input
}

/// Type text given on the command line or read from stdin
async fn run_type(config: &Config, text: Option<String>) -> anyhow::Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            strip_line_ending(input)
        }
    };

    if text.is_empty() {
        tracing::debug!("Nothing to type");
        return Ok(());
    }

    let engine = TypingEngine::from_config(config).await?;

    // Ctrl+C stops typing between characters
    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let report = engine.type_text(&text, &cancel).await?;
    println!("{}", report.summary());

    if config.notification.on_degraded {
        notification::notify_degraded(&report).await;
    }
    if let Some(fatal) = report.fatal {
        anyhow::bail!("typing stopped early: {}", fatal);
    }
    Ok(())
}

/// Print the active layout and the keystrokes for the given characters
async fn show_layout(config: &Config, chars: Option<&str>) {
    let resolver = LayoutResolver::from_config(config);
    let (map, warning) = resolver.resolve().await;

    if let Some(warning) = warning {
        println!("Warning: {}\n", warning);
    }
    println!("Layout: {}", map.identifier());
    println!("Typeable characters: {}", map.len());

    if let Some(chars) = chars {
        println!();
        for ch in chars.chars() {
            match map.candidates(ch) {
                Some(candidates) => {
                    let routes: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                    println!("  {:?}: {}", ch, routes.join(" | "));
                }
                None => println!("  {:?}: fallback ({:?})", ch, config.fallback.strategy),
            }
        }
    }
}

async fn run_bindings(config: &Config, action: BindingsAction) -> anyhow::Result<()> {
    let manager = KeybindingManager::new(
        Box::new(GsettingsStore::new()),
        config.keybinding_namespace.clone(),
    );

    match action {
        BindingsAction::Apply => {
            let report = manager.apply(&config.keybindings).await?;
            for path in &report.removed {
                println!("Removed {}", path);
            }
            for (path, e) in &report.removal_failures {
                println!("Could not remove {}: {}", path, e);
            }
            for outcome in &report.outcomes {
                match &outcome.result {
                    Ok(path) => println!("Registered '{}' at {}", outcome.name, path),
                    Err(e) => println!("Failed '{}': {}", outcome.name, e),
                }
            }
            if !report.is_complete() {
                anyhow::bail!("{} keybinding operations failed", report.failures());
            }
        }
        BindingsAction::List => {
            let listing = manager.list().await?;
            if listing.bound.is_empty() {
                println!("No dictation keybindings registered.");
            } else {
                println!("Dictation keybindings:");
                for binding in &listing.bound {
                    println!("  {}: {} ({})", binding.key_combo, binding.name, binding.command);
                }
            }
            if !listing.unbound_commands.is_empty() {
                println!("\nCommands without keybindings:");
                for command in &listing.unbound_commands {
                    println!("  {}", command);
                }
            }
        }
    }
    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    if let Some(path) = Config::default_path() {
        println!("Config file: {:?}\n", path);
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
