//! Development tasks for dictype
//!
//! Usage:
//!   cargo xtask install     Install release binary to /usr/local/bin (requires sudo)
//!   cargo xtask uninstall   Remove binary and udev rule (requires sudo)
//!   cargo xtask udev        Install a udev rule giving the input group /dev/uinput
//!   cargo xtask man         Generate man pages into target/man

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

const BINARY: &str = "/usr/local/bin/dictype";
const UDEV_RULE_PATH: &str = "/etc/udev/rules.d/60-dictype-uinput.rules";
const UDEV_RULE: &str = "KERNEL==\"uinput\", GROUP=\"input\", MODE=\"0660\", OPTIONS+=\"static_node=uinput\"\n";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        print_help();
        return ExitCode::SUCCESS;
    };

    let result = match command.as_str() {
        "install" => install(),
        "uninstall" => uninstall(),
        "udev" => udev(),
        "man" => man(),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
            Err(anyhow::anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        r#"
dictype development tasks

Usage: cargo xtask <COMMAND>

Commands:
  install    Build release binary and install to /usr/local/bin (requires sudo)
  uninstall  Remove dictype and its udev rule (requires sudo)
  udev       Install a udev rule so the 'input' group can open /dev/uinput
  man        Generate man pages into target/man

Examples:
  cargo xtask install
  cargo xtask udev && sudo usermod -aG input $USER
"#
    );
}

/// Get the project root directory
fn project_root() -> anyhow::Result<PathBuf> {
    let dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir()?,
    };

    // xtask is in a subdirectory, go up one level
    Ok(dir.parent().unwrap_or(&dir).to_path_buf())
}

fn cargo_release(root: &Path, envs: &[(&str, &str)]) -> anyhow::Result<()> {
    let status = Command::new("cargo")
        .args(["build", "--release"])
        .envs(envs.iter().copied())
        .current_dir(root)
        .status()?;

    if !status.success() {
        anyhow::bail!("Build failed");
    }
    Ok(())
}

fn sudo(args: &[&str], what: &str) -> anyhow::Result<()> {
    let status = Command::new("sudo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{} failed (sudo required)", what);
    }
    Ok(())
}

/// Build release binary and install to /usr/local/bin
fn install() -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building release binary...");
    cargo_release(&root, &[])?;

    let binary = root.join("target/release/dictype");
    if !binary.exists() {
        anyhow::bail!("Binary not found at {:?}", binary);
    }

    println!("==> Installing to {}...", BINARY);
    let binary = binary.to_string_lossy();
    sudo(&["install", "-Dm755", &binary, BINARY], "Install")?;

    println!("==> Installed successfully!");
    println!();
    println!("Installed: {}", BINARY);

    // Show version
    let _ = Command::new(BINARY).arg("--version").status();

    Ok(())
}

/// Remove dictype and the udev rule
fn uninstall() -> anyhow::Result<()> {
    println!("==> Removing {} and {}...", BINARY, UDEV_RULE_PATH);
    sudo(&["rm", "-f", BINARY, UDEV_RULE_PATH], "Uninstall")?;

    println!("==> Uninstalled successfully!");
    Ok(())
}

/// Install the udev rule and reload udev
fn udev() -> anyhow::Result<()> {
    let staged = env::temp_dir().join("60-dictype-uinput.rules");
    std::fs::write(&staged, UDEV_RULE)?;

    println!("==> Installing {}...", UDEV_RULE_PATH);
    let staged = staged.to_string_lossy();
    sudo(&["install", "-Dm644", &staged, UDEV_RULE_PATH], "udev rule install")?;
    sudo(&["udevadm", "control", "--reload-rules"], "udev reload")?;
    sudo(&["udevadm", "trigger", "/dev/uinput"], "udev trigger")?;

    println!("==> Done. Make sure you are in the 'input' group:");
    println!("    sudo usermod -aG input $USER");
    Ok(())
}

/// Generate man pages via build.rs
fn man() -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Generating man pages...");
    cargo_release(&root, &[("DICTYPE_GEN_MANPAGES", "1")])?;

    println!("==> Man pages are in target/release/build/dictype-*/out/man");
    Ok(())
}
