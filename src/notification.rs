//! Desktop notifications
//!
//! Uses notify-send (libnotify) on Linux. Notifications are best-effort:
//! failures are logged and never propagate.

use crate::inject::InjectionReport;
use std::process::Stdio;
use tokio::process::Command;

/// Send a desktop notification with the given title and body
pub async fn send(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    send_linux(title, body).await;

    #[cfg(not(target_os = "linux"))]
    {
        tracing::debug!("Notifications not supported on this platform");
        let _ = (title, body);
    }
}

#[cfg(target_os = "linux")]
async fn send_linux(title: &str, body: &str) {
    let result = Command::new("notify-send")
        .args(["--app-name=Dictype", "--expire-time=3000", title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

/// Title and body warning the user about a degraded session, or None when
/// the output was clean
pub fn degraded_message(report: &InjectionReport) -> Option<(&'static str, String)> {
    if !report.is_degraded() {
        return None;
    }
    let title = if report.fatal.is_some() {
        "Dictation interrupted"
    } else if report.failed_count() > 0 {
        "Some characters were not typed"
    } else if report.layout_warning.is_some() {
        "Keyboard layout unknown"
    } else {
        "Dictation used fallback input"
    };

    let mut body = report.summary();
    if let Some(ref warning) = report.layout_warning {
        body.push_str(&format!("\n{}", warning));
    }
    Some((title, body))
}

/// Notify about a degraded session; does nothing for clean output
pub async fn notify_degraded(report: &InjectionReport) {
    if let Some((title, body)) = degraded_message(report) {
        send(title, &body).await;
    }
}
