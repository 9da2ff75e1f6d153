//! Per-step results of an injection request

use crate::error::{FallbackError, InjectionError, LayoutQueryError, SendError};
use crate::keymap::LayoutIdentifier;
use crate::translate::InjectionStep;

/// What happened to one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The session ended before reaching this step
    NotAttempted,
    /// Typed via keystrokes
    Typed {
        /// A dead-key prefix was emitted before the key
        composed: bool,
        /// The preferred keystroke was unavailable and a later candidate was used
        alternate: bool,
    },
    /// Delivered through the fallback channel
    Fallback,
    /// The fallback channel could not deliver the character
    FallbackFailed(FallbackError),
    /// Key event delivery failed; this ended the session
    Failed(SendError),
}

impl StepOutcome {
    /// The character reached the target
    pub fn delivered(&self) -> bool {
        matches!(self, StepOutcome::Typed { .. } | StepOutcome::Fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub ch: char,
    pub outcome: StepOutcome,
}

/// Result of one injection request, returned to the caller so it can warn
/// the user about degraded output
#[derive(Debug, Clone, Default)]
pub struct InjectionReport {
    /// Layout the text was translated for
    pub layout: Option<LayoutIdentifier>,
    /// Set when the active layout could not be determined and a fallback
    /// layout was used instead
    pub layout_warning: Option<LayoutQueryError>,
    pub steps: Vec<StepRecord>,
    /// First fatal error, if the session was aborted early
    pub fatal: Option<InjectionError>,
}

impl InjectionReport {
    /// A report with every step not yet attempted
    pub fn pending(steps: &[InjectionStep]) -> Self {
        Self {
            steps: steps
                .iter()
                .map(|s| StepRecord {
                    ch: s.ch(),
                    outcome: StepOutcome::NotAttempted,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn typed_count(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Typed { .. }))
    }

    pub fn composed_count(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Typed { composed: true, .. }))
    }

    pub fn fallback_count(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Fallback))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed(_) | StepOutcome::FallbackFailed(_)))
    }

    pub fn not_attempted_count(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::NotAttempted))
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }

    /// Every character was delivered
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none() && self.steps.iter().all(|s| s.outcome.delivered())
    }

    /// Anything the user should be warned about: fallback use, failures, or
    /// an unknown layout
    pub fn is_degraded(&self) -> bool {
        self.layout_warning.is_some()
            || !self.is_complete()
            || self.fallback_count() > 0
    }

    /// Characters that reached the target, in order
    pub fn delivered_text(&self) -> String {
        self.steps
            .iter()
            .filter(|s| s.outcome.delivered())
            .map(|s| s.ch)
            .collect()
    }

    /// One-line summary for logs and notifications
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} typed", self.typed_count())];
        if self.composed_count() > 0 {
            parts.push(format!("{} composed", self.composed_count()));
        }
        if self.fallback_count() > 0 {
            parts.push(format!("{} via fallback", self.fallback_count()));
        }
        if self.failed_count() > 0 {
            parts.push(format!("{} failed", self.failed_count()));
        }
        if self.not_attempted_count() > 0 {
            parts.push(format!("{} not attempted", self.not_attempted_count()));
        }
        let mut summary = parts.join(", ");
        if let Some(ref id) = self.layout {
            summary.push_str(&format!(" (layout {})", id));
        }
        if let Some(ref fatal) = self.fatal {
            summary.push_str(&format!(": {}", fatal));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ch: char, outcome: StepOutcome) -> StepRecord {
        StepRecord { ch, outcome }
    }

    #[test]
    fn test_counts_and_summary() {
        let report = InjectionReport {
            layout: Some(LayoutIdentifier::us()),
            steps: vec![
                record('a', StepOutcome::Typed { composed: false, alternate: false }),
                record('é', StepOutcome::Typed { composed: true, alternate: false }),
                record('€', StepOutcome::Fallback),
                record('x', StepOutcome::NotAttempted),
            ],
            ..Default::default()
        };

        assert_eq!(report.typed_count(), 2);
        assert_eq!(report.composed_count(), 1);
        assert_eq!(report.fallback_count(), 1);
        assert_eq!(report.not_attempted_count(), 1);
        assert_eq!(report.delivered_text(), "aé€");
        assert!(report.is_degraded());
        assert_eq!(
            report.summary(),
            "2 typed, 1 composed, 1 via fallback, 1 not attempted (layout us)"
        );
    }

    #[test]
    fn test_clean_report_not_degraded() {
        let report = InjectionReport {
            steps: vec![record('a', StepOutcome::Typed { composed: false, alternate: false })],
            ..Default::default()
        };
        assert!(report.is_complete());
        assert!(!report.is_degraded());
    }
}
