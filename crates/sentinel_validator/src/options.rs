use serde::{Deserialize, Serialize};

/// Per-run validation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateOptions {
    /// Return `DriftDetected` instead of a failed result.
    pub throw_on_drift: bool,
    /// Emit one audit record for the run.
    pub log_activity: bool,
    /// Leave views out of both the contract and the snapshot. Takes
    /// precedence over `strict_mode`.
    pub skip_view_checks: bool,
    /// Escalate EXTRA, column order and view definition findings to blocking.
    pub strict_mode: bool,
    /// Report catalog objects and columns the contract does not declare.
    pub detect_extra: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            throw_on_drift: false,
            log_activity: true,
            skip_view_checks: false,
            strict_mode: false,
            detect_extra: true,
        }
    }
}

impl ValidateOptions {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            ..Self::default()
        }
    }

    pub fn throw_on_drift(mut self, enabled: bool) -> Self {
        self.throw_on_drift = enabled;
        self
    }

    pub fn log_activity(mut self, enabled: bool) -> Self {
        self.log_activity = enabled;
        self
    }

    pub fn skip_view_checks(mut self, enabled: bool) -> Self {
        self.skip_view_checks = enabled;
        self
    }

    pub fn strict_mode(mut self, enabled: bool) -> Self {
        self.strict_mode = enabled;
        self
    }

    pub fn detect_extra(mut self, enabled: bool) -> Self {
        self.detect_extra = enabled;
        self
    }
}
