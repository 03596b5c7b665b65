/// Position state definitions for tracking crawl progress
///
/// Every listing page and every detail link walks this machine once.
use std::fmt;

/// Represents the current state of a crawl position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionState {
    // ===== Active States =====
    /// Position has not been fetched yet
    Pending,

    /// Fetched content failed validation and the position is being re-fetched
    Retrying {
        /// Validation mismatches seen so far
        mismatches: u32,
    },

    // ===== Terminal States =====
    /// Position was fetched and its content validated
    Succeeded,

    /// The fetch engine gave up, or the mismatch bound was hit
    FailedTerminal,
}

impl PositionState {
    /// Records a content-validation mismatch
    ///
    /// With `limit = None` the position keeps retrying forever; otherwise the
    /// mismatch that exceeds `limit` fails the position. Terminal states absorb.
    pub fn on_mismatch(self, limit: Option<u32>) -> Self {
        let mismatches = match self {
            Self::Pending => 1,
            Self::Retrying { mismatches } => mismatches + 1,
            terminal => return terminal,
        };

        match limit {
            Some(limit) if mismatches > limit => Self::FailedTerminal,
            _ => Self::Retrying { mismatches },
        }
    }

    /// Records a validated fetch
    pub fn on_success(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            Self::Succeeded
        }
    }

    /// Records a terminal fetch failure
    pub fn on_failure(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            Self::FailedTerminal
        }
    }

    /// Returns true if no further fetches will happen for this position
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedTerminal)
    }

    /// Number of validation mismatches recorded while active
    pub fn mismatches(&self) -> u32 {
        match self {
            Self::Retrying { mismatches } => *mismatches,
            _ => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Retrying { .. } => "retrying",
            Self::Succeeded => "succeeded",
            Self::FailedTerminal => "failed_terminal",
        }
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
