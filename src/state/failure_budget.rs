use std::fmt;

/// The sequence a crawl position belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Paginated listing pages (positions are page numbers)
    Listing,

    /// Detail pages (positions are indices into the harvested links)
    Detail,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing => write!(f, "listing"),
            Self::Detail => write!(f, "detail"),
        }
    }
}

/// Result of charging a terminal failure to the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetVerdict {
    /// The crawl may continue
    Within { streak: u32 },

    /// The streak passed the threshold; the network is considered gone
    Exceeded { streak: u32 },
}

/// Consecutive-failure circuit breaker
///
/// Only terminal failures on directly adjacent positions extend the streak;
/// a failure anywhere else starts a new streak of one. The crawl must abort
/// once the streak exceeds the threshold.
#[derive(Debug, Clone)]
pub struct FailureBudget {
    threshold: u32,
    streak: u32,
    last_failed: Option<usize>,
}

impl FailureBudget {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            streak: 0,
            last_failed: None,
        }
    }

    /// Charges a terminal failure at `position`
    pub fn record_failure(&mut self, position: usize) -> BudgetVerdict {
        self.streak = match self.last_failed {
            Some(last) if self.streak > 0 && position == last + 1 => self.streak + 1,
            _ => 1,
        };
        self.last_failed = Some(position);

        if self.streak > self.threshold {
            BudgetVerdict::Exceeded {
                streak: self.streak,
            }
        } else {
            BudgetVerdict::Within {
                streak: self.streak,
            }
        }
    }

    /// Records a success at `position`
    ///
    /// A success immediately after the last failed position clears the streak.
    pub fn record_success(&mut self, position: usize) {
        if self.last_failed.map_or(false, |last| position == last + 1) {
            self.streak = 0;
            self.last_failed = None;
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }
}
