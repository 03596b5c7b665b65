//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PositionState`: Tracks a single crawl position (listing page or detail link)
//!   from first fetch to success or terminal failure
//! - `FailureBudget`: Crawl-level circuit breaker over consecutive terminal failures
//! - `CrawlPhase`: Which sequence a position belongs to

mod failure_budget;
mod position_state;

// Re-export main types
pub use failure_budget::{BudgetVerdict, CrawlPhase, FailureBudget};
pub use position_state::PositionState;
