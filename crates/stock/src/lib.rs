//! Stock snapshot cache and restock-eligibility engine.
//!
//! Ingests raw polls, keeps the current per-shop view, and decides which
//! watched items are newly restocked.

pub mod cache;
pub mod manager;
pub mod normalize;
pub mod restock;

pub use cache::{Cache, UpdateCallback};
pub use manager::{ManagerSettings, PollOutcome, StockHandle, StockManager, StockUpdate};
pub use normalize::{normalize, round_to_nearest_5_minutes};
pub use restock::{RestockState, RestockTracker};
