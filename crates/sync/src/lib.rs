//! Keeps a windowed TV guide in sync with its data sources while the user
//! scrolls, zooms, searches and filters.

pub mod bounds;
pub mod controller;
pub mod coordinator;
pub mod fixture;
pub mod request;
pub mod retry;
pub mod source;

pub use bounds::{bounds_from_settings, window_calculator};
pub use controller::{ControllerSettings, SnapshotCallback, SyncController, SyncStats};
pub use coordinator::{FetchCoordinator, JoinedRound, RoundPlan, RoundRequest};
pub use fixture::{GuideFixture, StaticGuideSource};
pub use request::{FilterSelection, ViewportRequest};
pub use retry::{RetryPolicy, retry_fetch};
pub use source::GuideSource;
