pub mod error;
pub mod marks;
pub mod model;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod window;

pub use error::{BoundsError, FetchSource, SyncError};
pub use marks::{DateBounds, JumpAnchor, JumpMark, JumpMarkEngine, JumpMarks};
pub use model::*;
pub use snapshot::{GuideSnapshot, SyncState};
pub use status::RecordingStatusBook;
pub use store::ChannelEventStore;
pub use window::{ChannelWindow, HourWidthGeometry, TimelineGeometry, WindowCalculator};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
