//! Store Module
//!
//! The in-memory entry map with TTL expiry, its clock and snapshot
//! collaborators and the background ticker machinery.

mod clock;
mod entry;
mod snapshot;
mod store;
mod ticker;


// Re-export public types
pub use clock::{Clock, FixedClock, SystemClock};
pub use entry::{Entry, Value};
pub use snapshot::{FileSnapshotter, Snapshotter};
pub use store::{Params, Store, MIN_CLEANING_PERIOD, MIN_DUMPING_PERIOD};
pub use ticker::{TickFn, TickFuture, Ticker, TickerError};
