//! Background jobs.
//!
//! - **Snapshot Refresh**: rebuilds the cached snapshot on a fixed interval so
//!   reads rarely trigger an inline refresh.
//!
//! ```toml
//! [jobs.snapshot_refresh]
//! enabled = true
//! interval_secs = 3000
//! ```

mod snapshot_refresh;

pub use snapshot_refresh::start_snapshot_refresh_worker;
