//! Raw upstream rows to snapshot.
//!
//! The pipeline runs in four steps, each usable on its own:
//!
//! 1. [`RowAggregator`] folds usage rows into per-user accumulators.
//! 2. [`FlowClassifier::merge_flows`] adds flow counters to users already seen.
//! 3. [`group_by_domain`] partitions users by email domain, dropping
//!    [`GenericDomains`].
//! 4. [`SnapshotBuilder`] produces the output [`Snapshot`](crate::models::Snapshot).

mod accumulator;
mod flows;
mod organizations;
mod rows;
mod snapshot;

pub use accumulator::{UsageAccumulators, UserAccumulator};
pub use flows::{FLOW_EVENT_NAMES, FlowCategory, FlowClassifier, FlowMergeStats};
pub use organizations::{DomainGroup, GenericDomains, email_domain, group_by_domain};
pub(crate) use rows::round1;
pub use rows::{DEFAULT_DAILY_CAP_MINUTES, RowAggregator, normalize_email};
pub use snapshot::SnapshotBuilder;
