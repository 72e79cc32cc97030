mod range;
mod snapshot;
mod usage;

pub use range::*;
pub use snapshot::*;
pub use usage::*;
