mod args;
mod driver;
mod time_range;
mod types;

pub use args::*;
pub use driver::{write_roi_table, MZRoier, MZRoierError};
pub use time_range::{TimeRange, TimeRangeParseError};
