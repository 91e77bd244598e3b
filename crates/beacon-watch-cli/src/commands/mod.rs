//! Command implementations.

mod scan;
mod watch;

pub use scan::run_scan;
pub use watch::run_watch;
