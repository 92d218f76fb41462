//! The `logger` module is a thin wrapper over `tracing-subscriber` with a
//! reloadable filter. See `bin/logger_demo.rs` for manual verification.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
