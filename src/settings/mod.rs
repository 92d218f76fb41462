//! Settings are read once at startup and validated before anything else runs.
//! See `bin/settings_demo.rs` for a binary printing what a settings file resolves to.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
