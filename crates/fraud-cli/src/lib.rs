//! Library side of the `fraudprep` command-line tool.

pub mod commands;
pub mod logging;
pub mod types;
