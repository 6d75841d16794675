//! Command-line front end for the AT12 correction engine.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
