//! Personal time tracking built around time blocks. Blocks are logged with a category, kept in
//! plain json-lines files, and summed per day, week, month or year. Summaries are cached for a
//! while so that repeated queries don't redo the work.
//!

pub mod cli;
pub mod config;
pub mod overlap;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod utils;
