//! Simple to use cli for logging your workouts.
//! Sessions are kept in a single JSON file and can be queried by date, by type, as totals or as
//! weekly summaries, either through an interactive menu or one-shot commands.
//!

pub mod cli;
pub mod tracker;
pub mod utils;
