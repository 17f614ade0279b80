//! Ranks applications by how long they were in the foreground during a window, the last day by
//! default, and prints them with their share of the total.

pub mod cli;
pub mod platform;
pub mod present;
pub mod usage;
pub mod utils;
