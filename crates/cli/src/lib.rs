//! Command-line front end for the veighty checker.

pub mod args;
pub mod commands;
