//! Subcommand handlers

pub mod scan;
