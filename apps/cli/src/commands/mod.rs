//! Command implementations for the covcast CLI.

pub mod library;
pub mod predict;
pub mod serve;
pub mod train;
