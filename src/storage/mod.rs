//! Storage Layer
//!
//! JSON config file and the on-disk survey artifacts.

pub mod artifacts;
pub mod config;

pub use artifacts::*;
pub use config::*;
