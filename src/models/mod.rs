//! Data Models
//!
//! Application settings and the classification taxonomy.

pub mod settings;
pub mod taxonomy;

pub use settings::*;
pub use taxonomy::*;
