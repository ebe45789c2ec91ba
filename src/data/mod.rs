//! Dataset loading and preprocessing

pub mod loader;
pub mod preprocessing;

pub use loader::{load_dataset, parse_rows};
