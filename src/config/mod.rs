pub mod defaults;
mod settings;

pub use settings::{CleanOptions, GarbageLevel};
