pub mod config;
pub mod preset;
pub mod settings;
pub mod tracker;

pub use config::*;
pub use preset::*;
pub use settings::*;
pub use tracker::*;
