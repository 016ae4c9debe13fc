pub mod data_manager;
pub mod preset_manager;
pub mod tracker_ops;
