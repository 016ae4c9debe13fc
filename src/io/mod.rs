pub mod config_io;
pub mod storage;
pub mod store;
pub mod template;
