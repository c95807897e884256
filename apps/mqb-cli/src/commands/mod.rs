//! 命令定义和实现

pub mod config;
pub mod replay;

pub use config::ConfigCommand;
pub use replay::ReplayCommand;
