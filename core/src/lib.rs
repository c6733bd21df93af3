pub mod action;
pub mod build;
pub mod config;
pub mod fsutil;
pub mod lint;
pub mod normalize;
pub mod serdable;
pub mod style;
pub mod suite;
pub mod testing;

pub use crate::config::Config;
