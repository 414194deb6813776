pub mod config;
pub mod constants;
pub mod dispatch;
pub mod engine;
pub mod locations;
pub mod ops;
