pub mod activity;
pub mod cache;
pub mod config;
