pub mod error;
pub mod config;
pub mod identity;
pub mod navigation;
pub mod api;
pub mod portal;
pub mod cli;
