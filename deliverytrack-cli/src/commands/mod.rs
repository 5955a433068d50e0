//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (show, init, path)
//! - [`eta`] - Travel time and arrival estimate
//! - [`landmarks`] - List the landmark catalog
//! - [`route`] - Approximate a campus route
//! - [`simulate`] - End-to-end simulated delivery

pub mod common;
pub mod config;
pub mod eta;
pub mod landmarks;
pub mod route;
pub mod simulate;
