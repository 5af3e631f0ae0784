//! HTTP API Layer
//!
//! Serves the environment catalog used by the notebook front end to pick a Pixi
//! environment.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{HttpServer, HttpServerConfig};
