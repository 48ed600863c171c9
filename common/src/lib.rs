//! Shared building blocks for the SQL gateway.
//!
//! - `codec`: wire request decoding and reply encoding
//! - `config`: environment-driven configuration
//! - `errors`: the gateway error taxonomy
//! - `models`: request, reply, row and database kind types
//! - `utils`: request validation and id generation
//! - `middleware`/`response`: admin HTTP plumbing

pub mod codec;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
