//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `PUT /set` - Store a value
//! - `GET /get/:key` - Retrieve a value
//! - `DELETE /del/:key` - Delete a key
//! - `POST /rename` - Move an entry to another key
//! - `POST /sweep` - Run an expiration sweep
//! - `DELETE /clear` - Drop every entry
//! - `GET /summary` - Aggregate usage of live entries
//! - `GET /stats` - Entry count and sweep status
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
