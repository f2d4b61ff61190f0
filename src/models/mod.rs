//! Request and Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{PartitionQuery, RenameRequest, SetRequest, SummaryQuery};
pub use responses::{
    BucketResponse, ClearResponse, DeleteResponse, ErrorResponse, GetResponse, HealthResponse,
    RenameResponse, SetResponse, StatsResponse, SummaryResponse, SweepResponse,
};
