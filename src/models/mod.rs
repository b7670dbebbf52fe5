//! Request and Response models for the shield API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{InvalidatePatternRequest, PeekQuery, SetValueRequest};
pub use responses::{
    HealthResponse, RateLimitStatusResponse, RemovedResponse, SetResponse, StatsResponse,
    ValueResponse,
};
