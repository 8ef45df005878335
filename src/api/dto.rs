//! Data Transfer Objects
//!
//! Response bodies of the HTTP endpoints.

use serde::{Deserialize, Serialize};

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy, draining
    pub status: String,
    /// Live WebSocket connections
    pub connections: usize,
    /// Configured connection limit
    pub max_connections: usize,
    /// Names of non-empty groups
    pub groups: Vec<String>,
    /// Registered event handlers
    pub operations: Vec<String>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
