//! Process-wide server settings, fixed once the server is built.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_STATIC_ROOT: &str = "public";
pub const DEFAULT_STATIC_MEMORY_THRESHOLD: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Log every request on arrival and its status on completion.
    pub log_requests: bool,

    /// Largest request body, in bytes, a handler may read.
    pub max_body_size: u64,

    /// Directory requests for paths with a file extension are looked up in.
    pub static_root: PathBuf,

    /// Static files above this many bytes are streamed.
    pub static_memory_threshold: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_requests: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            static_root: PathBuf::from(DEFAULT_STATIC_ROOT),
            static_memory_threshold: DEFAULT_STATIC_MEMORY_THRESHOLD,
        }
    }
}
