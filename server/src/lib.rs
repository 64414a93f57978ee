//! Employee attendance tracking over a small JSON API.

pub mod attendance;
pub mod authentication;
pub mod config;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod report;
pub mod server;
pub mod static_data;
pub mod storage;
pub mod user_management;
pub mod web_server;
