//! Local data layer for the school dashboard: entity stores, filtering,
//! role-based permissions, exports, and the JSON-lines sidecar protocol.

pub mod auth;
pub mod backup;
pub mod config;
pub mod db;
pub mod export;
pub mod filter;
pub mod ipc;
pub mod models;
pub mod permissions;
pub mod storage;
pub mod store;
pub mod stores;
pub mod tolerant;
