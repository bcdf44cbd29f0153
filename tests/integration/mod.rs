//! Integration tests for node-core
//!
//! These tests exercise the public API the way a control plane would:
//! creating nodes, driving their lifecycle, persisting them through a
//! repository and handing out subscription links.
//!
//! # Test Organization
//!
//! - `node_lifecycle`: end-to-end lifecycle and credential scenarios
//! - `concurrency`: many threads mutating one aggregate
//! - `repository`: optimistic locking against an in-memory repository
//! - `subscription`: share links for every protocol
//! - `config_loading`: configuration files and node policy
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test integration_tests
//! cargo test --test integration_tests repository
//! ```

pub mod concurrency;
pub mod config_loading;
pub mod node_lifecycle;
pub mod repository;
pub mod subscription;
