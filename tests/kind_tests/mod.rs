//! Integration tests for the Redis Fleet operator
//!
//! These tests require a Kubernetes cluster (kind) to run and tell the story
//! of how users interact with RedisFleets in real-world scenarios.
//!
//! # Test Organization
//!
//! - `crd_operations`: Stories about creating, reading, updating, and deleting
//!   RedisFleet resources through the Kubernetes API
//!
//! - `fleet_lifecycle`: Stories about how the controller scales fleets,
//!   heals deleted pods and tears fleets down
//!
//! # Running These Tests
//!
//! These tests are ignored by default because they require a kind cluster:
//!
//! ```bash
//! cargo test --test kind -- --ignored
//! ```

mod crd_operations;
mod fleet_lifecycle;
mod helpers;
