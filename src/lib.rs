//! Redis Fleet - CRD-driven Kubernetes operator for fleets of Redis pods
//!
//! A `RedisFleet` declares how many Redis pods should exist. The operator
//! creates pods named `<fleet>-1..=<fleet>-<replicas>`, records each one on
//! the fleet, scales down from the newest pod, and deletes every pod before
//! letting the fleet itself go away.
//!
//! # Architecture
//!
//! - Fleets are reconciled level-based: each pass re-reads the fleet and
//!   closes the gap between desired and tracked pods.
//! - The set of owned pods is stored in the fleet's finalizer list, which
//!   also blocks fleet removal until teardown finishes.
//! - Deleting a managed pod re-triggers its fleet so it is recreated.
//!
//! # Modules
//!
//! - [`crd`] - The RedisFleet custom resource
//! - [`controller`] - Reconciler, deletion router and controller adapter
//! - [`controller_runner`] - Builds the controller future
//! - [`tracker`] - Ownership tracker stored in the fleet's finalizers
//! - [`workload`] - Child pod construction and ownership checks
//! - [`store`] - Store abstraction over the Kubernetes API
//! - [`events`] - Kubernetes Event publishing
//! - [`metrics`] - OpenTelemetry instruments
//! - [`telemetry`] - Logging, tracing and metrics export setup
//! - [`retry`] - Backoff helpers
//! - [`config`] - Operator settings
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod controller_runner;
pub mod crd;
pub mod error;
pub mod events;
pub mod metrics;
pub mod retry;
pub mod store;
pub mod telemetry;
pub mod tracker;
pub mod workload;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager used for server-side apply of the CRD
pub const FIELD_MANAGER: &str = "redis-fleet-controller";
