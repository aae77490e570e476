//! Controller runner - wires the RedisFleet controller onto the API server
//!
//! Returns the controller as a future so `main` decides how to run it.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use crate::config::ControllerConfig;
use crate::controller::{deleted_child_triggers, error_policy, reconcile, Context};
use crate::crd::RedisFleet;
use crate::workload::managed_pod_selector;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
pub const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the RedisFleet controller future
///
/// Fleets are reconciled when they change and when one of their pods is
/// deleted. The controller deduplicates triggers per fleet and never runs
/// two reconciles of the same fleet at once.
pub fn build_fleet_controller(
    client: Client,
    config: &ControllerConfig,
) -> impl Future<Output = ()> + Send {
    let ctx = Arc::new(Context::new(client.clone(), config));

    let (fleets, pods): (Api<RedisFleet>, Api<Pod>) = match &config.watch_namespace {
        Some(ns) => {
            tracing::info!(namespace = %ns, "Watching a single namespace");
            (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client, ns),
            )
        }
        None => (Api::all(client.clone()), Api::all(client)),
    };

    let pod_watch = WatcherConfig::default()
        .labels(&managed_pod_selector())
        .timeout(WATCH_TIMEOUT_SECS);

    tracing::info!("- RedisFleet controller");

    Controller::new(fleets, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .reconcile_on(deleted_child_triggers(pods, pod_watch))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(log_reconcile_result("RedisFleet"))
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::warn!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
