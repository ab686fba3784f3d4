//! Router node harness.
//!
//! Wires a [`Worker`] to the health server and process signals. The embedding
//! binary supplies the [`Manager`] (and through it the media engine) and calls
//! [`run_node`] from its `main`.

use crate::config::Config;
use crate::errors::RouterError;
use crate::manager::Manager;
use crate::observability::{health_router, init_metrics_recorder, HealthState};
use crate::worker::Worker;
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run a node until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the health server cannot bind. The Prometheus
/// recorder is optional: if one is already installed the node runs without
/// a `/metrics` route.
pub async fn run_node(config: Config, manager: Arc<dyn Manager>) -> Result<(), RouterError> {
    run_node_until(config, manager, shutdown_signal()).await
}

/// Run a node until `shutdown` resolves.
pub async fn run_node_until<F>(
    config: Config,
    manager: Arc<dyn Manager>,
    shutdown: F,
) -> Result<(), RouterError>
where
    F: Future<Output = ()> + Send,
{
    info!(
        target: "router.node",
        node_id = %config.node_id,
        topic_namespace = %config.topic_namespace,
        session_timeout_seconds = config.session_timeout.as_secs(),
        health_bind_address = %config.health_bind_address,
        "Starting signal router node"
    );

    let prometheus = match init_metrics_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(target: "router.node", error = %e, "Metrics recorder not installed");
            None
        }
    };

    let health_state = Arc::new(HealthState::new());
    let shutdown_token = CancellationToken::new();

    // Bind before starting the worker so a bad address fails startup.
    let listener = tokio::net::TcpListener::bind(&config.health_bind_address)
        .await
        .map_err(|e| {
            error!(
                target: "router.node",
                error = %e,
                address = %config.health_bind_address,
                "Failed to bind health server"
            );
            RouterError::Config(format!(
                "Failed to bind health server to {}: {e}",
                config.health_bind_address
            ))
        })?;

    let app = health_router(Arc::clone(&health_state), prometheus);
    let health_token = shutdown_token.child_token();
    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { health_token.cancelled().await })
            .await
        {
            error!(target: "router.node", error = %e, "Health server error");
        }
    });

    let worker = Worker::from_config(&config, manager);
    health_state.set_ready();
    info!(
        target: "router.node",
        node_id = %worker.id(),
        topic = %worker.queue().topic(),
        "Signal router node ready"
    );

    tokio::select! {
        () = worker.handle_forever() => {}
        () = shutdown => {
            info!(target: "router.node", "Shutdown signal received, stopping worker");
        }
    }

    health_state.set_not_ready();
    worker.registry().cancel_all();
    shutdown_token.cancel();
    if let Err(e) = health_task.await {
        warn!(target: "router.node", error = %e, "Health server task failed");
    }

    info!(target: "router.node", "Signal router node stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
///
/// If a handler cannot be installed that signal is never observed; the other
/// one still triggers shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(target: "router.node", error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(target: "router.node", error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_unbindable_health_address_fails_fast() {
        let config = Config::from_vars(&HashMap::from([(
            "ROUTER_HEALTH_BIND_ADDRESS".to_string(),
            "not-an-address".to_string(),
        )]))
        .unwrap();

        let manager: Arc<dyn Manager> = Arc::new(NoopManager);
        let result = run_node_until(config, manager, std::future::ready(())).await;

        assert!(matches!(result, Err(RouterError::Config(_))));
    }

    struct NoopManager;

    #[async_trait::async_trait]
    impl Manager for NoopManager {
        async fn create_connection(
            &self,
            _signal: &crate::protocol::SignalRequest,
        ) -> Result<Arc<dyn crate::engine::EngineConnection>, RouterError> {
            Err(RouterError::ConnectionCreate("noop".to_string()))
        }

        async fn close_connection(&self, _pid: &str) {}

        async fn open_room(
            &self,
            _request: &crate::protocol::RoomAdminRequest,
        ) -> Result<(), RouterError> {
            Ok(())
        }

        fn get_queue(&self, topic: &str) -> Arc<dyn crate::queue::Queue> {
            Arc::new(crate::queue::MemoryQueue::new(
                topic,
                std::time::Duration::from_secs(25),
            ))
        }

        async fn get_room_data(
            &self,
            sid: &str,
        ) -> Result<crate::manager::RoomData, RouterError> {
            Err(RouterError::RoomNotFound(sid.to_string()))
        }

        async fn validate_offer(
            &self,
            _room: &crate::manager::RoomData,
            _pid: &str,
            _offer: &crate::protocol::SessionDescription,
        ) -> Result<(), RouterError> {
            Ok(())
        }
    }
}
