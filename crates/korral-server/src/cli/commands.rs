/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::api::{self, AppState};
use crate::dal::DAL;
use crate::db::create_shared_connection_pool;
use crate::events::ingestor::{self, IngestorHandle};
use crate::registry::{ClusterRegistry, RegistryError};
use crate::shutdown;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use korral_utils::config::Settings;
use korral_utils::logging::prelude::*;
use std::sync::Arc;
use std::time::Duration;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../korral-models/migrations");

const POOL_SIZE: u32 = 10;

/// Starts the korral server.
///
/// Prepares the database, connects every configured cluster, starts one
/// event ingestor per cluster and serves HTTP until Ctrl-C or SIGTERM.
pub async fn serve(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting korral");

    info!("Creating database connection pool");
    let connection_pool = create_shared_connection_pool(
        &config.database.url,
        POOL_SIZE,
        config.database.schema.as_deref(),
    )?;

    if let Some(ref schema) = config.database.schema {
        info!("Setting up schema: {}", schema);
        connection_pool.setup_schema(schema)?;
    }

    info!("Running pending database migrations");
    {
        let mut conn = connection_pool.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| format!("Failed to run migrations: {}", e))?;
    }
    info!("Database migrations completed successfully");

    let dal = DAL::new(connection_pool);

    info!(count = config.clusters.len(), "Registering clusters");
    let registry = Arc::new(ClusterRegistry::from_settings(&config.clusters).await?);
    if registry.is_empty() {
        warn!("No clusters configured");
    }

    let (trigger, shutdown_signal) = shutdown::channel();
    tokio::spawn(shutdown::listen_for_signals(trigger.clone()));

    let mut ingestors: Vec<IngestorHandle> = Vec::new();
    if config.events.enabled {
        let store = Arc::new(dal.clone());
        for name in registry.list() {
            let handle = ingestor::start(&name, &registry, store.clone(), trigger.subscribe())?;
            info!(cluster = %name, "Started event ingestor");
            ingestors.push(handle);
        }
    } else {
        info!("Event ingestion disabled");
    }

    let state = AppState {
        dal,
        registry,
        shutdown: shutdown_signal.clone(),
        exec_command: Arc::new(config.exec.command.clone()),
    };
    let app = api::configure_api_routes(state);

    info!("Starting server on {}", config.server.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;

    info!("korral is now running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal.signalled())
        .await?;

    trigger.trigger();
    stop_ingestors(
        ingestors,
        Duration::from_secs(config.server.shutdown_grace_seconds),
    )
    .await;

    info!("korral stopped");
    Ok(())
}

/// Waits for every ingestor to stop, aborting those still running after `grace`.
async fn stop_ingestors(ingestors: Vec<IngestorHandle>, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    for handle in ingestors {
        let cluster = handle.cluster().to_string();
        let abort = handle.abort_handle();
        match tokio::time::timeout_at(deadline, handle.join()).await {
            Ok(exit) => debug!(cluster = %cluster, exit = ?exit, "Event ingestor stopped"),
            Err(_) => {
                warn!(cluster = %cluster, "Event ingestor did not stop in time, aborting");
                abort.abort();
            }
        }
    }
}

/// Connects to every configured cluster and prints its API server version.
pub async fn clusters(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ClusterRegistry::from_settings(&config.clusters).await?;

    for name in registry.list() {
        let connection = registry.get(&name)?;
        let version = connection
            .client()
            .apiserver_version()
            .await
            .map_err(|source| RegistryError::Unreachable {
                cluster: name.clone(),
                source,
            })?;
        println!("{}\t{}", name, version.git_version);
    }

    Ok(())
}
