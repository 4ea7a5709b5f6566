/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cluster Registry
//!
//! Holds one live Kubernetes client per configured cluster name.
//!
//! The registry is populated once, during startup, through
//! [`ClusterRegistryBuilder`]. Building consumes the builder, so the resulting
//! [`ClusterRegistry`] has no mutating methods at all: it is shared behind an
//! `Arc` and every reader sees the complete map.
//!
//! Registration is fail-fast. [`ClusterRegistry::from_settings`] stops at the
//! first cluster it cannot connect to and the process is expected to abort.

use korral_utils::config::Cluster;
use korral_utils::logging::prelude::*;
use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Client, Config};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cluster '{0}' not found")]
    ClusterNotFound(String),

    #[error("cluster name must not be empty")]
    EmptyName,

    #[error("cluster '{0}' is already registered")]
    DuplicateCluster(String),

    #[error("failed to load kubeconfig for cluster '{cluster}': {source}")]
    Kubeconfig {
        cluster: String,
        #[source]
        source: KubeconfigError,
    },

    #[error("failed to infer configuration for cluster '{cluster}': {source}")]
    Infer {
        cluster: String,
        #[source]
        source: kube::config::InferConfigError,
    },

    #[error("failed to create client for cluster '{cluster}': {source}")]
    Client {
        cluster: String,
        #[source]
        source: kube::Error,
    },

    #[error("cluster '{cluster}' is unreachable: {source}")]
    Unreachable {
        cluster: String,
        #[source]
        source: kube::Error,
    },
}

/// How to reach one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Kubeconfig file; `None` infers in-cluster or `$KUBECONFIG` configuration
    pub kubeconfig_path: Option<PathBuf>,
    /// Kubeconfig context; `None` uses the current context
    pub context: Option<String>,
    /// Query the API server version before accepting the connection
    pub verify_connectivity: bool,
}

impl From<&Cluster> for ConnectionParams {
    fn from(cluster: &Cluster) -> Self {
        ConnectionParams {
            kubeconfig_path: cluster.kubeconfig_path.as_ref().map(PathBuf::from),
            context: cluster.context.clone(),
            verify_connectivity: cluster.verify_connectivity,
        }
    }
}

/// A named, immutable connection to one cluster.
pub struct ClusterConnection {
    name: String,
    client: Client,
}

impl ClusterConnection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle to the cluster's client. Clones share the same
    /// underlying connection pool.
    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

impl std::fmt::Debug for ClusterConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConnection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Read-only mapping from cluster name to connection.
#[derive(Debug, Default)]
pub struct ClusterRegistry {
    clusters: BTreeMap<String, Arc<ClusterConnection>>,
}

impl ClusterRegistry {
    pub fn builder() -> ClusterRegistryBuilder {
        ClusterRegistryBuilder::default()
    }

    /// Registers every configured cluster, stopping at the first failure.
    ///
    /// # Arguments
    ///
    /// * `clusters` - The `clusters` section of the settings
    ///
    /// # Returns
    ///
    /// The complete registry, or the error of the first cluster that could not
    /// be registered.
    pub async fn from_settings(clusters: &[Cluster]) -> Result<ClusterRegistry, RegistryError> {
        let mut builder = ClusterRegistry::builder();
        for cluster in clusters {
            builder
                .register(&cluster.name, &ConnectionParams::from(cluster))
                .await?;
        }
        Ok(builder.build())
    }

    /// Looks up a cluster by name.
    ///
    /// Returns the same connection instance on every call.
    pub fn get(&self, name: &str) -> Result<Arc<ClusterConnection>, RegistryError> {
        self.clusters
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ClusterNotFound(name.to_string()))
    }

    /// Registered cluster names in ascending order.
    pub fn list(&self) -> Vec<String> {
        self.clusters.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Collects connections during startup.
#[derive(Default)]
pub struct ClusterRegistryBuilder {
    clusters: BTreeMap<String, Arc<ClusterConnection>>,
}

impl ClusterRegistryBuilder {
    /// Establishes a connection for `name` and adds it to the registry.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique, non-empty cluster name
    /// * `params` - Where the cluster's credentials come from
    ///
    /// # Returns
    ///
    /// The new connection, or a `RegistryError` describing why it could not
    /// be created.
    pub async fn register(
        &mut self,
        name: &str,
        params: &ConnectionParams,
    ) -> Result<Arc<ClusterConnection>, RegistryError> {
        self.check_name(name)?;

        let config = load_config(name, params).await?;
        let client = Client::try_from(config).map_err(|source| RegistryError::Client {
            cluster: name.to_string(),
            source,
        })?;

        if params.verify_connectivity {
            let version =
                client
                    .apiserver_version()
                    .await
                    .map_err(|source| RegistryError::Unreachable {
                        cluster: name.to_string(),
                        source,
                    })?;
            info!(
                cluster = %name,
                version = %version.git_version,
                "Verified cluster connectivity"
            );
        }

        self.register_client(name, client)
    }

    /// Adds an already constructed client under `name`.
    pub fn register_client(
        &mut self,
        name: &str,
        client: Client,
    ) -> Result<Arc<ClusterConnection>, RegistryError> {
        self.check_name(name)?;

        let connection = Arc::new(ClusterConnection {
            name: name.to_string(),
            client,
        });
        self.clusters.insert(name.to_string(), connection.clone());
        info!(cluster = %name, "Registered cluster");
        Ok(connection)
    }

    pub fn build(self) -> ClusterRegistry {
        ClusterRegistry {
            clusters: self.clusters,
        }
    }

    fn check_name(&self, name: &str) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.clusters.contains_key(name) {
            return Err(RegistryError::DuplicateCluster(name.to_string()));
        }
        Ok(())
    }
}

async fn load_config(name: &str, params: &ConnectionParams) -> Result<Config, RegistryError> {
    let options = KubeConfigOptions {
        context: params.context.clone(),
        ..Default::default()
    };
    let kubeconfig_error = |source| RegistryError::Kubeconfig {
        cluster: name.to_string(),
        source,
    };

    match (&params.kubeconfig_path, &params.context) {
        (Some(path), _) => {
            debug!(cluster = %name, path = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(kubeconfig_error)?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(kubeconfig_error)
        }
        (None, Some(_)) => Config::from_kubeconfig(&options)
            .await
            .map_err(kubeconfig_error),
        (None, None) => Config::infer()
            .await
            .map_err(|source| RegistryError::Infer {
                cluster: name.to_string(),
                source,
            }),
    }
}
