/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Kubernetes resource kinds served by the listing and summary endpoints.

use crate::selector::{select, ResourceCell, Selection, SelectionQuery};
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to list {kind}: {source}")]
    List {
        kind: ResourceKind,
        #[source]
        source: kube::Error,
    },

    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: ResourceKind,
        #[source]
        source: serde_json::Error,
    },
}

macro_rules! resource_kinds {
    ($($variant:ident => $ty:ty, $path:literal, $namespaced:literal;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(rename_all = "lowercase")]
        pub enum ResourceKind {
            $($variant,)*
        }

        impl ResourceKind {
            pub const ALL: &'static [ResourceKind] = &[$(ResourceKind::$variant,)*];

            /// Plural, lowercase path segment, e.g. `persistentvolumeclaims`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(ResourceKind::$variant => $path,)*
                }
            }

            pub fn from_path(segment: &str) -> Option<ResourceKind> {
                match segment {
                    $($path => Some(ResourceKind::$variant),)*
                    _ => None,
                }
            }

            /// Whether objects of this kind live inside a namespace.
            pub fn is_namespaced(self) -> bool {
                match self {
                    $(ResourceKind::$variant => $namespaced,)*
                }
            }
        }

        $(
            impl ResourceCell for $ty {
                fn name(&self) -> &str {
                    self.meta().name.as_deref().unwrap_or_default()
                }

                fn created_at(&self) -> DateTime<Utc> {
                    self.meta()
                        .creation_timestamp
                        .as_ref()
                        .map(|t| t.0)
                        .unwrap_or(DateTime::<Utc>::MIN_UTC)
                }
            }
        )*

        async fn select_dispatch(
            client: Client,
            kind: ResourceKind,
            params: &ListParams,
            query: &SelectionQuery,
        ) -> Result<Selection<serde_json::Value>, ResourceError> {
            match kind {
                $(ResourceKind::$variant => select_typed::<$ty>(client, kind, params, query).await,)*
            }
        }

        async fn count_dispatch(client: Client, kind: ResourceKind) -> Result<usize, ResourceError> {
            match kind {
                $(ResourceKind::$variant => count_typed::<$ty>(client, kind).await,)*
            }
        }
    };
}

resource_kinds! {
    Nodes => Node, "nodes", false;
    Namespaces => Namespace, "namespaces", false;
    PersistentVolumes => PersistentVolume, "persistentvolumes", false;
    PersistentVolumeClaims => PersistentVolumeClaim, "persistentvolumeclaims", true;
    Services => Service, "services", true;
    Ingresses => Ingress, "ingresses", true;
    Deployments => Deployment, "deployments", true;
    DaemonSets => DaemonSet, "daemonsets", true;
    StatefulSets => StatefulSet, "statefulsets", true;
    Jobs => Job, "jobs", true;
    CronJobs => CronJob, "cronjobs", true;
    Pods => Pod, "pods", true;
    Secrets => Secret, "secrets", true;
    ConfigMaps => ConfigMap, "configmaps", true;
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lists one kind and runs it through the selector.
///
/// `namespace` narrows namespaced kinds to one namespace and is ignored for
/// cluster-scoped kinds.
pub async fn list(
    client: Client,
    kind: ResourceKind,
    namespace: Option<&str>,
    query: &SelectionQuery,
) -> Result<Selection<serde_json::Value>, ResourceError> {
    let mut params = ListParams::default();
    if let Some(ns) = namespace.filter(|ns| kind.is_namespaced() && !ns.is_empty()) {
        params = params.fields(&format!("metadata.namespace={}", ns));
    }
    select_dispatch(client, kind, &params, query).await
}

/// Counts every object of one kind across all namespaces.
pub async fn count(client: Client, kind: ResourceKind) -> Result<usize, ResourceError> {
    count_dispatch(client, kind).await
}

async fn select_typed<K>(
    client: Client,
    kind: ResourceKind,
    params: &ListParams,
    query: &SelectionQuery,
) -> Result<Selection<serde_json::Value>, ResourceError>
where
    K: Resource<DynamicType = ()> + ResourceCell + Clone + DeserializeOwned + Serialize + Debug,
{
    let api: Api<K> = Api::all(client);
    let list = api
        .list(params)
        .await
        .map_err(|source| ResourceError::List { kind, source })?;

    select(list.items, query)
        .try_map(serde_json::to_value)
        .map_err(|source| ResourceError::Encode { kind, source })
}

async fn count_typed<K>(client: Client, kind: ResourceKind) -> Result<usize, ResourceError>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<K> = Api::all(client);
    let list = api
        .list_metadata(&ListParams::default())
        .await
        .map_err(|source| ResourceError::List { kind, source })?;
    Ok(list.items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

    fn pod(name: &str, created: Option<DateTime<Utc>>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                creation_timestamp: created.map(Time),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_paths_round_trip() {
        assert_eq!(ResourceKind::ALL.len(), 14);
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_path(kind.as_str()), Some(*kind));
        }
        assert_eq!(ResourceKind::from_path("Pods"), None);
        assert_eq!(ResourceKind::from_path("replicasets"), None);
    }

    #[test]
    fn test_scope() {
        assert!(!ResourceKind::Nodes.is_namespaced());
        assert!(!ResourceKind::PersistentVolumes.is_namespaced());
        assert!(ResourceKind::PersistentVolumeClaims.is_namespaced());
        assert!(ResourceKind::Pods.is_namespaced());
    }

    #[test]
    fn test_kube_objects_are_resource_cells() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let p = pod("web-7d9f", Some(t));

        assert_eq!(ResourceCell::name(&p), "web-7d9f");
        assert_eq!(p.created_at(), t);
    }

    #[test]
    fn test_missing_metadata_sorts_last() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let mut unnamed = pod("", None);
        unnamed.metadata.name = None;

        let selection = select(
            vec![unnamed, pod("api-0", Some(t))],
            &SelectionQuery::default(),
        );

        assert_eq!(ResourceCell::name(&selection.items[0]), "api-0");
        assert_eq!(ResourceCell::name(&selection.items[1]), "");
        assert_eq!(selection.items[1].created_at(), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_selection_of_pods_serializes() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let selection = select(vec![pod("api-0", Some(t))], &SelectionQuery::default())
            .try_map(serde_json::to_value)
            .expect("pods serialize");

        assert_eq!(selection.total, 1);
        assert_eq!(selection.items[0]["metadata"]["name"], "api-0");
    }

    #[test]
    fn test_kind_serializes_as_path() {
        let json = serde_json::to_value(ResourceKind::PersistentVolumeClaims).expect("serialize");
        assert_eq!(json, "persistentvolumeclaims");
        assert_eq!(ResourceKind::CronJobs.to_string(), "cronjobs");
    }
}
