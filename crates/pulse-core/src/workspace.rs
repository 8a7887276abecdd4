//! Workspace descriptor lists and name resolution over them.

use crate::cache::{cache_key, Cache};
use crate::error::{PulseError, Result};
use crate::executor::{decode, decode_optional, Connection, QueryExecutor};
use crate::queries;
use crate::types::{PipelineDescriptor, RepoDescriptor};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use tracing::{debug, warn};

pub const PIPELINES_KEY: &str = "pipelines";
pub const REPOSITORIES_KEY: &str = "repositories";

// ---------------------------------------------------------------------------
// Cached lists
// ---------------------------------------------------------------------------

/// Pipelines of the workspace in canonical display order.
pub async fn pipelines(
    exec: &dyn QueryExecutor,
    cache: &dyn Cache,
    workspace_id: &str,
) -> Result<Vec<PipelineDescriptor>> {
    cached(cache, &cache_key(workspace_id, PIPELINES_KEY), async {
        let data = exec
            .execute(queries::WORKSPACE_PIPELINES, json!({"workspaceId": workspace_id}))
            .await?;
        let conn: Connection<PipelineDescriptor> =
            decode(&data, "/workspace/pipelinesConnection")?;
        Ok::<_, PulseError>(conn.nodes)
    })
    .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoRecord {
    id: String,
    #[serde(default)]
    gh_id: Option<i64>,
    name: String,
    owner_name: String,
}

/// Repositories connected to the workspace. Repositories the tracker has no
/// secondary-host id for are left out.
pub async fn repositories(
    exec: &dyn QueryExecutor,
    cache: &dyn Cache,
    workspace_id: &str,
) -> Result<Vec<RepoDescriptor>> {
    cached(cache, &cache_key(workspace_id, REPOSITORIES_KEY), async {
        let data = exec
            .execute(
                queries::WORKSPACE_REPOSITORIES,
                json!({"workspaceId": workspace_id}),
            )
            .await?;
        let conn: Connection<RepoRecord> = decode(&data, "/workspace/repositoriesConnection")?;
        let repos = conn
            .nodes
            .into_iter()
            .filter_map(|r| match r.gh_id {
                Some(external_id) => Some(RepoDescriptor {
                    id: r.id,
                    external_id,
                    name: r.name,
                    owner: r.owner_name,
                }),
                None => {
                    debug!(repo = %r.name, "repository has no external id; skipped");
                    None
                }
            })
            .collect();
        Ok::<_, PulseError>(repos)
    })
    .await
}

/// Drop the cached descriptor lists of one workspace.
pub fn invalidate(cache: &dyn Cache, workspace_id: &str) {
    for name in [PIPELINES_KEY, REPOSITORIES_KEY] {
        cache.invalidate(&cache_key(workspace_id, name));
    }
}

async fn cached<T, F>(cache: &dyn Cache, key: &str, fetch: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: Future<Output = Result<T>>,
{
    if let Some(value) = cache.get(key) {
        match serde_json::from_value(value) {
            Ok(hit) => {
                debug!(key, "cache hit");
                return Ok(hit);
            }
            Err(e) => warn!(key, error = %e, "ignoring malformed cache entry"),
        }
    }
    let fresh = fetch.await?;
    cache.set(key, &serde_json::to_value(&fresh)?);
    Ok(fresh)
}

/// The pipeline pull requests land in by default, if the workspace has one.
pub async fn default_pr_pipeline(
    exec: &dyn QueryExecutor,
    workspace_id: &str,
) -> Result<Option<PipelineDescriptor>> {
    let data = exec
        .execute(queries::DEFAULT_PR_PIPELINE, json!({"workspaceId": workspace_id}))
        .await?;
    decode_optional(&data, "/workspace/defaultPrPipeline")
}

// ---------------------------------------------------------------------------
// Name resolution
// ---------------------------------------------------------------------------

/// Case-insensitive exact match, else the single case-insensitive prefix
/// match. Ambiguous prefixes resolve to nothing.
fn resolve_named<'a, T>(items: &'a [T], query: &str, name_of: impl Fn(&T) -> String) -> Option<&'a T> {
    let wanted = query.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    if let Some(exact) = items.iter().find(|t| name_of(*t).to_lowercase() == wanted) {
        return Some(exact);
    }
    let mut prefixed = items
        .iter()
        .filter(|t| name_of(*t).to_lowercase().starts_with(&wanted));
    match (prefixed.next(), prefixed.next()) {
        (Some(only), None) => Some(only),
        (Some(_), Some(_)) => {
            debug!(query, "ambiguous name prefix");
            None
        }
        _ => None,
    }
}

pub fn resolve_pipeline<'a>(
    pipelines: &'a [PipelineDescriptor],
    name: &str,
) -> Result<&'a PipelineDescriptor> {
    resolve_named(pipelines, name, |p| p.name.clone())
        .ok_or_else(|| PulseError::PipelineNotFound(name.to_string()))
}

/// Accepts a bare repository name or `owner/name`.
pub fn resolve_repo<'a>(repos: &'a [RepoDescriptor], name: &str) -> Result<&'a RepoDescriptor> {
    let found = if name.contains('/') {
        resolve_named(repos, name, RepoDescriptor::full_name)
    } else {
        resolve_named(repos, name, |r| r.name.clone())
    };
    found.ok_or_else(|| PulseError::RepoNotFound(name.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
