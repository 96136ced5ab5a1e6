//! Cache administration endpoints.
//!
//! Handlers return `EndpointResponse` instead of writing to a connection so
//! whatever HTTP layer sits in front can map them onto its own types:
//!
//! - `POST /api/revalidate` with `{ "tags"?: [..], "paths"?: [..], "clear"?: bool }`
//! - `GET /api/cache-stats`

use serde::Deserialize;

use crate::cache::PageCacheService;
use crate::constants::{CACHE_STATS_PATH, REVALIDATE_PATH};

/// Response from an admin endpoint handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: &'static str,
    /// Response body
    pub body: String,
}

impl EndpointResponse {
    /// Create a JSON response with the given status and body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            serde_json::json!({
                "status": "error",
                "message": message.into()
            }),
        )
    }
}

/// Check if the path is handled by the admin module
pub fn is_handled_path(path: &str) -> bool {
    path == REVALIDATE_PATH || path == CACHE_STATS_PATH
}

/// Route an admin request to its handler.
/// Returns None for paths this module does not own.
pub async fn handle_request(
    service: &PageCacheService,
    method: &str,
    path: &str,
    body: &str,
) -> Option<EndpointResponse> {
    let response = match (method, path) {
        ("POST", REVALIDATE_PATH) => handle_revalidate(service, body).await,
        ("GET", CACHE_STATS_PATH) => handle_cache_stats(service).await,
        (_, path) if is_handled_path(path) => {
            tracing::debug!(method = %method, path = %path, "Admin method not allowed");
            EndpointResponse::error(405, format!("Method {} not allowed", method))
        }
        _ => return None,
    };
    Some(response)
}

/// Body of a revalidate request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RevalidateRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub clear: bool,
}

impl RevalidateRequest {
    fn is_empty(&self) -> bool {
        !self.clear && self.tags.is_empty() && self.paths.is_empty()
    }
}

/// Handle a revalidate request.
///
/// `clear` wins over tags and paths. Tags are invalidated before paths and
/// the response reports how many entries each removed.
pub async fn handle_revalidate(service: &PageCacheService, body: &str) -> EndpointResponse {
    let request: RevalidateRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected revalidate request with invalid body");
            return EndpointResponse::error(400, format!("Invalid request body: {}", e));
        }
    };

    if request.is_empty() {
        return EndpointResponse::error(400, "Request must include tags, paths or clear");
    }

    if request.clear {
        return match service.clear().await {
            Ok(()) => EndpointResponse::json(200, serde_json::json!({ "cleared": true })),
            Err(e) => {
                tracing::error!(error = %e, "Cache clear failed");
                EndpointResponse::error(500, format!("Cache clear failed: {}", e))
            }
        };
    }

    let tags = match service.invalidate_by_tags(&request.tags).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "Tag invalidation failed");
            return EndpointResponse::error(500, format!("Tag invalidation failed: {}", e));
        }
    };

    let paths = match service.invalidate_by_paths(&request.paths).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "Path invalidation failed");
            return EndpointResponse::error(500, format!("Path invalidation failed: {}", e));
        }
    };

    EndpointResponse::json(
        200,
        serde_json::json!({
            "revalidated": true,
            "tags": tags,
            "paths": paths
        }),
    )
}

/// Handle a cache stats request.
pub async fn handle_cache_stats(service: &PageCacheService) -> EndpointResponse {
    match service.stats().await {
        Ok(stats) => EndpointResponse::json(
            200,
            serde_json::json!({
                "enabled": service.is_enabled(),
                "entries": stats.entries,
                "hits": stats.hits,
                "misses": stats.misses,
                "evictions": stats.evictions,
                "max_entries": stats.max_entries,
                "hit_rate": stats.hit_rate(),
                "regenerating": service.in_flight_count()
            }),
        ),
        Err(e) => EndpointResponse::error(500, format!("Failed to read cache stats: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, CacheStore, CacheStrategy, MemoryStore};
    use std::sync::Arc;

    async fn seeded_service() -> PageCacheService {
        let store = Arc::new(MemoryStore::new(100));
        store
            .set("/blog/a", CacheEntry::new("a", CacheStrategy::timed(60, &["blog"])))
            .await
            .unwrap();
        store
            .set("/blog/b", CacheEntry::new("b", CacheStrategy::timed(60, &["blog"])))
            .await
            .unwrap();
        store
            .set("/about", CacheEntry::new("about", CacheStrategy::Static))
            .await
            .unwrap();
        PageCacheService::new(store, true)
    }

    fn body_json(response: &EndpointResponse) -> serde_json::Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_revalidate_by_tags_and_paths_reports_counts() {
        let service = seeded_service().await;
        let response = handle_revalidate(&service, r#"{"tags":["blog"],"paths":["/about","/missing"]}"#).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");
        let body = body_json(&response);
        assert_eq!(body["revalidated"], true);
        assert_eq!(body["tags"], 2);
        assert_eq!(body["paths"], 1);
        assert_eq!(service.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_revalidate_clear_wins() {
        let service = seeded_service().await;
        let response = handle_revalidate(&service, r#"{"clear":true,"tags":["nothing"]}"#).await;

        assert_eq!(response.status, 200);
        assert_eq!(body_json(&response)["cleared"], true);
        assert_eq!(service.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_revalidate_rejects_invalid_json() {
        let service = seeded_service().await;
        let response = handle_revalidate(&service, "{not json").await;

        assert_eq!(response.status, 400);
        assert_eq!(body_json(&response)["status"], "error");
        assert_eq!(service.stats().await.unwrap().entries, 3);
    }

    #[tokio::test]
    async fn test_revalidate_rejects_empty_request() {
        let service = seeded_service().await;
        assert_eq!(handle_revalidate(&service, "{}").await.status, 400);
        assert_eq!(handle_revalidate(&service, r#"{"clear":false,"tags":[]}"#).await.status, 400);
    }

    #[tokio::test]
    async fn test_handle_request_routes_by_method_and_path() {
        let service = seeded_service().await;

        let stats = handle_request(&service, "GET", "/api/cache-stats", "").await.unwrap();
        assert_eq!(stats.status, 200);

        let wrong_method = handle_request(&service, "GET", "/api/revalidate", "").await.unwrap();
        assert_eq!(wrong_method.status, 405);

        let revalidated = handle_request(&service, "POST", "/api/revalidate", r#"{"paths":["/about"]}"#)
            .await
            .unwrap();
        assert_eq!(body_json(&revalidated)["paths"], 1);

        assert!(handle_request(&service, "GET", "/blog/a", "").await.is_none());
        assert!(!is_handled_path("/api/other"));
    }

    #[tokio::test]
    async fn test_cache_stats_reports_entries() {
        let service = seeded_service().await;
        let response = handle_cache_stats(&service).await;

        assert_eq!(response.status, 200);
        let body = body_json(&response);
        assert_eq!(body["entries"], 3);
        assert_eq!(body["max_entries"], 100);
        assert_eq!(body["enabled"], true);
        assert_eq!(body["regenerating"], 0);
    }
}
