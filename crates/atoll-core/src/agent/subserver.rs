//! Sub-server connections — external tool sources reached over HTTP.
//!
//! A connection is opened once at agent build time and stays alive for
//! the agent's lifetime. `connect` validates the URL and builds the HTTP
//! client without a network round-trip; the first tool-list fetch is
//! lazy and cached when the spec asks for it.

use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::WorkflowError;
use crate::workflow::schema::{SubServerKind, SubServerSpec};

/// An open connection to one sub-server.
#[derive(Debug)]
pub struct SubServerConnection {
    pub name: String,
    pub kind: SubServerKind,
    pub url: String,
    pub timeout: Duration,
    pub cache_tool_list: bool,
    client: reqwest::Client,
    cached_tools: Mutex<Option<Vec<String>>>,
}

impl SubServerConnection {
    /// Open a connection for the given spec. A spec without a resolvable
    /// URL is a fatal build error, not a skip.
    pub fn connect(spec: &SubServerSpec) -> Result<Self, WorkflowError> {
        let url = spec.resolve_url().ok_or_else(|| WorkflowError::SubServerConnect {
            name: spec.name.clone(),
            reason: "no URL in connectionParams".to_string(),
        })?;

        reqwest::Url::parse(url).map_err(|e| WorkflowError::SubServerConnect {
            name: spec.name.clone(),
            reason: format!("invalid URL '{}': {}", url, e),
        })?;

        let timeout = Duration::from_secs(spec.timeout_seconds);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkflowError::SubServerConnect {
                name: spec.name.clone(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        tracing::debug!(
            "[SubServer] Connected '{}' ({}) at {}",
            spec.name,
            spec.kind,
            url
        );

        Ok(Self {
            name: spec.name.clone(),
            kind: spec.kind,
            url: url.to_string(),
            timeout,
            cache_tool_list: spec.cache_tool_list,
            client,
            cached_tools: Mutex::new(None),
        })
    }

    /// List the tool names the sub-server exposes. Cached after the
    /// first successful fetch when `cacheToolList` is set.
    pub async fn list_tools(&self) -> Result<Vec<String>, WorkflowError> {
        if self.cache_tool_list {
            let cached = self.cached_tools.lock().await;
            if let Some(tools) = cached.as_ref() {
                return Ok(tools.clone());
            }
        }

        let accept = match self.kind {
            SubServerKind::Sse => "text/event-stream",
            SubServerKind::StreamableHttp => "application/json",
        };

        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list",
        });

        let response = self
            .client
            .post(&self.url)
            .header("accept", accept)
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::SubServerConnect {
                name: self.name.clone(),
                reason: format!("tools/list request failed: {}", e),
            })?;

        let json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| WorkflowError::SubServerConnect {
                    name: self.name.clone(),
                    reason: format!("tools/list response was not JSON: {}", e),
                })?;

        let tools: Vec<String> = json
            .pointer("/result/tools")
            .and_then(|t| t.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if self.cache_tool_list {
            *self.cached_tools.lock().await = Some(tools.clone());
        }

        Ok(tools)
    }

    /// Close the connection. Consumes self so a closed connection cannot
    /// be reused.
    pub async fn close(self) {
        tracing::debug!("[SubServer] Closed connection '{}'", self.name);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn spec(url: Option<&str>, params_url: Option<&str>) -> SubServerSpec {
        let mut connection_params = serde_json::Map::new();
        if let Some(u) = params_url {
            connection_params.insert("url".to_string(), serde_json::json!(u));
        }
        SubServerSpec {
            name: "search".to_string(),
            kind: SubServerKind::Sse,
            connection_params,
            url: url.map(str::to_string),
            timeout_seconds: 60,
            cache_tool_list: true,
        }
    }

    #[test]
    fn test_connect_with_params_url() {
        let conn = SubServerConnection::connect(&spec(None, Some("http://localhost:38080/sse")))
            .unwrap();
        assert_eq!(conn.url, "http://localhost:38080/sse");
        assert_eq!(conn.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_connect_with_top_level_url_fallback() {
        let conn = SubServerConnection::connect(&spec(Some("http://h/mcp"), None)).unwrap();
        assert_eq!(conn.url, "http://h/mcp");
    }

    #[test]
    fn test_connect_missing_url_is_fatal() {
        let err = SubServerConnection::connect(&spec(None, None)).unwrap_err();
        assert!(matches!(err, WorkflowError::SubServerConnect { .. }));
        assert!(err.to_string().contains("no URL"));
    }

    #[test]
    fn test_connect_invalid_url_is_fatal() {
        let err = SubServerConnection::connect(&spec(Some("not a url"), None)).unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    /// Serves a canned `tools/list` response, one request per
    /// connection, counting hits.
    async fn tools_list_server(hits: Arc<AtomicUsize>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                hits.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let body = r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[{"name":"search"},{"name":"fetch"}]}}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_list_tools_fetch_and_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = tools_list_server(hits.clone()).await;
        let conn = SubServerConnection::connect(&spec(Some(url.as_str()), None)).unwrap();

        let tools = conn.list_tools().await.unwrap();
        assert_eq!(tools, vec!["search", "fetch"]);

        // Second call is served from the cache.
        let again = conn.list_tools().await.unwrap();
        assert_eq!(again, tools);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_tools_cache_disabled_refetches() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = tools_list_server(hits.clone()).await;
        let mut server_spec = spec(Some(url.as_str()), None);
        server_spec.cache_tool_list = false;
        let conn = SubServerConnection::connect(&server_spec).unwrap();

        conn.list_tools().await.unwrap();
        conn.list_tools().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_list_tools_unreachable_server() {
        // Bind to get a free port, then drop the listener so the
        // connection is refused.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/mcp", listener.local_addr().unwrap());
        drop(listener);

        let conn = SubServerConnection::connect(&spec(Some(url.as_str()), None)).unwrap();
        let err = conn.list_tools().await.unwrap_err();
        assert!(matches!(err, WorkflowError::SubServerConnect { .. }));
    }
}
