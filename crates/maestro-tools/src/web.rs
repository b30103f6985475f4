//! Web search, scraping and reranking tools over the Serper and Jina APIs.
//!
//! Each tool is one JSON POST. A non-2xx answer becomes an execution error
//! carrying the status and body so the agent can see what the service said.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    result::ToolResult,
    tool::{ParamSpec, ParamType, ToolDescriptor},
};
use maestro_core::{
    invoke::parse_arguments,
    traits::{Tool, ToolContext},
};

pub const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";
pub const SERPER_SCRAPE_URL: &str = "https://scrape.serper.dev";
pub const JINA_RERANK_URL: &str = "https://api.jina.ai/v1/rerank";

const SEARCH_RESULTS: u32 = 10;
const RERANK_MODEL: &str = "jina-reranker-v2-base-multilingual";
const RERANK_TOP_N: usize = 3;

/// Credentials plus endpoint for one HTTP-backed tool.
#[derive(Clone)]
struct Endpoint {
    client: reqwest::Client,
    url: String,
    auth: Auth,
}

#[derive(Clone)]
enum Auth {
    /// `X-API-KEY: <key>`
    ApiKeyHeader(String),
    /// `Authorization: Bearer <key>`
    Bearer(String),
}

impl Endpoint {
    fn new(url: &str, auth: Auth) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            auth,
        }
    }

    /// POST `payload` and return the response body as text.
    async fn post(&self, tool: &str, payload: &Value) -> MaestroResult<String> {
        let request = self.client.post(&self.url).json(payload);
        let request = match &self.auth {
            Auth::ApiKeyHeader(key) => request.header("X-API-KEY", key),
            Auth::Bearer(key) => request.bearer_auth(key),
        };

        let response = request
            .send()
            .await
            .map_err(|e| MaestroError::execution(format!("{tool}: request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MaestroError::execution(format!("{tool}: cannot read response: {e}")))?;

        if !status.is_success() {
            return Err(MaestroError::execution(format!("{tool}: HTTP {}: {body}", status.as_u16())));
        }
        debug!(tool, status = status.as_u16(), bytes = body.len(), "web call succeeded");
        Ok(body)
    }
}

// ── google_search ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueryArgs {
    query: String,
}

/// Google results through Serper. Returns the raw JSON text of the answer.
pub struct GoogleSearchTool {
    descriptor: ToolDescriptor,
    endpoint: Endpoint,
}

impl GoogleSearchTool {
    pub const NAME: &'static str = "google_search";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(Self::NAME, "Searches Google for a given query.")
                .param("query", ParamSpec::required(ParamType::String, "The search query."))
                .output(ParamType::String),
            endpoint: Endpoint::new(SERPER_SEARCH_URL, Auth::ApiKeyHeader(api_key.into())),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint.url = url.into();
        self
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Map<String, Value>, _ctx: &ToolContext) -> MaestroResult<ToolResult> {
        let args: QueryArgs = parse_arguments(arguments)?;
        let body = self
            .endpoint
            .post(Self::NAME, &json!({ "q": args.query, "num": SEARCH_RESULTS }))
            .await?;
        Ok(ToolResult::ok(Value::String(body)))
    }
}

// ── serper_scrape ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScrapeArgs {
    url: String,
}

/// Page content through Serper's scraper, with markdown included.
pub struct SerperScrapeTool {
    descriptor: ToolDescriptor,
    endpoint: Endpoint,
}

impl SerperScrapeTool {
    pub const NAME: &'static str = "serper_scrape";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "Scrapes a website using Serper.dev API to extract information with markdown formatting.",
            )
            .param("url", ParamSpec::required(ParamType::String, "The URL or website name to scrape."))
            .output(ParamType::String),
            endpoint: Endpoint::new(SERPER_SCRAPE_URL, Auth::ApiKeyHeader(api_key.into())),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint.url = url.into();
        self
    }
}

#[async_trait]
impl Tool for SerperScrapeTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Map<String, Value>, _ctx: &ToolContext) -> MaestroResult<ToolResult> {
        let args: ScrapeArgs = parse_arguments(arguments)?;
        if args.url.trim().is_empty() {
            return Err(MaestroError::validation("url must not be empty"));
        }
        let body = self
            .endpoint
            .post(Self::NAME, &json!({ "url": args.url, "includeMarkdown": true }))
            .await?;
        Ok(ToolResult::ok(Value::String(body)))
    }
}

// ── jina_rerank ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RerankArgs {
    query: String,
    documents: Vec<Value>,
}

/// Reorders documents by relevance to a query with Jina's reranker.
/// Returns the service's JSON answer.
pub struct JinaRerankTool {
    descriptor: ToolDescriptor,
    endpoint: Endpoint,
}

impl JinaRerankTool {
    pub const NAME: &'static str = "jina_rerank";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "Reranks documents or links using Jina AI's reranking model.",
            )
            .param(
                "query",
                ParamSpec::required(ParamType::String, "The query to rerank documents or links against."),
            )
            .param(
                "documents",
                ParamSpec::required(ParamType::Array, "List of documents or links to rerank."),
            )
            .output(ParamType::Object),
            endpoint: Endpoint::new(JINA_RERANK_URL, Auth::Bearer(api_key.into())),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint.url = url.into();
        self
    }
}

#[async_trait]
impl Tool for JinaRerankTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Map<String, Value>, _ctx: &ToolContext) -> MaestroResult<ToolResult> {
        let args: RerankArgs = parse_arguments(arguments)?;
        if args.documents.is_empty() {
            return Err(MaestroError::validation("documents must not be empty"));
        }
        let payload = json!({
            "model": RERANK_MODEL,
            "query": args.query,
            "top_n": RERANK_TOP_N.min(args.documents.len()),
            "documents": args.documents,
        });
        let body = self.endpoint.post(Self::NAME, &payload).await?;
        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| MaestroError::execution(format!("{}: malformed response: {e}", Self::NAME)))?;
        Ok(ToolResult::ok(parsed))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use maestro_contracts::error::MaestroError;
    use maestro_core::traits::Tool;

    use super::{GoogleSearchTool, JinaRerankTool, SerperScrapeTool};
    use crate::test_support::ctx;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn search_posts_query_with_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "serper-key"))
            .and(body_json(json!({ "q": "rust agents", "num": 10 })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"organic":[{"title":"t"}]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let tool = GoogleSearchTool::new("serper-key").with_url(format!("{}/search", server.uri()));
        let result = tool.execute(args(json!({ "query": "rust agents" })), &ctx()).await.unwrap();

        assert_eq!(result.data(), Some(&json!(r#"{"organic":[{"title":"t"}]}"#)));
    }

    #[tokio::test]
    async fn scrape_requests_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({ "url": "https://example.com", "includeMarkdown": true })))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Example"))
            .expect(1)
            .mount(&server)
            .await;

        let tool = SerperScrapeTool::new("serper-key").with_url(server.uri());
        let result = tool
            .execute(args(json!({ "url": "https://example.com" })), &ctx())
            .await
            .unwrap();

        assert_eq!(result.data(), Some(&json!("# Example")));
    }

    #[tokio::test]
    async fn rerank_uses_bearer_token_and_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer jina-key"))
            .and(body_json(json!({
                "model": "jina-reranker-v2-base-multilingual",
                "query": "q",
                "top_n": 2,
                "documents": ["a", "b"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "index": 1, "relevance_score": 0.9 }, { "index": 0, "relevance_score": 0.1 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = JinaRerankTool::new("jina-key").with_url(server.uri());
        let result = tool
            .execute(args(json!({ "query": "q", "documents": ["a", "b"] })), &ctx())
            .await
            .unwrap();

        assert_eq!(result.data().unwrap()["results"][0]["index"], 1);
    }

    #[tokio::test]
    async fn non_success_status_is_an_execution_error_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Unauthorized."))
            .mount(&server)
            .await;

        let tool = GoogleSearchTool::new("bad").with_url(server.uri());
        match tool.execute(args(json!({ "query": "x" })), &ctx()).await {
            Err(MaestroError::Execution { reason }) => {
                assert!(reason.contains("403"), "got: {reason}");
                assert!(reason.contains("Unauthorized."), "got: {reason}");
            }
            other => panic!("expected Execution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_documents_are_rejected_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = JinaRerankTool::new("k").with_url(server.uri());
        let result = tool.execute(args(json!({ "query": "q", "documents": [] })), &ctx()).await;
        assert!(matches!(result, Err(MaestroError::Validation { .. })));
    }
}
