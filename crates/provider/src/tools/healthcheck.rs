use std::time::Duration;

use reqwest::{Client, RequestBuilder, header};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use toolbridge_protocol::Content;

use crate::tool::{Tool, ToolOutput};

/// Where the web server reports its health by default.
pub const DEFAULT_HEALTHCHECK_URL: &str =
    "http://localhost:6000/api/v1/healthcheck";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The tool takes no arguments.
#[derive(Deserialize, JsonSchema)]
pub struct HealthcheckArguments {}

/// A tool that reports the health of a web server.
///
/// The server's JSON answer is returned as is. Any failure, be it the
/// connection, a non-success status or a malformed body, is reported as
/// `{"error": "Failed to get healthcheck"}` rather than a tool error.
pub struct HealthcheckTool {
    client: Client,
    url: String,
}

impl HealthcheckTool {
    /// Creates a healthcheck tool querying `url`.
    #[inline]
    pub fn new<S: Into<String>>(url: S) -> Self {
        HealthcheckTool {
            client: Client::new(),
            url: url.into(),
        }
    }
}

impl Default for HealthcheckTool {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_HEALTHCHECK_URL)
    }
}

impl Tool for HealthcheckTool {
    const NAME: &'static str = "get_healthcheck";
    type Arguments = HealthcheckArguments;

    fn description(&self) -> &str {
        r#"
Get the health status of the web server.
Returns the server's JSON report, e.g. {"status": "ok", "message": "server is running fine!!"},
or {"error": "Failed to get healthcheck"} when the server can't be reached."#
    }

    #[allow(clippy::manual_async_fn)]
    fn call(
        &self,
        _arguments: HealthcheckArguments,
    ) -> impl Future<Output = ToolOutput> + Send + 'static {
        let request = self
            .client
            .get(&self.url)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .timeout(REQUEST_TIMEOUT);
        let url = self.url.clone();
        async move {
            let report = match fetch_report(request).await {
                Ok(report) => report,
                Err(err) => {
                    warn!("failed to get healthcheck from {url}: {err}");
                    json!({ "error": "Failed to get healthcheck" })
                }
            };
            Ok(vec![Content::text(report.to_string())])
        }
    }
}

async fn fetch_report(request: RequestBuilder) -> reqwest::Result<Value> {
    request.send().await?.error_for_status()?.json().await
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::tool::Toolbox;

    async fn report_of(tool: &HealthcheckTool) -> String {
        let content = tool.call(HealthcheckArguments {}).await.unwrap();
        match content.as_slice() {
            [Content::Text { text }] => text.clone(),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_healthy_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/healthcheck"))
            .and(header("accept", "application/json"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": "server is running fine!!"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool =
            HealthcheckTool::new(format!("{}/api/v1/healthcheck", server.uri()));
        let report: Value =
            serde_json::from_str(&report_of(&tool).await).unwrap();
        assert_eq!(report["status"], "ok");
    }

    #[tokio::test]
    async fn test_failures_are_reported_in_band() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tool =
            HealthcheckTool::new(format!("{}/api/v1/healthcheck", server.uri()));
        assert_eq!(
            report_of(&tool).await,
            r#"{"error":"Failed to get healthcheck"}"#
        );

        // Nothing listens on the discard port.
        let tool = HealthcheckTool::new("http://127.0.0.1:9/api/v1/healthcheck");
        assert_eq!(
            report_of(&tool).await,
            r#"{"error":"Failed to get healthcheck"}"#
        );
    }

    #[test]
    fn test_descriptor() {
        let toolbox = Toolbox::default().with_tool(HealthcheckTool::default());
        let descriptor = &toolbox.descriptors()[0];
        assert_eq!(descriptor.name, "get_healthcheck");
        assert_eq!(descriptor.input_schema["type"], "object");
    }
}
