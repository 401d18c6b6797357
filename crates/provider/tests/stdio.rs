use std::time::Duration;

use serde_json::{Value, json};
use toolbridge_core::{
    OrchestratorBuilder, ProviderLaunch, ResourceGuard, Session, SessionError,
    SessionOptions, SessionState,
};
use toolbridge_model::{ContentPart, ToolCallRequest};
use toolbridge_test_model::{PresetResponse, TestModelProvider};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CALL_TIMEOUT: Duration = Duration::from_secs(15);

async fn healthy_web_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/healthcheck"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": "server is running fine!!"
        })))
        .mount(&server)
        .await;
    server
}

fn guard_for(web_server: &MockServer) -> ResourceGuard {
    let launch = ProviderLaunch::new(env!("CARGO_BIN_EXE_toolbridge-provider"))
        .with_env(
            "HEALTHCHECK_URL",
            format!("{}/api/v1/healthcheck", web_server.uri()),
        );
    ResourceGuard::new(launch, SessionOptions::default())
}

#[tokio::test]
async fn test_list_and_call() {
    let web_server = healthy_web_server().await;
    let (tools, result, not_found) = guard_for(&web_server)
        .run(async |session: &mut Session| {
            let server_info =
                session.server().unwrap().server_info.clone().unwrap();
            assert_eq!(server_info.name, "toolbridge-provider");

            let tools = session.list_tools().await.unwrap();
            let result = session
                .call_tool("get_healthcheck", json!({}), CALL_TIMEOUT)
                .await
                .unwrap();
            let not_found = session
                .call_tool("get_weather", json!({}), CALL_TIMEOUT)
                .await
                .unwrap_err();
            assert_eq!(session.state(), SessionState::Ready);
            (tools, result, not_found)
        })
        .await
        .unwrap();

    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "get_healthcheck");
    assert_eq!(tools[0].input_schema["type"], "object");

    assert!(!result.is_error);
    let report: Value = serde_json::from_str(&result.text()).unwrap();
    assert_eq!(report["status"], "ok");

    assert!(matches!(not_found, SessionError::ToolNotFound { .. }));
}

#[tokio::test]
async fn test_query_with_tool_call() {
    let web_server = healthy_web_server().await;

    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_turn();
    model_provider.add_assistant_turn(PresetResponse::with_parts([
        ContentPart::ToolUse(ToolCallRequest {
            id: "toolu_1".to_owned(),
            name: "get_healthcheck".to_owned(),
            input: json!({}),
        }),
    ]));
    model_provider.add_user_turn();
    model_provider.add_assistant_turn(PresetResponse::with_parts([
        ContentPart::text("The web server is running fine."),
    ]));
    let orchestrator = OrchestratorBuilder::with_model_provider(model_provider)
        .with_tool_timeout(CALL_TIMEOUT)
        .build();

    let output = guard_for(&web_server)
        .run(async |session: &mut Session| {
            orchestrator
                .process_query(session, "is the web server healthy?")
                .await
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        output.transcript.to_string(),
        "invoking tool get_healthcheck with {}\nThe web server is running fine."
    );
    assert_eq!(output.conversation.tool_result_count(), 1);
}

#[tokio::test]
async fn test_unreachable_web_server() {
    let launch = ProviderLaunch::new(env!("CARGO_BIN_EXE_toolbridge-provider"))
        .with_env("HEALTHCHECK_URL", "http://127.0.0.1:9/api/v1/healthcheck");
    let result = ResourceGuard::new(launch, SessionOptions::default())
        .run(async |session: &mut Session| {
            session
                .call_tool("get_healthcheck", json!({}), CALL_TIMEOUT)
                .await
        })
        .await
        .unwrap()
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(result.text(), r#"{"error":"Failed to get healthcheck"}"#);
}
