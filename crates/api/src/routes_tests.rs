use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use engine::{
    ExecutionStatus, LocalEngine, OrchestrationClient, RegisterOptions, WorkerHost,
    WorkflowContext, WorkflowFn,
};
use futures::FutureExt;
use serde_json::{json, Value};
use settings::TemporalSection;
use tower::ServiceExt;

use crate::{router, AppState};

// ============================================================
// Fixtures
// ============================================================

const CONFIG: &str = r#"
http:
  addr: ":9090"
temporal:
  hostPort: "temporal:7233"
  namespace: ""
"#;

struct TestApp {
    router: Router,
    engine: LocalEngine,
    dir: tempfile::TempDir,
}

/// Waits for an `approve` signal and returns its payload.
fn approval_workflow() -> WorkflowFn {
    Arc::new(|ctx: WorkflowContext, _args: Vec<Value>| {
        async move { Ok::<_, anyhow::Error>(ctx.receive_signal("approve").await) }.boxed()
    })
}

fn test_app(config: &str) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.yaml"), config).unwrap();
    std::fs::write(dir.path().join("openapi.yaml"), "openapi: 3.0.3\n").unwrap();

    let engine = LocalEngine::new("default");
    let mut worker = engine.worker(settings::DEFAULT_TASK_QUEUE);
    workflow::register_all(&mut worker, &workflow::builtin().unwrap(), activities::builtin())
        .unwrap();
    worker
        .register_workflow(
            approval_workflow(),
            RegisterOptions {
                name: "Approval".into(),
            },
        )
        .unwrap();
    tokio::spawn(worker.run(std::future::pending::<()>()));

    let facade =
        OrchestrationClient::from_client(Arc::new(engine.clone()), &TemporalSection::default());
    let router = router(AppState {
        facade: Arc::new(facade),
        config_path: dir.path().join("config.yaml"),
        openapi_path: dir.path().join("openapi.yaml"),
    });
    TestApp {
        router,
        engine,
        dir,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

async fn wait_closed(engine: &LocalEngine, workflow_id: &str) {
    for _ in 0..1000 {
        if engine.status(workflow_id) != Some(ExecutionStatus::Running) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("workflow {workflow_id} did not close");
}

async fn start(app: &TestApp, body: Value) -> String {
    let resp = send(app, post_json("/v1/workflow/start", body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(!body["runId"].as_str().unwrap().is_empty());
    body["workflowId"].as_str().unwrap().to_string()
}

// ============================================================
// Start / status
// ============================================================

#[tokio::test]
async fn start_then_status_reports_completion() {
    let app = test_app(CONFIG);
    let workflow_id = start(&app, json!({ "name": "SampleWorkflow", "version": "v1" })).await;
    assert!(workflow_id.starts_with("SampleWorkflow-"));

    wait_closed(&app.engine, &workflow_id).await;
    let resp = send(&app, get(&format!("/v1/workflow/{workflow_id}/status"))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let info = &body["workflowExecutionInfo"]["workflowExecutionInfo"];
    assert_eq!(info["status"], "WORKFLOW_EXECUTION_STATUS_COMPLETED");
    assert_eq!(info["execution"]["workflowId"], json!(workflow_id));
    assert_eq!(body["workflowExecutionInfo"]["result"], "ok");
}

#[tokio::test]
async fn dsl_workflow_started_over_http_produces_bindings() {
    let app = test_app(CONFIG);
    let workflow_id = start(
        &app,
        json!({
            "name": "DSLWorkflow",
            "input": {
                "variables": { "to": "ops@example.com" },
                "root": { "activity": {
                    "name": "SampleActivitySendEmail", "arguments": ["to"], "result": "sent"
                } }
            }
        }),
    )
    .await;

    wait_closed(&app.engine, &workflow_id).await;
    let body = body_json(send(&app, get(&format!("/v1/workflow/{workflow_id}/status"))).await).await;
    assert_eq!(
        body["workflowExecutionInfo"]["result"]["sent"],
        "email_sent_to_ops@example.com"
    );
}

#[tokio::test]
async fn start_without_name_is_a_validation_error() {
    let app = test_app(CONFIG);
    let resp = send(&app, post_json("/v1/workflow/start", json!({ "version": "v1" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "name is required", "kind": "validation" })
    );
}

#[tokio::test]
async fn malformed_start_body_is_a_validation_error() {
    let app = test_app(CONFIG);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/workflow/start")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = send(&app, request).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["kind"], "validation");

    let resp = send(
        &app,
        post_json("/v1/workflow/start", json!({ "name": "SampleWorkflow", "input": [1, 2] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_of_unknown_workflow_is_not_found() {
    let app = test_app(CONFIG);
    let resp = send(&app, get("/v1/workflow/nope/status")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "workflow execution not found: nope", "kind": "not_found" })
    );
}

#[tokio::test]
async fn blank_workflow_id_is_a_validation_error() {
    let app = test_app(CONFIG);
    let resp = send(&app, get("/v1/workflow/%20/status")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "workflowId is required", "kind": "validation" })
    );

    let resp = send(
        &app,
        post_json("/v1/workflow/%20%20/signal", json!({ "signalName": "approve" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "workflowId is required");
}

// ============================================================
// Signal
// ============================================================

#[tokio::test]
async fn signal_reaches_a_waiting_workflow() {
    let app = test_app(CONFIG);
    let workflow_id = start(&app, json!({ "name": "Approval" })).await;

    let resp = send(
        &app,
        post_json(
            &format!("/v1/workflow/{workflow_id}/signal"),
            json!({ "signalName": "approve", "payload": { "by": "alice" } }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.is_empty());

    wait_closed(&app.engine, &workflow_id).await;
    let body = body_json(send(&app, get(&format!("/v1/workflow/{workflow_id}/status"))).await).await;
    assert_eq!(body["workflowExecutionInfo"]["result"], json!({ "by": "alice" }));
}

#[tokio::test]
async fn signal_without_name_is_rejected() {
    let app = test_app(CONFIG);
    let resp = send(
        &app,
        post_json("/v1/workflow/anything/signal", json!({ "payload": {} })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "signalName is required", "kind": "validation" })
    );
}

#[tokio::test]
async fn signal_to_a_closed_workflow_conflicts() {
    let app = test_app(CONFIG);
    let workflow_id = start(&app, json!({ "name": "SampleWorkflow" })).await;
    wait_closed(&app.engine, &workflow_id).await;

    let resp = send(
        &app,
        post_json(
            &format!("/v1/workflow/{workflow_id}/signal"),
            json!({ "signalName": "approve" }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["kind"], "already_completed");
}

// ============================================================
// Info / swagger
// ============================================================

#[tokio::test]
async fn info_reports_config_values_as_written() {
    let app = test_app(CONFIG);
    let resp = send(&app, get("/v1/info")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({
            "httpAddr": ":9090",
            "temporal": { "hostPort": "temporal:7233", "namespace": "", "defaultTaskQueue": "" }
        })
    );
}

#[tokio::test]
async fn info_defaults_http_addr_and_rereads_the_file() {
    let app = test_app("temporal:\n  namespace: ns1\n");
    let body = body_json(send(&app, get("/v1/info")).await).await;
    assert_eq!(body["httpAddr"], ":8888");
    assert_eq!(body["temporal"]["namespace"], "ns1");

    std::fs::write(app.dir.path().join("config.yaml"), "temporal:\n  namespace: ns2\n").unwrap();
    let body = body_json(send(&app, get("/v1/info")).await).await;
    assert_eq!(body["temporal"]["namespace"], "ns2");
}

#[tokio::test]
async fn unreadable_config_is_a_server_error() {
    let app = test_app("http: [unclosed");
    let resp = send(&app, get("/v1/info")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["kind"], "config");
}

#[tokio::test]
async fn swagger_page_points_at_the_spec() {
    let app = test_app(CONFIG);
    let resp = send(&app, get("/swagger")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(body_text(resp).await.contains("url: '/swagger/openapi.yaml'"));

    let resp = send(&app, get("/swagger/openapi.yaml")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/yaml; charset=utf-8"
    );
    assert_eq!(body_text(resp).await, "openapi: 3.0.3\n");
}

#[tokio::test]
async fn missing_spec_file_is_an_io_error() {
    let app = test_app(CONFIG);
    std::fs::remove_file(app.dir.path().join("openapi.yaml")).unwrap();
    let resp = send(&app, get("/swagger/openapi.yaml")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["kind"], "io");
}
