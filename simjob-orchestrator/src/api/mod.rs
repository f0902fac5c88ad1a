//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each registered entity type gets its own sub-router whose state is that
//! entity's orchestrator; paths come from the route registry.

pub mod error;
pub mod health;
pub mod simjob;

use axum::{
    Router,
    http::Method,
    routing::{MethodFilter, MethodRouter, get, on},
};
use simjob_core::SimJobError;
use simjob_core::domain::entity::Operation;
use simjob_core::domain::registry::RoutePath;
use std::collections::BTreeSet;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::{Orchestrator, Orchestrators};

/// Create the main API router with all endpoints
pub fn create_router(orchestrators: &Orchestrators) -> Result<Router, SimJobError> {
    let mut seen = BTreeSet::new();
    let mut router = Router::new()
        // Health check
        .route("/health", get(health::health_check));

    for orchestrator in orchestrators.values() {
        for route in &orchestrator.routes().routes {
            if !seen.insert(route.path.clone()) {
                return Err(SimJobError::DuplicateRoute(format!(
                    "path {} is registered twice",
                    route.path
                )));
            }
        }
        router = router.merge(entity_router(orchestrator.clone())?);
        tracing::info!(
            "Mounted {} route(s) for {}",
            orchestrator.routes().routes.len(),
            orchestrator.key()
        );
    }

    Ok(router.layer(TraceLayer::new_for_http()))
}

fn entity_router(orchestrator: Arc<Orchestrator>) -> Result<Router, SimJobError> {
    let mut router = Router::new();
    for route in &orchestrator.routes().routes {
        router = router.route(&route.path, method_router(route)?);
    }
    Ok(router.with_state(orchestrator))
}

fn method_router(route: &RoutePath) -> Result<MethodRouter<Arc<Orchestrator>>, SimJobError> {
    let filter = route
        .method
        .parse::<Method>()
        .ok()
        .and_then(|method| MethodFilter::try_from(method).ok())
        .ok_or_else(|| {
            SimJobError::Config(format!(
                "unsupported method '{}' for {}",
                route.method, route.name
            ))
        })?;

    Ok(match route.operation {
        Operation::Create => on(filter, simjob::create_record),
        Operation::Run => on(filter, simjob::run_job),
        Operation::Poll => on(filter, simjob::poll_job),
        Operation::Download => on(filter, simjob::download_result),
        Operation::DeleteResult => on(filter, simjob::delete_result),
        Operation::DeleteJob => on(filter, simjob::delete_record),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::registry::load_entities;
    use crate::registry::tests::write_entity;
    use crate::repository::InMemoryParameterStore;
    use crate::service::build_orchestrators;
    use crate::service::simjob::tests::FakeSimulator;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use simjob_core::domain::registry::RouteRegistry;
    use simjob_runner::RunnerConfig;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct TestApp {
        _dir: TempDir,
        router: Router,
        orchestrators: Orchestrators,
    }

    fn app(simulator: FakeSimulator) -> TestApp {
        let dir = TempDir::new().unwrap();
        write_entity(dir.path(), "Coverage");
        write_entity(dir.path(), "Beam Hopping");
        let entities = load_entities(&dir.path().join("routes.json")).unwrap();

        let runner =
            RunnerConfig::new("unused", vec![]).with_output_wait(Duration::from_millis(200));
        let config = OrchestratorConfig::new(dir.path().join("data"), runner);
        let orchestrators = build_orchestrators(
            &config,
            entities,
            Arc::new(InMemoryParameterStore::new()),
            Arc::new(simulator),
        );
        let router = create_router(&orchestrators).unwrap();

        TestApp {
            _dir: dir,
            router,
            orchestrators,
        }
    }

    async fn post(app: &TestApp, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn post_json(app: &TestApp, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, bytes) = post(app, uri, Body::from(body.to_string())).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn create_record(app: &TestApp) -> String {
        let (status, body) = post_json(
            app,
            "/coverage/create",
            json!({"name": "LEO sweep", "params": {"a": 1, "b": {"c": 2}}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_duplicate_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_entity(dir.path(), "Coverage");
        write_entity(dir.path(), "Handover");
        let routes_file = dir.path().join("routes.json");
        let mut registry = RouteRegistry::load(&routes_file).unwrap();
        let coverage_run = registry.entities["coverage"].routes[1].path.clone();
        if let Some(handover) = registry.entities.get_mut("handover") {
            handover.routes[1].path = coverage_run;
        }
        registry.save(&routes_file).unwrap();

        let entities = load_entities(&routes_file).unwrap();
        let config = OrchestratorConfig::new(
            dir.path().join("data"),
            RunnerConfig::new("unused", vec![]),
        );
        let orchestrators = build_orchestrators(
            &config,
            entities,
            Arc::new(InMemoryParameterStore::new()),
            Arc::new(FakeSimulator::writing("break,value\n")),
        );

        assert!(matches!(
            create_router(&orchestrators),
            Err(SimJobError::DuplicateRoute(_))
        ));
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(FakeSimulator::writing("break,value\n1,5.0\n"));
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_full_lifecycle_over_http() {
        let app = app(FakeSimulator::writing("break,value\n1,5.0\n"));
        let record_id = create_record(&app).await;

        let (status, body) = post_json(&app, "/coverage/run", json!({"record_id": record_id})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        let job_id = body["data"]["job_id"].as_str().unwrap().to_string();

        app.orchestrators["coverage"]
            .wait(Uuid::parse_str(&job_id).unwrap())
            .await
            .unwrap();

        let (status, body) = post_json(&app, "/coverage/poll", json!({"job_id": job_id})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "succeeded");
        assert!(body["data"]["report_path"].is_string());

        let (status, pdf) = post(
            &app,
            "/coverage/download",
            Body::from(json!({"job_id": job_id}).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(pdf.starts_with(b"%PDF"));

        for _ in 0..2 {
            let (status, body) =
                post_json(&app, "/coverage/delete_result", json!({"job_id": job_id})).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["status"], "deleted");
        }

        let (status, body) = post_json(&app, "/coverage/download", json!({"job_id": job_id})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");

        let (status, _) =
            post_json(&app, "/coverage/delete_job", json!({"record_id": record_id})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = post_json(&app, "/coverage/run", json!({"record_id": record_id})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_while_running_is_accepted() {
        let app = app(FakeSimulator {
            delay: Duration::from_millis(300),
            ..FakeSimulator::writing("break,value\n1,5.0\n")
        });
        let record_id = create_record(&app).await;
        let (_, body) = post_json(&app, "/coverage/run", json!({"record_id": record_id})).await;
        let job_id = body["data"]["job_id"].as_str().unwrap().to_string();

        let (status, body) = post_json(&app, "/coverage/download", json!({"job_id": job_id})).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "info");

        let (status, body) = post_json(&app, "/coverage/run", json!({"record_id": record_id})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let app = app(FakeSimulator::writing("break,value\n"));

        let (status, _) = post_json(&app, "/coverage/run", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(&app, "/coverage/poll", json!({"job_id": "nope"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(&app, "/coverage/create", json!({"params": {}})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, bytes) = post(&app, "/coverage/poll", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let app = app(FakeSimulator::writing("break,value\n"));
        let unknown = Uuid::new_v4().to_string();

        for uri in ["/coverage/poll", "/coverage/download", "/coverage/delete_result"] {
            let (status, _) = post_json(&app, uri, json!({"job_id": unknown})).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_records_are_scoped_to_their_entity() {
        let app = app(FakeSimulator::writing("break,value\n1,5.0\n"));
        let record_id = create_record(&app).await;

        let (status, _) =
            post_json(&app, "/beam_hopping/run", json!({"record_id": record_id})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
