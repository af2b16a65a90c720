pub mod chat;
pub mod documents;
pub mod health;
pub mod ui;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Multipart framing rides on top of the file itself.
    let upload_limit = state.config.documents.max_upload_bytes + 64 * 1024;

    let session_routes = Router::new()
        .route("/api/sessions", post(chat::create_session))
        .route(
            "/api/sessions/{id}",
            get(chat::get_session).delete(chat::delete_session),
        )
        .route("/api/sessions/{id}/persona", put(chat::update_persona))
        .route("/api/sessions/{id}/messages", post(chat::send_message))
        .route(
            "/api/sessions/{id}/documents",
            get(documents::list)
                .post(documents::upload)
                .layer(DefaultBodyLimit::max(upload_limit)),
        );

    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/ui", get(ui::get_ui))
        .merge(session_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AppConfig, DocumentsConfig, FeatureFlags, LlmConfig, SecretsConfig, ServerConfig,
        SessionsConfig,
    };
    use crate::services::llm_provider::ChatBackend;
    use crate::services::pdf::DEFAULT_CHUNK_SIZE;
    use crate::services::secrets::{SecretStore, COHERE_API_KEY};
    use crate::session::tests::{GatedBackend, ScriptedBackend};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const LETTER_PDF: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/fixtures/two_page_letter.pdf"
    ));

    fn test_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            llm: LlmConfig {
                provider: "cohere".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
                model: None,
            },
            documents: DocumentsConfig {
                chunk_size: DEFAULT_CHUNK_SIZE,
                max_upload_bytes: 1024 * 1024,
            },
            sessions: SessionsConfig {
                idle_ttl_secs: 3600,
                sweep_interval_secs: 300,
            },
            secrets: SecretsConfig {
                path: "config/secrets.toml".to_string(),
            },
            features: FeatureFlags {
                document_upload_enabled: true,
                document_grounding: false,
            },
        }
    }

    fn app_with(backend: Arc<dyn ChatBackend>, secrets: SecretStore) -> (Router, AppState) {
        app_with_config(test_config(), backend, secrets)
    }

    fn app_with_config(
        config: AppConfig,
        backend: Arc<dyn ChatBackend>,
        secrets: SecretStore,
    ) -> (Router, AppState) {
        let state = AppState::new(config, backend, secrets);
        (router(state.clone()), state)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let req = Request::builder()
            .method("POST")
            .uri("/api/sessions")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ui_reports_credential_requirement() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let req = Request::builder().uri("/api/ui").body(Body::empty()).unwrap();
        let (_, body) = send(&app, req).await;
        assert_eq!(body["title"], "💬 Email Drafter");
        assert_eq!(body["credential_required"], true);
        assert_eq!(body["tones"], json!(["Default", "Formal", "Semi-formal", "Casual"]));
        assert_eq!(body["voices"].as_array().unwrap().len(), 6);

        let managed = SecretStore::from_pairs([(COHERE_API_KEY, "managed")]);
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), managed);
        let req = Request::builder().uri("/api/ui").body(Body::empty()).unwrap();
        let (_, body) = send(&app, req).await;
        assert_eq!(body["credential_required"], false);
    }

    #[tokio::test]
    async fn test_new_session_starts_with_greeting() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let id = create_session(&app).await;

        let req = Request::builder()
            .uri(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"][0]["role"], "assistant");
        assert_eq!(body["persona"], json!({"tone": "Default", "voice": "Default"}));
    }

    #[tokio::test]
    async fn test_send_message_with_entered_key() {
        let backend = Arc::new(ScriptedBackend::replying("Subject: Thank you"));
        let (app, _) = app_with(backend.clone(), SecretStore::default());
        let id = create_session(&app).await;

        let mut req = json_request(
            "POST",
            &format!("/api/sessions/{id}/messages"),
            json!({"message": "Draft a thank-you note", "tone": "Casual", "voice": "Informative"}),
        );
        req.headers_mut()
            .insert(header::AUTHORIZATION, "Bearer valid".parse().unwrap());

        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Subject: Thank you");

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "user");
        assert!(messages[1]["text"]
            .as_str()
            .unwrap()
            .ends_with("tone: Casual, voice: Informative"));
        assert_eq!(messages[2]["text"], "Subject: Thank you");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_send_message_without_key_is_rejected() {
        let backend = Arc::new(ScriptedBackend::replying("never"));
        let (app, state) = app_with(backend.clone(), SecretStore::default());
        let id = create_session(&app).await;

        let req = json_request(
            "POST",
            &format!("/api/sessions/{id}/messages"),
            json!({"message": "hello"}),
        );
        let (status, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Please add your Cohere API key to continue.");
        assert_eq!(backend.calls(), 0);

        let handle = state.sessions.get(&id).await.unwrap();
        assert_eq!(handle.read(|s| s.messages().len()).await, 1);
    }

    #[tokio::test]
    async fn test_managed_key_used_without_header() {
        let backend = Arc::new(ScriptedBackend::replying("ok"));
        let managed = SecretStore::from_pairs([(COHERE_API_KEY, "managed")]);
        let (app, _) = app_with(backend.clone(), managed);
        let id = create_session(&app).await;

        let req = json_request(
            "POST",
            &format!("/api/sessions/{id}/messages"),
            json!({"message": "hello"}),
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_maps_to_bad_gateway() {
        let backend = Arc::new(ScriptedBackend::failing());
        let (app, state) = app_with(backend, SecretStore::default());
        let id = create_session(&app).await;

        let req = json_request(
            "POST",
            &format!("/api/sessions/{id}/messages"),
            json!({"message": "hello", "api_key": "k"}),
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("scripted failure"));

        let handle = state.sessions.get(&id).await.unwrap();
        assert_eq!(handle.read(|s| s.messages().len()).await, 1);
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_reads_proceed_during_slow_reply() {
        let backend = Arc::new(GatedBackend::default());
        let (app, _) = app_with(backend.clone(), SecretStore::default());
        let id = create_session(&app).await;
        let uri = format!("/api/sessions/{id}/messages");

        let first = tokio::spawn({
            let app = app.clone();
            let req = json_request("POST", &uri, json!({"message": "hello", "api_key": "k"}));
            async move { send(&app, req).await }
        });
        backend.started.notified().await;

        let (status, body) = tokio::time::timeout(
            Duration::from_secs(1),
            send(&app, get_request(&format!("/api/sessions/{id}"))),
        )
        .await
        .expect("transcript read waited on the remote call");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);

        let (status, _) = tokio::time::timeout(
            Duration::from_secs(1),
            send(&app, get_request(&format!("/api/sessions/{id}/documents"))),
        )
        .await
        .expect("document list waited on the remote call");
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            json_request("PUT", &format!("/api/sessions/{id}/persona"), json!({"tone": "Formal"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            json_request("POST", &uri, json!({"message": "again", "api_key": "k"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        backend.release.notify_one();
        let (status, body) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Subject: Released");
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_message_and_bad_label() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let id = create_session(&app).await;
        let uri = format!("/api/sessions/{id}/messages");

        let (status, _) = send(&app, json_request("POST", &uri, json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            json_request("POST", &uri, json!({"message": "hi", "tone": "Fomal", "api_key": "k"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown tone 'Fomal'");
    }

    #[tokio::test]
    async fn test_update_persona() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let id = create_session(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/sessions/{id}/persona"),
                json!({"tone": "Semi-formal"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selected_tone"], "Selected tone: Semi-formal");
        assert_eq!(body["selected_voice"], "Selected voice: Default");
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_sessions() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());

        let req = Request::builder()
            .uri("/api/sessions/nope")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = create_session(&app).await;
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let req = Request::builder()
            .uri(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    fn multipart_request(uri: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let boundary = "X-EMAIL-DRAFTER-BOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let id = create_session(&app).await;

        let req = multipart_request(
            &format!("/api/sessions/{id}/documents"),
            "notes.txt",
            "text/plain",
            b"hello",
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only PDF files are supported");
    }

    #[tokio::test]
    async fn test_upload_invalid_pdf_is_unprocessable() {
        let (app, state) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let id = create_session(&app).await;

        let req = multipart_request(
            &format!("/api/sessions/{id}/documents"),
            "broken.pdf",
            "application/pdf",
            b"this is not a pdf",
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let handle = state.sessions.get(&id).await.unwrap();
        assert!(handle.read(|s| s.documents().is_empty()).await);

        let req = Request::builder()
            .uri(format!("/api/sessions/{id}/documents"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_upload_pdf_then_list() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let id = create_session(&app).await;
        let uri = format!("/api/sessions/{id}/documents");

        let req = multipart_request(&uri, "letter.pdf", "application/pdf", LETTER_PDF);
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "letter.pdf");
        assert_eq!(body["snippet_count"], 2);
        assert_eq!(body["titles"], json!(["Page 1 Part 1", "Page 2 Part 1"]));

        let (status, listed) = send(&app, get_request(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0]["snippet"].as_str().unwrap().contains("Invoice 42"));
        assert!(listed[1]["snippet"].as_str().unwrap().contains("Overdue"));
    }

    #[tokio::test]
    async fn test_reupload_replaces_documents() {
        let (app, _) = app_with(Arc::new(ScriptedBackend::replying("x")), SecretStore::default());
        let id = create_session(&app).await;
        let uri = format!("/api/sessions/{id}/documents");

        for _ in 0..2 {
            let req = multipart_request(&uri, "letter.pdf", "application/octet-stream", LETTER_PDF);
            let (status, _) = send(&app, req).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, listed) = send(&app, get_request(&uri)).await;
        let titles: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Page 1 Part 1", "Page 2 Part 1"]);
    }

    #[tokio::test]
    async fn test_upload_during_slow_reply() {
        let backend = Arc::new(GatedBackend::default());
        let (app, _) = app_with(backend.clone(), SecretStore::default());
        let id = create_session(&app).await;

        let turn = tokio::spawn({
            let app = app.clone();
            let req = json_request(
                "POST",
                &format!("/api/sessions/{id}/messages"),
                json!({"message": "hello", "api_key": "k"}),
            );
            async move { send(&app, req).await }
        });
        backend.started.notified().await;

        let req = multipart_request(
            &format!("/api/sessions/{id}/documents"),
            "letter.pdf",
            "application/pdf",
            LETTER_PDF,
        );
        let (status, body) = tokio::time::timeout(Duration::from_secs(5), send(&app, req))
            .await
            .expect("upload waited on the remote call");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["snippet_count"], 2);

        backend.release.notify_one();
        assert_eq!(turn.await.unwrap().0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_disabled_is_forbidden() {
        let mut config = test_config();
        config.features.document_upload_enabled = false;
        let (app, state) = app_with_config(
            config,
            Arc::new(ScriptedBackend::replying("x")),
            SecretStore::default(),
        );
        let id = create_session(&app).await;

        let req = multipart_request(
            &format!("/api/sessions/{id}/documents"),
            "letter.pdf",
            "application/pdf",
            LETTER_PDF,
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let handle = state.sessions.get(&id).await.unwrap();
        assert!(handle.read(|s| s.documents().is_empty()).await);
    }
}
