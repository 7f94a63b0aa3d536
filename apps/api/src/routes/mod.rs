pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::cv::{handlers as cv, output};
use crate::editor::handlers as editor;
use crate::generation::handlers as generation;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sections", get(output::handle_list_sections))
        // Profile library
        .route("/api/v1/profile", get(profile::handle_get_profile))
        .route(
            "/api/v1/profile/items",
            put(profile::handle_upsert_profile_item),
        )
        .route(
            "/api/v1/profile/items/:id",
            delete(profile::handle_delete_profile_item),
        )
        // CV documents
        .route(
            "/api/v1/cvs",
            post(cv::handle_create_cv).get(cv::handle_list_cvs),
        )
        .route(
            "/api/v1/cvs/:id",
            get(cv::handle_get_cv).delete(cv::handle_delete_cv),
        )
        .route("/api/v1/cvs/:id/archive", post(cv::handle_archive_cv))
        .route("/api/v1/cvs/:id/restore", post(cv::handle_restore_cv))
        .route(
            "/api/v1/cvs/:id/display-settings",
            put(cv::handle_update_display_settings),
        )
        .route(
            "/api/v1/cvs/:id/page-breaks/toggle",
            post(cv::handle_toggle_page_break),
        )
        .route(
            "/api/v1/cvs/:id/selections",
            get(cv::handle_list_selections).put(cv::handle_upsert_selections),
        )
        .route(
            "/api/v1/cvs/:id/selections/reorder",
            post(cv::handle_reorder_selections),
        )
        // Layout and exports
        .route("/api/v1/cvs/:id/layout", get(output::handle_get_layout))
        .route("/api/v1/cvs/:id/preview", get(output::handle_get_preview))
        .route("/api/v1/cvs/:id/overflow", post(output::handle_check_overflow))
        .route("/api/v1/cvs/:id/export.html", get(output::handle_export_html))
        .route("/api/v1/cvs/:id/export.pdf", get(output::handle_export_pdf))
        // AI generation
        .route("/api/v1/cvs/:id/generate", post(generation::handle_generate))
        .route(
            "/api/v1/cvs/:id/regenerate",
            post(generation::handle_regenerate),
        )
        // Editor auto-save sessions
        .route("/api/v1/editor/sessions", post(editor::handle_open_session))
        .route(
            "/api/v1/editor/sessions/:sid",
            get(editor::handle_session_status)
                .patch(editor::handle_schedule_edit)
                .delete(editor::handle_close_session),
        )
        .route(
            "/api/v1/editor/sessions/:sid/flush",
            post(editor::handle_flush_session),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Method, Request, StatusCode};
    use bytes::Bytes;
    use serde_json::{json, Value};
    use tokio::sync::Notify;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::generation::{
        ContentGenerator, GeneratedContent, GeneratedField, GenerationAction, GenerationContext,
    };
    use crate::layout::PageFormat;
    use crate::llm_client::LlmError;
    use crate::pdf::{PdfError, PdfRenderer};
    use crate::store::MemoryStore;

    // ────────────────────────────────────────────────────────────────────────
    // Collaborator doubles
    // ────────────────────────────────────────────────────────────────────────

    /// Answers every request with fixed content; optionally parks until released.
    #[derive(Default)]
    struct StubGenerator {
        gate: Option<Arc<Notify>>,
        contexts: Mutex<Vec<GenerationContext>>,
    }

    #[async_trait]
    impl ContentGenerator for StubGenerator {
        async fn generate(
            &self,
            context: &GenerationContext,
            fields: &[GeneratedField],
        ) -> Result<GeneratedContent, LlmError> {
            self.contexts.lock().unwrap().push(context.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(GeneratedContent {
                tagline: Some("Calm, precise backend engineer".to_string()),
                profile_summary: Some("Builds reliable services.".to_string()),
                languages: None,
                certifications: Some(vec!["CKA".to_string()]),
            }
            .retain(fields))
        }
    }

    #[derive(Default)]
    struct StubPdf {
        formats: Mutex<Vec<PageFormat>>,
        documents: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PdfRenderer for StubPdf {
        async fn render(&self, html: &str, format: PageFormat) -> Result<Bytes, PdfError> {
            self.formats.lock().unwrap().push(format);
            self.documents.lock().unwrap().push(html.to_string());
            Ok(Bytes::from_static(b"%PDF-1.7 stub"))
        }
    }

    struct Harness {
        app: Router,
        state: AppState,
        pdf: Arc<StubPdf>,
        generator: Arc<StubGenerator>,
    }

    fn harness_with(generator: StubGenerator) -> Harness {
        let generator = Arc::new(generator);
        let pdf = Arc::new(StubPdf::default());
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            generator.clone(),
            pdf.clone(),
            Duration::from_millis(50),
        );
        Harness {
            app: build_router(state.clone()),
            state,
            pdf,
            generator,
        }
    }

    fn harness() -> Harness {
        harness_with(StubGenerator::default())
    }

    async fn send_raw(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, bytes) = send_raw(app, method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Creates a CV with two work entries and one skill group; returns (cv_id, work ids).
    async fn seed(app: &Router) -> (String, Vec<String>) {
        let user_id = Uuid::new_v4();
        let (status, cv) = send(
            app,
            Method::POST,
            "/api/v1/cvs",
            Some(json!({
                "user_id": user_id,
                "title": "Backend CV",
                "content": {"personal": {"full_name": "Alex Muster", "email": "alex@example.com"}}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let cv_id = cv["id"].as_str().unwrap().to_string();

        let mut work_ids = Vec::new();
        for (order, company) in ["Acme", "Globex"].iter().enumerate() {
            let id = Uuid::new_v4();
            let (status, _) = send(
                app,
                Method::PUT,
                "/api/v1/profile/items",
                Some(json!({
                    "kind": "work_experience",
                    "id": id,
                    "user_id": user_id,
                    "company": company,
                    "position": "Engineer",
                    "bullets": ["Shipped things", "Fixed things"],
                    "display_order": order
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            work_ids.push(id.to_string());
        }

        let (status, _) = send(
            app,
            Method::PUT,
            "/api/v1/profile/items",
            Some(json!({
                "kind": "skill_category",
                "id": Uuid::new_v4(),
                "user_id": user_id,
                "name": "Languages",
                "skills": ["Rust", "Go"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        (cv_id, work_ids)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Tests
    // ────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let (status, body) = send(&h.app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "cvstudio-api");
    }

    #[tokio::test]
    async fn test_section_catalog_is_localized() {
        let h = harness();
        let (status, body) = send(&h.app, Method::GET, "/api/v1/sections?locale=de", None).await;
        assert_eq!(status, StatusCode::OK);
        let sections = body.as_array().unwrap();
        assert_eq!(sections.len(), 10);
        assert_eq!(sections[0]["key"], "header");
    }

    #[tokio::test]
    async fn test_page_break_toggle_drives_layout_preview_and_export() {
        let h = harness();
        let (cv_id, work_ids) = seed(&h.app).await;

        let (status, body) = send(
            &h.app,
            Method::POST,
            &format!("/api/v1/cvs/{cv_id}/page-breaks/toggle"),
            Some(json!({"id": work_ids[1]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], true);

        let (status, plan) = send(&h.app, Method::GET, &format!("/api/v1/cvs/{cv_id}/layout"), None).await;
        assert_eq!(status, StatusCode::OK);
        let pages = plan["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1]["main"][0]["section"], "experience");
        assert_eq!(pages[1]["main"][0]["show_title"], false);

        let (_, preview) = send(&h.app, Method::GET, &format!("/api/v1/cvs/{cv_id}/preview"), None).await;
        assert_eq!(preview["pages"].as_array().unwrap().len(), 2);

        let (status, headers, html) = send_raw(
            &h.app,
            Method::GET,
            &format!("/api/v1/cvs/{cv_id}/export.html"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
        let html = String::from_utf8(html.to_vec()).unwrap();
        assert_eq!(html.matches("<section class=\"cv-page").count(), 2);

        // Toggling again removes the marker.
        let (_, body) = send(
            &h.app,
            Method::POST,
            &format!("/api/v1/cvs/{cv_id}/page-breaks/toggle"),
            Some(json!({"id": work_ids[1]})),
        )
        .await;
        assert_eq!(body["active"], false);
        assert_eq!(body["page_breaks"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_page_break_target_is_rejected() {
        let h = harness();
        let (cv_id, _) = seed(&h.app).await;
        let (status, body) = send(
            &h.app,
            Method::POST,
            &format!("/api/v1/cvs/{cv_id}/page-breaks/toggle"),
            Some(json!({"id": "not-a-section"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_cv_is_404() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            Method::GET,
            &format!("/api/v1/cvs/{}/layout", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_selections_reorder_and_hide() {
        let h = harness();
        let (cv_id, work_ids) = seed(&h.app).await;

        let (status, _) = send(
            &h.app,
            Method::POST,
            &format!("/api/v1/cvs/{cv_id}/selections/reorder"),
            Some(json!({"item_ids": [work_ids[1], work_ids[0]]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, preview) = send(&h.app, Method::GET, &format!("/api/v1/cvs/{cv_id}/preview"), None).await;
        let experience = preview["pages"][0]["main"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["section"] == "experience")
            .unwrap()
            .clone();
        assert_eq!(experience["blocks"][0]["subheading"], "Globex");

        let (status, _) = send(
            &h.app,
            Method::PUT,
            &format!("/api/v1/cvs/{cv_id}/selections"),
            Some(json!([{
                "cv_id": cv_id,
                "item_id": work_ids[0],
                "is_selected": false
            }])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, plan) = send(&h.app, Method::GET, &format!("/api/v1/cvs/{cv_id}/layout"), None).await;
        let experience = plan["pages"][0]["main"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["section"] == "experience")
            .unwrap()
            .clone();
        assert_eq!(experience["item_ids"], json!([work_ids[1]]));
    }

    #[tokio::test]
    async fn test_selection_for_foreign_item_is_rejected() {
        let h = harness();
        let (cv_id, _) = seed(&h.app).await;
        let (status, _) = send(
            &h.app,
            Method::PUT,
            &format!("/api/v1/cvs/{cv_id}/selections"),
            Some(json!([{"cv_id": cv_id, "item_id": Uuid::new_v4()}])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    async fn experience_companies(app: &Router, cv_id: &str) -> Vec<String> {
        let (_, preview) = send(app, Method::GET, &format!("/api/v1/cvs/{cv_id}/preview"), None).await;
        preview["pages"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|page| page["main"].as_array().unwrap().clone())
            .filter(|section| section["section"] == "experience")
            .flat_map(|section| section["blocks"].as_array().unwrap().clone())
            .map(|block| block["subheading"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_partial_reorder_moves_unlisted_items_after() {
        let h = harness();
        let (cv_id, work_ids) = seed(&h.app).await;
        let (_, cv) = send(&h.app, Method::GET, &format!("/api/v1/cvs/{cv_id}"), None).await;

        let initech = Uuid::new_v4().to_string();
        let (status, _) = send(
            &h.app,
            Method::PUT,
            "/api/v1/profile/items",
            Some(json!({
                "kind": "work_experience",
                "id": initech,
                "user_id": cv["user_id"],
                "company": "Initech",
                "position": "Engineer",
                "display_order": 2
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &h.app,
            Method::POST,
            &format!("/api/v1/cvs/{cv_id}/selections/reorder"),
            Some(json!({"item_ids": [initech, work_ids[1]]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            experience_companies(&h.app, &cv_id).await,
            vec!["Initech", "Globex", "Acme"]
        );

        // Updating a flag without an order keeps the dragged position.
        let (status, _) = send(
            &h.app,
            Method::PUT,
            &format!("/api/v1/cvs/{cv_id}/selections"),
            Some(json!([{"cv_id": cv_id, "item_id": work_ids[0], "is_favorite": true}])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            experience_companies(&h.app, &cv_id).await,
            vec!["Initech", "Globex", "Acme"]
        );
    }

    #[tokio::test]
    async fn test_archive_hides_cv_from_default_listing() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let (_, cv) = send(
            &h.app,
            Method::POST,
            "/api/v1/cvs",
            Some(json!({"user_id": user_id, "title": "Old"})),
        )
        .await;
        let cv_id = cv["id"].as_str().unwrap();

        let (status, archived) =
            send(&h.app, Method::POST, &format!("/api/v1/cvs/{cv_id}/archive"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(archived["archived_at"].is_string());

        let (_, list) = send(&h.app, Method::GET, &format!("/api/v1/cvs?user_id={user_id}"), None).await;
        assert_eq!(list, json!([]));
        let (_, list) = send(
            &h.app,
            Method::GET,
            &format!("/api/v1/cvs?user_id={user_id}&include_archived=true"),
            None,
        )
        .await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_title_is_rejected() {
        let h = harness();
        let (status, _) = send(
            &h.app,
            Method::POST,
            "/api/v1/cvs",
            Some(json!({"user_id": Uuid::new_v4(), "title": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pdf_export_uses_selected_paper_size() {
        let h = harness();
        let (cv_id, _) = seed(&h.app).await;

        let (_, cv) = send(&h.app, Method::GET, &format!("/api/v1/cvs/{cv_id}"), None).await;
        let mut settings = cv["display_settings"].clone();
        settings["page_format"] = json!("letter");
        let (status, _) = send(
            &h.app,
            Method::PUT,
            &format!("/api/v1/cvs/{cv_id}/display-settings"),
            Some(settings),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, headers, body) = send_raw(
            &h.app,
            Method::GET,
            &format!("/api/v1/cvs/{cv_id}/export.pdf"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Backend-CV.pdf\""
        );
        assert_eq!(&body[..], b"%PDF-1.7 stub");
        assert_eq!(*h.pdf.formats.lock().unwrap(), vec![PageFormat::Letter]);
        assert!(h.pdf.documents.lock().unwrap()[0].contains("size: 216mm 279mm"));
    }

    #[tokio::test]
    async fn test_invalid_accent_color_is_rejected() {
        let h = harness();
        let (cv_id, _) = seed(&h.app).await;
        let (status, _) = send(
            &h.app,
            Method::PUT,
            &format!("/api/v1/cvs/{cv_id}/display-settings"),
            Some(json!({"accent_color": "javascript:alert(1)"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_overflow_report_flags_tall_pages() {
        let h = harness();
        let (cv_id, _) = seed(&h.app).await;
        let (status, report) = send(
            &h.app,
            Method::POST,
            &format!("/api/v1/cvs/{cv_id}/overflow"),
            Some(json!({
                "probes": [
                    {"node_id": "page-1", "scroll_height": 1300.0, "client_height": 1123.0},
                    {"node_id": "page-2", "scroll_height": 1123.5, "client_height": 1123.0},
                    {"node_id": "page-3"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["overflowing_pages"], json!([1]));
        assert_eq!(report["css_class"], "cv-overflow");
    }

    #[tokio::test]
    async fn test_generate_stores_requested_fields_only() {
        let h = harness();
        let (cv_id, _) = seed(&h.app).await;

        let (status, body) = send(
            &h.app,
            Method::POST,
            &format!("/api/v1/cvs/{cv_id}/generate"),
            Some(json!({
                "fields": ["tagline"],
                "werbeflaechen": {"What drives you?": "Reliable systems"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generated"]["tagline"], "Calm, precise backend engineer");
        assert_eq!(body["generated"]["profile_summary"], Value::Null);
        assert_eq!(body["cv"]["content"]["tagline"], "Calm, precise backend engineer");
        assert_eq!(body["cv"]["content"]["profile_summary"], Value::Null);

        let contexts = h.generator.contexts.lock().unwrap();
        assert_eq!(contexts[0].experience.len(), 2);
        assert_eq!(
            contexts[0].werbeflaechen.get("What drives you?").map(String::as_str),
            Some("Reliable systems")
        );
    }

    #[tokio::test]
    async fn test_regenerate_single_field() {
        let h = harness();
        let (cv_id, _) = seed(&h.app).await;
        let (status, body) = send(
            &h.app,
            Method::POST,
            &format!("/api/v1/cvs/{cv_id}/regenerate"),
            Some(json!({"field": "certifications"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cv"]["content"]["certifications"], json!(["CKA"]));
        assert_eq!(body["cv"]["content"]["tagline"], Value::Null);
    }

    #[tokio::test]
    async fn test_concurrent_generation_for_same_cv_conflicts() {
        let gate = Arc::new(Notify::new());
        let h = harness_with(StubGenerator {
            gate: Some(gate.clone()),
            ..StubGenerator::default()
        });
        let (cv_id, _) = seed(&h.app).await;
        let cv_uuid = Uuid::parse_str(&cv_id).unwrap();
        let uri = format!("/api/v1/cvs/{cv_id}/generate");

        let first = {
            let app = h.app.clone();
            let uri = uri.clone();
            tokio::spawn(async move { send(&app, Method::POST, &uri, Some(json!({}))).await })
        };
        while !h.state.in_flight.is_active(cv_uuid, GenerationAction::Generate) {
            tokio::task::yield_now().await;
        }

        let (status, body) = send(&h.app, Method::POST, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        gate.notify_one();
        let (status, _) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(!h.state.in_flight.is_active(cv_uuid, GenerationAction::Generate));
    }

    #[tokio::test]
    async fn test_editor_session_saves_on_close() {
        let h = harness();
        let (cv_id, _) = seed(&h.app).await;

        let (status, opened) = send(
            &h.app,
            Method::POST,
            "/api/v1/editor/sessions",
            Some(json!({"cv_id": cv_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let sid = opened["session_id"].as_str().unwrap().to_string();
        assert_eq!(opened["debounce_ms"], 50);

        let (status, pending) = send(
            &h.app,
            Method::PATCH,
            &format!("/api/v1/editor/sessions/{sid}"),
            Some(json!({"field": "profile_summary", "value": "Ten years of backend work."})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(pending["pending"], json!(["profile_summary"]));
        assert_eq!(pending["failed"], json!([]));

        let (status, report) = send(
            &h.app,
            Method::DELETE,
            &format!("/api/v1/editor/sessions/{sid}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["saved"], json!(["profile_summary"]));

        let (_, cv) = send(&h.app, Method::GET, &format!("/api/v1/cvs/{cv_id}"), None).await;
        assert_eq!(cv["content"]["profile_summary"], "Ten years of backend work.");

        let (status, _) = send(
            &h.app,
            Method::GET,
            &format!("/api/v1/editor/sessions/{sid}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
