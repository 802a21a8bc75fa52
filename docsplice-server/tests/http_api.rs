use std::io::Write;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use docsplice::Engine;
use docsplice::wire::{
    CheckExistsResponse, DeleteResponse, ElementResponse, ElementsResponse, ErrorResponse,
    MessageResponse, NodeExistsResponse,
};
use docsplice_server::{AppState, router};
use tower::ServiceExt;

const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/sample_files/F1.html");

fn app(engine: Engine) -> Router {
    router(AppState::new(engine, SAMPLE))
}

async fn call(app: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(engine: Engine, uri: &str) -> (StatusCode, String) {
    call(app(engine), Method::GET, uri, None).await
}

fn error_of(body: &str) -> String {
    let err: ErrorResponse = facet_json::from_str(body).unwrap();
    err.error
}

#[tokio::test]
async fn test_hello() {
    let (status, body) = get(Engine::Tree, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<p>Hello, World!</p>");
}

#[tokio::test]
async fn test_get_by_id_on_both_engines() {
    for engine in [Engine::Tree, Engine::Arena] {
        let (status, body) = get(engine, "/get-by-id?id=1").await;
        assert_eq!(status, StatusCode::OK, "{engine}");
        let found: ElementResponse = facet_json::from_str(&body).unwrap();
        assert!(found.element.contains("Field (F1)"), "{engine}: {body}");

        let (status, body) = get(engine, "/get-by-id?id=999").await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{engine}");
        assert_eq!(error_of(&body), "Element not found");
    }
}

#[tokio::test]
async fn test_missing_parameters_are_bad_requests() {
    let cases = [
        ("/get-by-id", "ID not provided"),
        ("/check-exists", "ID not provided"),
        ("/get-by-name", "Name not provided"),
        ("/get-by-path", "Path not provided"),
        ("/get-elements-by-path", "Path parameter is required"),
        ("/get-elements-by-path?path=", "Path parameter is required"),
        ("/get-by-value", "Value not provided"),
        ("/get-by-jinja-variable", "Variable name not provided"),
    ];
    for (uri, message) in cases {
        let (status, body) = get(Engine::Tree, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(error_of(&body), message, "{uri}");
    }
}

#[tokio::test]
async fn test_check_exists_is_always_ok() {
    let (status, body) = get(Engine::Arena, "/check-exists?id=title").await;
    assert_eq!(status, StatusCode::OK);
    let reply: CheckExistsResponse = facet_json::from_str(&body).unwrap();
    assert!(reply.exists);
    assert!(reply.element.is_some());

    let (status, body) = get(Engine::Arena, "/check-exists?id=nope").await;
    assert_eq!(status, StatusCode::OK);
    let reply: CheckExistsResponse = facet_json::from_str(&body).unwrap();
    assert!(!reply.exists);
    assert_eq!(reply.element, None);
}

#[tokio::test]
async fn test_name_lookups() {
    let (status, body) = get(Engine::Tree, "/get-by-name?name=nesto").await;
    assert_eq!(status, StatusCode::OK);
    let reply: ElementResponse = facet_json::from_str(&body).unwrap();
    assert!(reply.element.starts_with("<div"));

    let (status, body) = get(Engine::Tree, "/get-elements-by-name?name=missing").await;
    assert_eq!(status, StatusCode::OK);
    let reply: ElementsResponse = facet_json::from_str(&body).unwrap();
    assert!(reply.elements.is_empty());
}

#[tokio::test]
async fn test_get_by_path_depends_on_engine() {
    let (status, body) = get(Engine::Arena, "/get-by-path?path=//h1").await;
    assert_eq!(status, StatusCode::OK);
    let reply: ElementResponse = facet_json::from_str(&body).unwrap();
    assert!(reply.element.starts_with("<h1"));

    let (status, _) = get(Engine::Tree, "/get-by-path?path=//h1").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_dialect_gaps_are_not_implemented() {
    let uri = "/get-elements-by-path?path=//li[contains(text(),'F1')]";
    let (status, _) = get(Engine::Tree, uri).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    let (status, body) = get(Engine::Arena, uri).await;
    assert_eq!(status, StatusCode::OK);
    let reply: ElementsResponse = facet_json::from_str(&body).unwrap();
    assert_eq!(reply.elements.len(), 1);

    let (status, _) = get(Engine::Arena, "/get-elements-by-path?path=//li[").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deeply_nested_path_is_rejected() {
    let path = format!("//li[{}1{}]", "(".repeat(1_000), ")".repeat(1_000));
    let uri = format!("/get-elements-by-path?path={path}");
    for engine in [Engine::Tree, Engine::Arena] {
        let (status, body) = get(engine, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{engine}: {body}");
    }

    let body = format!(r#"{{"xpath": "{path}", "node": "<li>x</li>"}}"#);
    let (status, _) =
        call(app(Engine::Tree), Method::POST, "/check-if-node-exists", Some(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_by_value_is_not_found_when_empty() {
    let (status, body) = get(Engine::Tree, "/get-by-value?value=Field%20(F1)").await;
    assert_eq!(status, StatusCode::OK);
    let reply: ElementsResponse = facet_json::from_str(&body).unwrap();
    assert!(reply.elements.iter().any(|e| e.contains("Field (F1)")));

    let (status, _) = get(Engine::Tree, "/get-by-value?value=nowhere%20to%20be%20seen").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_jinja_scan_per_engine() {
    let (status, body) = get(Engine::Tree, "/get-by-jinja-variable?variable_name=user").await;
    assert_eq!(status, StatusCode::OK);
    let reply: ElementsResponse = facet_json::from_str(&body).unwrap();
    assert_eq!(reply.elements.len(), 1);
    assert!(reply.elements[0].contains("greeting"));

    let (status, body) = get(Engine::Arena, "/get-by-jinja-variable?variable_name=user").await;
    assert_eq!(status, StatusCode::OK);
    let reply: ElementsResponse = facet_json::from_str(&body).unwrap();
    assert!(reply.elements.is_empty());
}

#[tokio::test]
async fn test_insert_element_by_path() {
    for engine in [Engine::Tree, Engine::Arena] {
        let body = r#"{"path": "/html/body/div/ul", "element_text": "<li id=\"3\">New</li>"}"#;
        let (status, reply) =
            call(app(engine), Method::POST, "/insert-element-by-path", Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{engine}: {reply}");
        let reply: MessageResponse = facet_json::from_str(&reply).unwrap();
        assert_eq!(reply.message, "Element inserted successfully");
    }

    let body = r#"{"path": "/html/body/aside", "element_text": "<p>x</p>"}"#;
    let (status, reply) = call(
        app(Engine::Arena),
        Method::POST,
        "/insert-element-by-path",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&reply), "Path not found");
}

#[tokio::test]
async fn test_bodies_with_missing_fields() {
    let (status, reply) = call(
        app(Engine::Tree),
        Method::POST,
        "/replace-by-id",
        Some(r#"{"id": "1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_of(&reply),
        "Missing 'id' or 'new_element_html' in request"
    );

    let (status, reply) = call(
        app(Engine::Tree),
        Method::POST,
        "/insert-element-by-path",
        Some("not json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&reply), "Missing required fields");
}

#[tokio::test]
async fn test_replace_and_remove_by_id() {
    let body = r#"{"id": "title", "new_element_html": "<h2 id=\"title\">New</h2>"}"#;
    let (status, _) = call(app(Engine::Arena), Method::POST, "/replace-by-id", Some(body)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, reply) = call(
        app(Engine::Arena),
        Method::DELETE,
        "/remove-by-id?id=footer",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reply: MessageResponse = facet_json::from_str(&reply).unwrap();
    assert_eq!(reply.message, "Element removed successfully");

    let (status, _) = call(
        app(Engine::Tree),
        Method::DELETE,
        "/remove-by-id?id=999",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_elements_by_path_reports_count() {
    let (status, reply) = call(
        app(Engine::Arena),
        Method::DELETE,
        "/delete-elements-by-path?path=//li",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reply: DeleteResponse = facet_json::from_str(&reply).unwrap();
    assert_eq!(reply.message, "Elements deleted successfully");
    assert_eq!(reply.removed, 2);
}

#[tokio::test]
async fn test_update_element_by_path() {
    let body = r#"{
        "old_element_path": "/html/body/div/h1",
        "new_element_path": "/html/body/div/h1",
        "new_element_content": "<h1>Renamed</h1>",
        "important_data": "id"
    }"#;
    for engine in [Engine::Tree, Engine::Arena] {
        let (status, reply) =
            call(app(engine), Method::POST, "/update-element-by-path", Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{engine}: {reply}");
    }
}

#[tokio::test]
async fn test_update_accepts_important_data_list() {
    let body = r#"{
        "old_element_path": "//ul/li",
        "new_element_path": "//ul/li",
        "new_element_content": "<li>Changed</li>",
        "important_data": ["id", "class"]
    }"#;
    for engine in [Engine::Tree, Engine::Arena] {
        let (status, reply) =
            call(app(engine), Method::POST, "/update-element-by-path", Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{engine}: {reply}");
        let reply: MessageResponse = facet_json::from_str(&reply).unwrap();
        assert_eq!(reply.message, "Element updated successfully");
    }
}

#[tokio::test]
async fn test_check_if_node_exists() {
    let body = r#"{"xpath": "//ul/li", "node": "<li>Field (F1)</li>"}"#;
    for engine in [Engine::Tree, Engine::Arena] {
        let (status, reply) =
            call(app(engine), Method::POST, "/check-if-node-exists", Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{engine}: {reply}");
        let reply: NodeExistsResponse = facet_json::from_str(&reply).unwrap();
        assert!(reply.exists, "{engine}");
    }
}

#[tokio::test]
async fn test_file_path_overrides_default_document() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"<html><body><p id="only">Temporary</p></body></html>"#
    )
    .unwrap();
    let uri = format!("/get-by-id?id=only&file_path={}", file.path().display());
    let (status, body) = get(Engine::Arena, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let reply: ElementResponse = facet_json::from_str(&body).unwrap();
    assert!(reply.element.contains("Temporary"));

    let (status, _) = get(Engine::Arena, "/get-by-id?id=1&file_path=/no/such/file.html").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = get(Engine::Tree, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body), "Route not found");
}
