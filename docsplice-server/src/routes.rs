//! Request handlers. Every request loads its document afresh, so mutations
//! only shape the reply and never reach the file on disk.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use docsplice::wire::{
    CheckExistsResponse, CheckNodeRequest, DeleteResponse, ElementResponse, ElementsResponse,
    HELLO, InsertByPathRequest, MSG_DELETED, MSG_INSERTED, MSG_REMOVED, MSG_REPLACED,
    MSG_UPDATED, MessageResponse, NodeExistsResponse, ReplaceByIdRequest, UpdateByPathRequest,
};
use docsplice::{DocError, NodeProbe};
use tracing::debug;

use crate::AppState;
use crate::reply::{ApiError, Json};

pub(crate) type Params = HashMap<String, String>;
type Shared = State<Arc<AppState>>;

const ELEMENT_NOT_FOUND: &str = "Element not found";
const MISSING_FIELDS: &str = "Missing required fields";

fn required(params: &Params, key: &str, message: &str) -> Result<String, ApiError> {
    params
        .get(key)
        .cloned()
        .ok_or_else(|| ApiError::bad_request(message))
}

fn required_non_empty(params: &Params, key: &str, message: &str) -> Result<String, ApiError> {
    required(params, key, message).and_then(|value| {
        if value.is_empty() {
            Err(ApiError::bad_request(message))
        } else {
            Ok(value)
        }
    })
}

/// Present and non-empty, or a 400 carrying `message`.
fn field(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}

/// Decodes a JSON body; an unreadable body is reported like missing fields.
macro_rules! decode_body {
    ($ty:ty, $body:expr, $message:expr) => {{
        let decoded: Result<$ty, _> = facet_json::from_str(&$body);
        decoded.map_err(|err| {
            debug!(error = ?err, "rejecting request body");
            ApiError::bad_request($message)
        })
    }};
}

pub(crate) async fn hello() -> Html<&'static str> {
    Html(HELLO)
}

pub(crate) async fn get_by_id(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<ElementResponse>, ApiError> {
    let id = required(&params, "id", "ID not provided")?;
    let element = state
        .with_document(&params, move |doc| Ok(doc.get_element_by_id(&id)))
        .await?;
    element
        .map(|element| Json(ElementResponse { element }))
        .ok_or_else(|| ApiError::not_found(ELEMENT_NOT_FOUND))
}

pub(crate) async fn check_exists(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<CheckExistsResponse>, ApiError> {
    let id = required(&params, "id", "ID not provided")?;
    let (exists, element) = state
        .with_document(&params, move |doc| Ok(doc.check_if_element_exists(&id)))
        .await?;
    Ok(Json(CheckExistsResponse { exists, element }))
}

pub(crate) async fn get_by_name(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<ElementResponse>, ApiError> {
    let name = required(&params, "name", "Name not provided")?;
    let element = state
        .with_document(&params, move |doc| Ok(doc.get_element_by_name(&name)))
        .await?;
    element
        .map(|element| Json(ElementResponse { element }))
        .ok_or_else(|| ApiError::not_found(ELEMENT_NOT_FOUND))
}

pub(crate) async fn get_elements_by_name(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<ElementsResponse>, ApiError> {
    let name = required(&params, "name", "Name not provided")?;
    let elements = state
        .with_document(&params, move |doc| Ok(doc.get_elements_by_name(&name)))
        .await?;
    Ok(Json(ElementsResponse { elements }))
}

pub(crate) async fn get_by_path(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<ElementResponse>, ApiError> {
    let path = required(&params, "path", "Path not provided")?;
    let element = state
        .with_document(&params, move |doc| doc.get_element_by_path(&path))
        .await?;
    element
        .map(|element| Json(ElementResponse { element }))
        .ok_or_else(|| ApiError::not_found(ELEMENT_NOT_FOUND))
}

pub(crate) async fn get_elements_by_path(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<ElementsResponse>, ApiError> {
    let path = required_non_empty(&params, "path", "Path parameter is required")?;
    let elements = state
        .with_document(&params, move |doc| doc.get_elements_by_path(&path))
        .await?;
    Ok(Json(ElementsResponse { elements }))
}

pub(crate) async fn get_by_value(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<ElementsResponse>, ApiError> {
    let value = required(&params, "value", "Value not provided")?;
    let elements = state
        .with_document(&params, move |doc| Ok(doc.get_elements_by_value(&value)))
        .await?;
    if elements.is_empty() {
        return Err(ApiError::not_found(ELEMENT_NOT_FOUND));
    }
    Ok(Json(ElementsResponse { elements }))
}

pub(crate) async fn get_by_jinja_variable(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<ElementsResponse>, ApiError> {
    let name = required(&params, "variable_name", "Variable name not provided")?;
    let elements = state
        .with_document(&params, move |doc| {
            Ok(doc.get_elements_by_jinja_variable(&name))
        })
        .await?;
    Ok(Json(ElementsResponse { elements }))
}

pub(crate) async fn replace_by_id(
    State(state): Shared,
    Query(params): Query<Params>,
    body: String,
) -> Result<Json<MessageResponse>, ApiError> {
    const MISSING: &str = "Missing 'id' or 'new_element_html' in request";
    let request = decode_body!(ReplaceByIdRequest, body, MISSING)?;
    let id = field(request.id, MISSING)?;
    let html = field(request.new_element_html, MISSING)?;
    state
        .with_document(&params, move |doc| doc.replace_element_by_id(&id, &html))
        .await?;
    Ok(Json::message(MSG_REPLACED))
}

pub(crate) async fn remove_by_id(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = required(&params, "id", "ID not provided")?;
    state
        .with_document(&params, move |doc| doc.remove_element_by_id(&id))
        .await?;
    Ok(Json::message(MSG_REMOVED))
}

pub(crate) async fn delete_elements_by_path(
    State(state): Shared,
    Query(params): Query<Params>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let path = required_non_empty(&params, "path", "Path parameter is required")?;
    let removed = state
        .with_document(&params, move |doc| doc.delete_elements_by_path(&path))
        .await?;
    Ok(Json(DeleteResponse {
        message: MSG_DELETED.to_string(),
        removed,
    }))
}

pub(crate) async fn insert_element_by_path(
    State(state): Shared,
    Query(params): Query<Params>,
    body: String,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = decode_body!(InsertByPathRequest, body, MISSING_FIELDS)?;
    let path = field(request.path, MISSING_FIELDS)?;
    let html = field(request.element_text, MISSING_FIELDS)?;
    state
        .with_document(&params, move |doc| doc.insert_element_by_path(&path, &html))
        .await?;
    Ok(Json::message(MSG_INSERTED))
}

pub(crate) async fn update_element_by_path(
    State(state): Shared,
    Query(params): Query<Params>,
    body: String,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = decode_body!(UpdateByPathRequest, body, MISSING_FIELDS)?;
    let old_path = field(request.old_element_path, MISSING_FIELDS)?;
    let new_path = field(request.new_element_path, MISSING_FIELDS)?;
    let content = field(request.new_element_content, MISSING_FIELDS)?;
    let important = request
        .important_data
        .map(|data| data.joined())
        .filter(|data| !data.is_empty());
    state
        .with_document(&params, move |doc| {
            doc.update_element_by_path(&old_path, &new_path, &content, important.as_deref())
        })
        .await?;
    Ok(Json::message(MSG_UPDATED))
}

pub(crate) async fn check_if_node_exists(
    State(state): Shared,
    Query(params): Query<Params>,
    body: String,
) -> Result<Json<NodeExistsResponse>, ApiError> {
    let request = decode_body!(CheckNodeRequest, body, MISSING_FIELDS)?;
    let xpath = field(request.xpath, MISSING_FIELDS)?;
    let node = request
        .node
        .ok_or_else(|| ApiError::bad_request(MISSING_FIELDS))?;
    let exists = state
        .with_document(&params, move |doc| {
            doc.check_if_node_exists(&xpath, NodeProbe::Fragment(&node))
        })
        .await?;
    Ok(Json(NodeExistsResponse { exists }))
}

/// Fallback for unknown routes, shaped like every other error.
pub(crate) async fn not_found() -> ApiError {
    ApiError::from(DocError::not_found("Route not found"))
}
