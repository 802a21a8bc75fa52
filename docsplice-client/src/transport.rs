//! One blocking HTTP request per operation, with replies decoded into wire
//! types and failures folded into [`DocError`].

use docsplice::DocError;
use docsplice::wire::{
    CheckExistsResponse, CheckNodeRequest, DeleteResponse, ElementResponse, ElementsResponse,
    ErrorResponse, ImportantData, InsertByPathRequest, MessageResponse, NodeExistsResponse, ReplaceByIdRequest,
    UpdateByPathRequest,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;

use crate::config::ClientConfig;
use crate::tracing_macros::{debug, warn};

macro_rules! decode {
    ($ty:ty, $body:expr) => {{
        let decoded: Result<$ty, _> = facet_json::from_str(&$body);
        decoded.map_err(|err| DocError::internal(format!("unexpected reply: {err:?}")))
    }};
}

macro_rules! encode {
    ($value:expr) => {
        facet_json::to_string(&$value)
            .map_err(|err| DocError::internal(format!("cannot encode request: {err:?}")))
    };
}

/// The error a non-success reply stands for.
pub(crate) fn error_for(status: StatusCode, body: &str) -> DocError {
    let decoded: Result<ErrorResponse, _> = facet_json::from_str(body);
    let message = match decoded {
        Ok(reply) => reply.error,
        Err(_) => format!("server replied {status}"),
    };
    match status {
        StatusCode::NOT_FOUND => DocError::not_found(message),
        StatusCode::NOT_IMPLEMENTED => DocError::not_supported(message),
        StatusCode::BAD_REQUEST => DocError::invalid_input(message),
        _ => DocError::internal(message),
    }
}

/// `Ok(None)` for a 404, everything else unchanged.
pub(crate) fn optional<T>(result: Result<T, DocError>) -> Result<Option<T>, DocError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// An empty list for a 404, everything else unchanged.
pub(crate) fn or_empty(result: Result<Vec<String>, DocError>) -> Result<Vec<String>, DocError> {
    match result {
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        other => other,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    base_url: String,
    file_path: Option<String>,
}

impl Transport {
    pub(crate) fn new(config: &ClientConfig) -> Result<Self, DocError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| DocError::internal(format!("cannot build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            file_path: config.default_file_path.clone(),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    pub(crate) fn set_file_path(&mut self, path: Option<String>) {
        self.file_path = path;
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }

    fn query(&self, params: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        if let Some(path) = &self.file_path {
            query.push(("file_path".to_string(), path.clone()));
        }
        query
    }

    fn get(&self, route: &str, params: &[(&str, &str)]) -> Result<String, DocError> {
        let request = self.client.get(self.url(route)).query(&self.query(params));
        self.send(route, request)
    }

    fn delete(&self, route: &str, params: &[(&str, &str)]) -> Result<String, DocError> {
        let request = self.client.delete(self.url(route)).query(&self.query(params));
        self.send(route, request)
    }

    fn post(&self, route: &str, body: String) -> Result<String, DocError> {
        let request = self
            .client
            .post(self.url(route))
            .query(&self.query(&[]))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        self.send(route, request)
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn send(&self, route: &str, request: RequestBuilder) -> Result<String, DocError> {
        debug!(route, base = %self.base_url, "sending request");
        let response = request.send().map_err(|err| {
            warn!(route, error = %err, "request failed");
            DocError::internal(format!("request to {route} failed: {err}"))
        })?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| DocError::internal(format!("cannot read reply from {route}: {err}")))?;
        if status.is_success() {
            Ok(body)
        } else {
            debug!(route, %status, "request rejected");
            Err(error_for(status, &body))
        }
    }

    pub(crate) fn get_by_id(&self, id: &str) -> Result<Option<String>, DocError> {
        optional(
            self.get("/get-by-id", &[("id", id)])
                .and_then(|body| decode!(ElementResponse, body))
                .map(|reply| reply.element),
        )
    }

    pub(crate) fn check_exists(&self, id: &str) -> Result<(bool, Option<String>), DocError> {
        let body = self.get("/check-exists", &[("id", id)])?;
        let reply = decode!(CheckExistsResponse, body)?;
        Ok((reply.exists, reply.element))
    }

    pub(crate) fn get_by_name(&self, name: &str) -> Result<Option<String>, DocError> {
        optional(
            self.get("/get-by-name", &[("name", name)])
                .and_then(|body| decode!(ElementResponse, body))
                .map(|reply| reply.element),
        )
    }

    pub(crate) fn get_elements_by_name(&self, name: &str) -> Result<Vec<String>, DocError> {
        self.elements("/get-elements-by-name", &[("name", name)])
    }

    pub(crate) fn get_by_path(&self, path: &str) -> Result<Option<String>, DocError> {
        optional(
            self.get("/get-by-path", &[("path", path)])
                .and_then(|body| decode!(ElementResponse, body))
                .map(|reply| reply.element),
        )
    }

    pub(crate) fn get_elements_by_path(&self, path: &str) -> Result<Vec<String>, DocError> {
        self.elements("/get-elements-by-path", &[("path", path)])
    }

    pub(crate) fn get_by_value(&self, value: &str) -> Result<Vec<String>, DocError> {
        self.elements("/get-by-value", &[("value", value)])
    }

    pub(crate) fn get_by_jinja_variable(&self, name: &str) -> Result<Vec<String>, DocError> {
        self.elements("/get-by-jinja-variable", &[("variable_name", name)])
    }

    fn elements(&self, route: &str, params: &[(&str, &str)]) -> Result<Vec<String>, DocError> {
        or_empty(
            self.get(route, params)
                .and_then(|body| decode!(ElementsResponse, body))
                .map(|reply| reply.elements),
        )
    }

    pub(crate) fn replace_by_id(&self, id: &str, new_element_html: &str) -> Result<(), DocError> {
        let request = ReplaceByIdRequest {
            id: Some(id.to_string()),
            new_element_html: Some(new_element_html.to_string()),
        };
        let body = self.post("/replace-by-id", encode!(request)?)?;
        decode!(MessageResponse, body).map(drop)
    }

    pub(crate) fn remove_by_id(&self, id: &str) -> Result<(), DocError> {
        let body = self.delete("/remove-by-id", &[("id", id)])?;
        decode!(MessageResponse, body).map(drop)
    }

    pub(crate) fn delete_elements_by_path(&self, path: &str) -> Result<usize, DocError> {
        let body = self.delete("/delete-elements-by-path", &[("path", path)])?;
        decode!(DeleteResponse, body).map(|reply| reply.removed)
    }

    pub(crate) fn insert_element_by_path(&self, path: &str, html: &str) -> Result<(), DocError> {
        let request = InsertByPathRequest {
            path: Some(path.to_string()),
            element_text: Some(html.to_string()),
        };
        let body = self.post("/insert-element-by-path", encode!(request)?)?;
        decode!(MessageResponse, body).map(drop)
    }

    pub(crate) fn update_element_by_path(
        &self,
        old_path: &str,
        new_path: &str,
        new_content: &str,
        important_data: Option<&str>,
    ) -> Result<(), DocError> {
        let request = UpdateByPathRequest {
            old_element_path: Some(old_path.to_string()),
            new_element_path: Some(new_path.to_string()),
            new_element_content: Some(new_content.to_string()),
            important_data: important_data.map(|list| ImportantData::Joined(list.to_string())),
        };
        let body = self.post("/update-element-by-path", encode!(request)?)?;
        decode!(MessageResponse, body).map(drop)
    }

    pub(crate) fn check_if_node_exists(&self, xpath: &str, node: &str) -> Result<bool, DocError> {
        let request = CheckNodeRequest {
            xpath: Some(xpath.to_string()),
            node: Some(node.to_string()),
        };
        let body = self.post("/check-if-node-exists", encode!(request)?)?;
        decode!(NodeExistsResponse, body).map(|reply| reply.exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_maps_statuses() {
        let body = r#"{"error":"Element not found"}"#;
        let err = error_for(StatusCode::NOT_FOUND, body);
        assert_eq!(err, DocError::not_found("Element not found"));

        assert!(error_for(StatusCode::NOT_IMPLEMENTED, body).is_not_supported());
        assert_eq!(
            error_for(StatusCode::BAD_REQUEST, r#"{"error":"ID not provided"}"#),
            DocError::invalid_input("ID not provided")
        );
        assert_eq!(
            error_for(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            DocError::internal("server replied 502 Bad Gateway")
        );
    }

    #[test]
    fn test_optional_and_empty() {
        assert_eq!(optional(Ok(1)), Ok(Some(1)));
        assert_eq!(optional::<u8>(Err(DocError::not_found("x"))), Ok(None));
        assert!(optional::<u8>(Err(DocError::internal("x"))).is_err());

        assert_eq!(or_empty(Err(DocError::not_found("x"))), Ok(vec![]));
        assert!(or_empty(Err(DocError::not_supported("x"))).is_err());
    }

    #[test]
    fn test_query_injects_file_path() {
        let config = ClientConfig::new("http://127.0.0.1:9/").with_default_file_path("doc.html");
        let mut transport = Transport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:9");
        assert_eq!(
            transport.query(&[("id", "1")]),
            vec![
                ("id".to_string(), "1".to_string()),
                ("file_path".to_string(), "doc.html".to_string()),
            ]
        );

        transport.set_file_path(None);
        assert!(transport.query(&[]).is_empty());
    }
}
