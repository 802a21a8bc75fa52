//! JSON bodies exchanged between the document server and its clients.
//!
//! Request fields are optional so that a missing field is reported as a
//! 400 by the server instead of failing deserialization outright.

use facet::Facet;

pub const MSG_REPLACED: &str = "Element replaced successfully";
pub const MSG_REMOVED: &str = "Element removed successfully";
pub const MSG_DELETED: &str = "Elements deleted successfully";
pub const MSG_INSERTED: &str = "Element inserted successfully";
pub const MSG_UPDATED: &str = "Element updated successfully";

/// Body of the health route.
pub const HELLO: &str = "<p>Hello, World!</p>";

#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct ElementResponse {
    pub element: String,
}

#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct CheckExistsResponse {
    pub exists: bool,
    pub element: Option<String>,
}

#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct ElementsResponse {
    pub elements: Vec<String>,
}

#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

/// Reply to a path deletion; `removed` counts detached nodes.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct DeleteResponse {
    pub message: String,
    #[facet(default)]
    pub removed: usize,
}

#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct NodeExistsResponse {
    pub exists: bool,
}

/// Every non-2xx reply carries one of these.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceByIdRequest {
    #[facet(default)]
    pub id: Option<String>,
    #[facet(default)]
    pub new_element_html: Option<String>,
}

#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertByPathRequest {
    #[facet(default)]
    pub path: Option<String>,
    #[facet(default)]
    pub element_text: Option<String>,
}

#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateByPathRequest {
    #[facet(default)]
    pub old_element_path: Option<String>,
    #[facet(default)]
    pub new_element_path: Option<String>,
    #[facet(default)]
    pub new_element_content: Option<String>,
    #[facet(default)]
    pub important_data: Option<ImportantData>,
}

/// Attribute names to carry over from the old element on update, sent
/// either as one comma-separated string or as a list of names.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(untagged)]
#[repr(u8)]
pub enum ImportantData {
    Joined(String),
    Names(Vec<String>),
}

impl ImportantData {
    /// Comma-separated form, with blank names dropped.
    pub fn joined(&self) -> String {
        let names: Vec<&str> = match self {
            ImportantData::Joined(list) => list.split(',').map(str::trim).collect(),
            ImportantData::Names(names) => names.iter().map(|n| n.trim()).collect(),
        };
        names
            .into_iter()
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckNodeRequest {
    #[facet(default)]
    pub xpath: Option<String>,
    /// HTML fragment whose text is looked for.
    #[facet(default)]
    pub node: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> UpdateByPathRequest {
        facet_json::from_str(body).unwrap()
    }

    #[test]
    fn test_important_data_accepts_string_or_list() {
        let joined = decode(r#"{"important_data": "id, class"}"#);
        assert_eq!(
            joined.important_data.map(|d| d.joined()).as_deref(),
            Some("id,class")
        );

        let listed = decode(r#"{"important_data": ["id", " ", "name"]}"#);
        assert_eq!(
            listed.important_data,
            Some(ImportantData::Names(vec![
                "id".to_string(),
                " ".to_string(),
                "name".to_string()
            ]))
        );
        assert_eq!(
            decode(r#"{"important_data": ["id", "name"]}"#)
                .important_data
                .map(|d| d.joined())
                .as_deref(),
            Some("id,name")
        );

        assert_eq!(decode("{}").important_data, None);
    }
}
