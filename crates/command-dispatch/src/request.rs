//! Protocol-agnostic request assembly.

#![allow(missing_docs)]

use smol_str::SmolStr;

use crate::profile::{Attributes, ResourceDeclaration};
use crate::value::ValueKind;

/// Attribute key under which the caller's raw query string is passed on.
pub const URL_RAW_QUERY: &str = "urlRawQuery";

/// One resource access handed to a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub resource_name: SmolStr,
    pub attributes: Attributes,
    pub value_type: ValueKind,
}

impl CommandRequest {
    /// Build a request for `resource`, copying its declared attributes and
    /// adding `raw_query` under [`URL_RAW_QUERY`] when present.
    pub fn for_resource(resource: &ResourceDeclaration, raw_query: Option<&str>) -> Self {
        let mut attributes = resource.attributes.clone();
        if let Some(query) = raw_query.filter(|query| !query.is_empty()) {
            attributes.insert(
                SmolStr::new(URL_RAW_QUERY),
                serde_json::Value::String(query.to_string()),
            );
        }
        Self {
            resource_name: resource.name.clone(),
            attributes,
            value_type: resource.value_type(),
        }
    }

    #[must_use]
    pub fn raw_query(&self) -> Option<&str> {
        self.attributes
            .get(URL_RAW_QUERY)
            .and_then(serde_json::Value::as_str)
    }
}
