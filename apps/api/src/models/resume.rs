use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resume content as supplied by the editor's data store.
///
/// `resume_data` is keyed by section name; payloads are opaque to pagination
/// beyond the presence and size rules in `layout::sections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDocument {
    #[serde(default)]
    pub resume_data: Map<String, Value>,
    #[serde(default)]
    pub section_order: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let doc: ResumeDocument = serde_json::from_value(json!({})).unwrap();
        assert!(doc.resume_data.is_empty());
        assert!(doc.section_order.is_empty());
    }
}
