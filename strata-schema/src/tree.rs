//! The persisted schema tree
//!
//! The published schema is an immutable object behind a reference-counted
//! handle; mutation happens on a private draft cloned from it on first
//! write. A successful traversal publishes the draft atomically, an error
//! drops it, so readers only ever observe committed schemas.

use crate::error::{Error, Result};
use crate::keywords::PATH_SEP;
use serde_json::{Map, Value};
use std::sync::Arc;
use strata_core::{parse_type, FieldType};
use tracing::debug;

/// Nested mapping of field paths to property objects.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    published: Arc<Value>,
    draft: Option<Value>,
}

impl Default for SchemaTree {
    fn default() -> Self {
        SchemaTree {
            published: Arc::new(Value::Object(Map::new())),
            draft: None,
        }
    }
}

impl SchemaTree {
    /// Wrap a persisted schema object. `None` starts empty.
    pub fn new(persisted: Option<Value>) -> Result<Self> {
        match persisted {
            None => Ok(SchemaTree::default()),
            Some(value) => {
                if !value.is_object() {
                    return Err(Error::corrupt("", "schema root is not a map"));
                }
                Ok(SchemaTree {
                    published: Arc::new(value),
                    draft: None,
                })
            }
        }
    }

    /// The newest root: the draft when a mutation is pending, else the
    /// published snapshot.
    pub fn root(&self) -> &Value {
        self.draft.as_ref().unwrap_or(&self.published)
    }

    /// The published (committed) root.
    pub fn published(&self) -> Arc<Value> {
        Arc::clone(&self.published)
    }

    /// Whether a draft is pending.
    pub fn is_dirty(&self) -> bool {
        self.draft.is_some()
    }

    /// Read the properties at a dotted path.
    pub fn get(&self, path: &str) -> Result<&Value> {
        let mut node = self.root();
        if path.is_empty() {
            return Ok(node);
        }
        for segment in path.split(PATH_SEP) {
            node = node
                .get(segment)
                .ok_or_else(|| Error::client(format!("Field {path} not found in schema")))?;
        }
        Ok(node)
    }

    /// Read the newest properties at a dotted path (draft first).
    pub fn get_newest(&self, path: &str) -> Result<&Value> {
        self.get(path)
    }

    /// Mutable properties at a dotted path, creating intermediate nodes.
    ///
    /// The first call clones the published snapshot into the draft.
    pub fn get_mutable(&mut self, path: &str) -> Result<&mut Map<String, Value>> {
        let draft = self
            .draft
            .get_or_insert_with(|| (*self.published).clone());
        let mut node = draft
            .as_object_mut()
            .ok_or_else(|| Error::corrupt("", "schema root is not a map"))?;
        if path.is_empty() {
            return Ok(node);
        }
        for segment in path.split(PATH_SEP) {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match child {
                Value::Object(map) => map,
                _ => return Err(Error::corrupt(path, "property node is not a map")),
            };
        }
        Ok(node)
    }

    /// Discard all properties (root only).
    pub fn clear(&mut self) {
        self.draft = Some(Value::Object(Map::new()));
    }

    /// Publish the draft.
    pub fn commit(&mut self) {
        if let Some(draft) = self.draft.take() {
            debug!("publishing schema draft");
            self.published = Arc::new(draft);
        }
    }

    /// Drop the draft.
    pub fn discard(&mut self) {
        if self.draft.take().is_some() {
            debug!("discarding schema draft");
        }
    }

    /// Validate a user-supplied schema object and locate the payload.
    ///
    /// Accepted shapes:
    /// - a thin foreign redirect `{_type: "foreign/object", _endpoint: url}`
    ///   (when `allow_foreign`)
    /// - a map holding the payload under `_schema`, whose `_type` (if set)
    ///   must be object
    /// - the raw payload itself (when `allow_root`)
    ///
    /// The reserved `_schemas` key is rejected anywhere.
    pub fn check<'a>(
        object: &'a Value,
        allow_foreign: bool,
        allow_root: bool,
    ) -> Result<(Option<String>, &'a Value)> {
        let map = object
            .as_object()
            .ok_or_else(|| Error::client("Schema must be a map"))?;
        if map.contains_key("_schemas") {
            return Err(Error::client("_schemas is not allowed in a schema"));
        }

        let declared = map
            .get("_type")
            .map(|t| {
                t.as_str()
                    .ok_or_else(|| Error::client("Invalid _type in schema"))
                    .and_then(|s| parse_type(s).map_err(Error::from))
            })
            .transpose()?;

        if let Some(sep) = declared {
            if sep.foreign() {
                if !allow_foreign {
                    return Err(Error::client("A foreign schema is not allowed here"));
                }
                let endpoint = map
                    .get("_endpoint")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::client("A foreign schema requires _endpoint"))?;
                return Ok((Some(endpoint.to_string()), object));
            }
            if sep.concrete_type() != FieldType::Empty || !sep.object() {
                return Err(Error::client("Schema object must be of type object"));
            }
        }

        if let Some(inner) = map.get("_schema") {
            let inner_map = inner
                .as_object()
                .ok_or_else(|| Error::client("_schema must be a map"))?;
            if inner_map.contains_key("_schemas") {
                return Err(Error::client("_schemas is not allowed in a schema"));
            }
            if let Some(t) = inner_map.get("_type") {
                let sep = t
                    .as_str()
                    .ok_or_else(|| Error::client("Invalid _type in schema"))
                    .and_then(|s| parse_type(s).map_err(Error::from))?;
                if !sep.object() || sep.concrete_type() != FieldType::Empty {
                    return Err(Error::client("Schema object must be of type object"));
                }
            }
            return Ok((None, inner));
        }

        if !allow_root {
            return Err(Error::client("Schema requires a _schema entry"));
        }
        Ok((None, object))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn draft_is_copy_on_write() {
        let mut tree = SchemaTree::new(Some(json!({"name": {"_type": "text"}}))).unwrap();
        assert!(!tree.is_dirty());
        let props = tree.get_mutable("name").unwrap();
        props.insert("_slot".into(), json!(42));
        assert!(tree.is_dirty());
        // Published snapshot unchanged until commit.
        assert!(tree.published().get("name").unwrap().get("_slot").is_none());
        tree.commit();
        assert_eq!(
            tree.published().get("name").unwrap().get("_slot"),
            Some(&json!(42))
        );
    }

    #[test]
    fn discard_drops_changes() {
        let mut tree = SchemaTree::default();
        tree.get_mutable("a.b").unwrap();
        tree.discard();
        assert!(!tree.is_dirty());
        assert!(tree.get("a").is_err());
    }

    #[test]
    fn get_mutable_creates_intermediates() {
        let mut tree = SchemaTree::default();
        tree.get_mutable("a.b.c").unwrap();
        assert!(tree.get("a.b.c").unwrap().is_object());
    }

    #[test]
    fn get_newest_prefers_draft() {
        let mut tree = SchemaTree::new(Some(json!({"f": {"_slot": 1}}))).unwrap();
        tree.get_mutable("f")
            .unwrap()
            .insert("_slot".into(), json!(2));
        assert_eq!(tree.get_newest("f").unwrap()["_slot"], json!(2));
        tree.discard();
        assert_eq!(tree.get_newest("f").unwrap()["_slot"], json!(1));
    }

    #[test]
    fn check_foreign_redirect() {
        let obj = json!({"_type": "foreign/object", "_endpoint": "db/other"});
        let (endpoint, _) = SchemaTree::check(&obj, true, true).unwrap();
        assert_eq!(endpoint.as_deref(), Some("db/other"));
        assert!(SchemaTree::check(&obj, false, true).is_err());
    }

    #[test]
    fn check_nested_schema() {
        let obj = json!({"_schema": {"_type": "object", "name": {"_type": "text"}}});
        let (endpoint, inner) = SchemaTree::check(&obj, true, false).unwrap();
        assert!(endpoint.is_none());
        assert!(inner.get("name").is_some());
    }

    #[test]
    fn check_rejects_schemas_key() {
        let obj = json!({"_schemas": {}});
        assert!(SchemaTree::check(&obj, true, true).is_err());
        let nested = json!({"_schema": {"_schemas": {}}});
        assert!(SchemaTree::check(&nested, true, true).is_err());
    }

    #[test]
    fn check_rejects_concrete_root() {
        let obj = json!({"_schema": {"_type": "text"}});
        assert!(SchemaTree::check(&obj, true, false).is_err());
    }
}
