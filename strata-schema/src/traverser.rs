//! Schema-driven document traversal
//!
//! `Schema` owns the persisted tree and a working Specification. Indexing
//! a document descends the object recursively: each field resolves its
//! specification by negotiating with the persisted schema (feed), the
//! user-supplied properties (process/consistency) and the mutable draft
//! (write), then leaf values go through the value indexer.
//!
//! The Specification is pushed by value into each recursion step and
//! restored on return. Any error aborts the document and drops the
//! schema draft.

use crate::dispatch;
use crate::document::{Document, SlotValues};
use crate::error::{Error, Result};
use crate::id;
use crate::indexer;
use crate::keywords::{
    is_comment, is_reserved, is_valid_field_name, ReservedWord, PATH_SEP, SCHEMA_METADATA_KEY,
};
use crate::readable;
use crate::shard::{Shard, ShardSet};
use crate::specification::{
    acc_prefix_for, field_prefix, prefixed, slot_for, uuid_prefix, PartialSpec, Prefix,
    Specification, BAD_SLOT, NUMERIC_ID_SENTINEL, SLOT_ID, SLOT_VERSION,
};
use crate::types::{TypeIndex, UuidFieldIndex};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use strata_core::{default_accuracy, format_type, serialise, uuids, validate_acc_date, FieldType};
use strata_spatial::MAX_LEVEL;
use tracing::debug;

pub use crate::tree::SchemaTree;

/// What one successful indexing produced.
#[derive(Debug, Clone)]
pub struct IndexResult {
    /// The document's boolean id term.
    pub term_id: Vec<u8>,
    /// The indexed artifact.
    pub document: Document,
    /// The stored object (normalized values, generated id included).
    pub object: Value,
}

/// The schema engine for one index.
///
/// Not concurrency-safe by itself: run one `Schema` per indexing worker,
/// cloned from the published snapshot.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tree: SchemaTree,
    spc: Specification,
    map_values: BTreeMap<u32, SlotValues>,
}

impl Schema {
    /// Wrap a persisted schema object.
    pub fn new(persisted: Option<Value>) -> Result<Self> {
        Ok(Schema {
            tree: SchemaTree::new(persisted)?,
            spc: Specification::default(),
            map_values: BTreeMap::new(),
        })
    }

    /// Load the schema stored in a shard's metadata.
    pub fn from_shard<S: Shard>(shard: &S) -> Result<Self> {
        match shard.metadata(SCHEMA_METADATA_KEY)? {
            None => Schema::new(None),
            Some(bytes) => {
                let value: Value = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::corrupt("", e.to_string()))?;
                Schema::new(Some(value))
            }
        }
    }

    /// Persist the published schema into a shard's metadata.
    pub fn store<S: Shard>(&self, shard: &S) -> Result<()> {
        let bytes = serde_json::to_vec(&*self.tree.published())
            .map_err(|e| Error::serialisation(e.to_string()))?;
        shard.set_metadata(SCHEMA_METADATA_KEY, &bytes)
    }

    /// The published schema snapshot.
    pub fn published(&self) -> std::sync::Arc<Value> {
        self.tree.published()
    }

    /// The user-facing schema view.
    pub fn readable(&self) -> Value {
        readable::readable(&self.tree.published())
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Index a document. On success the schema draft (if any) is
    /// published; on error it is discarded and nothing is visible.
    pub fn index<S: Shard>(
        &mut self,
        object: &Value,
        id: Option<&Value>,
        shards: &ShardSet<S>,
    ) -> Result<IndexResult> {
        match self.index_inner(object, id, shards) {
            Ok(result) => {
                self.tree.commit();
                Ok(result)
            }
            Err(err) => {
                self.tree.discard();
                Err(err)
            }
        }
    }

    /// Apply a schema-only update. Returns true when the root was
    /// replaced by a foreign redirect.
    pub fn update(&mut self, object: &Value) -> Result<bool> {
        match self.update_inner(object, false) {
            Ok(foreign) => {
                self.tree.commit();
                Ok(foreign)
            }
            Err(err) => {
                self.tree.discard();
                Err(err)
            }
        }
    }

    /// Replace or merge the schema. `replace` clears the root first.
    pub fn write(&mut self, object: &Value, replace: bool) -> Result<bool> {
        match self.update_inner(object, replace) {
            Ok(foreign) => {
                self.tree.commit();
                Ok(foreign)
            }
            Err(err) => {
                self.tree.discard();
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Document indexing
    // -----------------------------------------------------------------------

    fn index_inner<S: Shard>(
        &mut self,
        object: &Value,
        id: Option<&Value>,
        shards: &ShardSet<S>,
    ) -> Result<IndexResult> {
        let object_map = object
            .as_object()
            .ok_or_else(|| Error::client("Document must be a map"))?;

        self.map_values.clear();
        self.spc = Specification::default();
        let mut doc = Document::new();

        self.resolve_root(object_map)?;
        let root_spc = self.spc.clone();

        // Id resolution.
        let mut id_value = id.cloned();
        let mut id_props: Option<Value> = None;
        match object_map.get("_id") {
            Some(Value::Object(map)) => id_props = Some(Value::Object(map.clone())),
            Some(scalar) if !scalar.is_null() => {
                if id_value.is_none() {
                    id_value = Some(scalar.clone());
                }
            }
            _ => {}
        }
        let spc_id = self.resolve_id_spec(id_props.as_ref(), id_value.as_ref())?;
        let (id_value, id_serialised) = match id_value {
            Some(value) => {
                let leaf = indexer::parse_leaf(&spc_id, &value)?;
                let serialised = leaf.serialised(spc_id.flags.bool_term)?;
                (leaf.normalized(&value), serialised)
            }
            None => id::allocate(&spc_id, shards)?,
        };
        let term_id = prefixed(&id_serialised, &spc_id.prefix.field, spc_id.get_ctype());
        self.map_values
            .entry(SLOT_ID)
            .or_insert_with(|| SlotValues::Bytes(Default::default()))
            .add_bytes(id_serialised);

        // Version value, when supplied.
        if let Some(version) = object_map.get("_version") {
            let version = version.as_u64().ok_or_else(|| {
                Error::client(format!("Expected a positive _version, got {version}"))
            })?;
            self.map_values
                .entry(SLOT_VERSION)
                .or_insert_with(|| SlotValues::Bytes(Default::default()))
                .add_bytes(serialise::positive(version));
        }

        // Stored object starts as the input; values are normalized in
        // place and the chosen id recorded.
        let mut data = object.clone();
        if let Some(map) = data.as_object_mut() {
            map.insert("_id".to_string(), id_value);
        }

        // Duplicate detection across sibling spellings (S1-style UUID
        // collisions) happens on the normalized segment names.
        let mut seen = HashSet::new();
        let field_names: Vec<String> = object_map
            .keys()
            .filter(|name| !is_reserved(name))
            .cloned()
            .collect();
        for name in &field_names {
            let normalized = normalize_segment(name);
            if !seen.insert(normalized.clone()) {
                return Err(Error::client(format!("Field {normalized} is duplicated")));
            }
        }

        for name in field_names {
            let value = object_map[&name].clone();
            self.spc = root_spc.clone();
            let data_map = data.as_object_mut().ok_or_else(|| {
                Error::client("Document must be a map")
            })?;
            let slot = data_map
                .entry(name.clone())
                .or_insert(Value::Null);
            let mut slot_value = std::mem::replace(slot, Value::Null);
            let outcome = self.index_object(&value, &mut slot_value, &mut doc, &name);
            let data_map = data.as_object_mut().ok_or_else(|| {
                Error::client("Document must be a map")
            })?;
            if is_erasable(&slot_value) {
                data_map.remove(&name);
            } else {
                data_map.insert(name.clone(), slot_value);
            }
            outcome?;
        }
        self.spc = root_spc;

        // Flush accumulated slots.
        let map_values = std::mem::take(&mut self.map_values);
        for (slot, values) in &map_values {
            doc.set_value(*slot, values.join());
        }

        // The document's boolean id term; the numeric sentinel is owned
        // by the storage layer and never emitted.
        if term_id != NUMERIC_ID_SENTINEL {
            doc.add_term(term_id.clone(), 0);
        }

        debug!(term = ?term_id, terms = doc.terms().len(), "document indexed");
        Ok(IndexResult {
            term_id,
            document: doc,
            object: data,
        })
    }

    /// Classify the root: feed the persisted properties and apply any
    /// supplied reserved keys (write on a fresh schema, process and
    /// consistency otherwise).
    fn resolve_root(&mut self, object_map: &Map<String, Value>) -> Result<()> {
        let root_props = self.tree.root().clone();
        let root_empty = root_props
            .as_object()
            .map(|map| map.is_empty())
            .unwrap_or(true);

        if let Some(endpoint) = foreign_endpoint(&root_props)? {
            self.spc.endpoint = Some(endpoint);
            return Err(Error::client(
                "Schema is foreign; index documents through its endpoint",
            ));
        }

        if root_empty {
            self.spc.flags.field_found = false;
            {
                let props = self.tree.get_mutable("")?;
                props.insert("_type".to_string(), json!("object"));
            }
            self.apply_reserved(object_map, true)?;
        } else {
            self.feed_node(&root_props)?;
            self.apply_reserved(object_map, false)?;
        }
        Ok(())
    }

    /// Feed persisted reserved properties into the working specification.
    fn feed_node(&mut self, props: &Value) -> Result<()> {
        let Some(map) = props.as_object() else {
            return Err(Error::corrupt(
                self.spc.full_meta_name.clone(),
                "property node is not a map",
            ));
        };
        for (key, value) in map {
            if !is_reserved(key) {
                continue;
            }
            let Some(word) = ReservedWord::parse(key) else {
                return Err(Error::corrupt(
                    self.spc.full_meta_name.clone(),
                    format!("unknown keyword {key}"),
                ));
            };
            match word {
                // Field children and root-only entries, not properties.
                ReservedWord::Id | ReservedWord::Version | ReservedWord::Schema => continue,
                _ => dispatch::feed(&mut self.spc, word, value)?,
            }
        }
        Ok(())
    }

    /// Apply the reserved keys of a supplied object to the working
    /// specification: write on new nodes, process/consistency on fed
    /// ones. Casts run last so abstract properties precede them.
    fn apply_reserved(&mut self, map: &Map<String, Value>, write: bool) -> Result<()> {
        let mut casts: Vec<(ReservedWord, &Value)> = Vec::new();
        let mut acc_prefix: Option<&Value> = None;
        for (key, value) in map {
            if !is_reserved(key) {
                continue;
            }
            let Some(word) = ReservedWord::parse(key) else {
                return Err(Error::client(format!(
                    "{key} is not a valid reserved word in {}",
                    self.label()
                )));
            };
            match word {
                ReservedWord::Id | ReservedWord::Version => continue,
                // Depends on _accuracy having been seen.
                ReservedWord::AccPrefix => acc_prefix = Some(value),
                word if word.cast_type().is_some() => casts.push((word, value)),
                word => self.dispatch_one(word, value, write)?,
            }
        }
        if let Some(value) = acc_prefix {
            self.dispatch_one(ReservedWord::AccPrefix, value, write)?;
        }
        for (word, value) in casts {
            self.dispatch_one(word, value, write)?;
        }
        Ok(())
    }

    fn dispatch_one(&mut self, word: ReservedWord, value: &Value, write: bool) -> Result<()> {
        if write {
            let full_name = self.spc.full_meta_name.clone();
            let props = self.tree.get_mutable(&full_name)?;
            dispatch::write(&mut self.spc, word, value, props)
        } else if self.spc.flags.field_found && self.spc.flags.concrete {
            dispatch::consistency(&mut self.spc, word, value)
        } else {
            dispatch::process(&mut self.spc, word, value)
        }
    }

    /// Specification for the `_id` field: fed from the persisted child
    /// when present, created otherwise; the id type is auto-detected from
    /// the first supplied value and defaults to uuid.
    fn resolve_id_spec(
        &mut self,
        id_props: Option<&Value>,
        id_value: Option<&Value>,
    ) -> Result<Specification> {
        let outer = self.spc.clone();
        self.spc = Specification::default();
        self.spc.meta_name = "_id".to_string();
        self.spc.full_meta_name = "_id".to_string();
        self.spc.flags.bool_term = true;
        self.spc.flags.has_bool_term = true;
        self.spc.index = TypeIndex::FIELD_ALL;
        self.spc.slot = SLOT_ID;
        self.spc.local_prefix.field = field_prefix("_id");
        self.spc.prefix.field = field_prefix("_id");

        let persisted = self.tree.get("_id").ok().cloned();
        let outcome = (|| -> Result<Specification> {
            let new_field = persisted.is_none();
            if let Some(props) = &persisted {
                self.feed_node(props)?;
                self.spc.flags.field_found = true;
            } else {
                self.spc.flags.field_found = false;
            }
            if let Some(props) = id_props {
                let props_map = props
                    .as_object()
                    .ok_or_else(|| Error::client("_id properties must be a map"))?;
                self.apply_reserved(props_map, new_field)?;
            }
            // The id is always an exact filter over both quadrant pairs.
            self.spc.flags.bool_term = true;
            self.spc.index = TypeIndex::FIELD_ALL;

            if self.spc.sep_types.concrete_type() == FieldType::Empty {
                let t = match id_value {
                    Some(value) => serialise::guess_type(value)?,
                    None => FieldType::Uuid,
                };
                self.spc.sep_types.set_concrete(t);
                self.spc.flags.concrete = true;
            }

            if new_field || persisted
                .as_ref()
                .and_then(|p| p.get("_type"))
                .is_none()
            {
                let type_str = format_type(&self.spc.sep_types);
                let props = self.tree.get_mutable("_id")?;
                props.insert("_type".to_string(), json!(type_str));
                props.insert("_bool_term".to_string(), json!(true));
                props.insert(
                    "_prefix".to_string(),
                    json!(dispatch::encode_prefix(&self.spc.local_prefix.field)),
                );
                props.insert("_slot".to_string(), json!(SLOT_ID));
                props.insert("_index".to_string(), json!(self.spc.index.as_str()));
            }
            Ok(self.spc.clone())
        })();
        self.spc = outer;
        outcome
    }

    // -----------------------------------------------------------------------
    // Recursive descent
    // -----------------------------------------------------------------------

    /// Index one named child of the current object.
    fn index_object(
        &mut self,
        value: &Value,
        data: &mut Value,
        doc: &mut Document,
        name: &str,
    ) -> Result<()> {
        if name.is_empty() || is_comment(name) {
            // Comments are stored verbatim, never indexed.
            return Ok(());
        }
        if is_valid_field_name(name)
            && (!self.spc.flags.recurse || self.spc.ignored.contains(name))
        {
            // Stored verbatim per _recurse/_ignore.
            return Ok(());
        }

        self.get_subproperties(name)?;

        match value {
            Value::Object(map) => self.index_map(map, data, doc),
            Value::Array(items) => {
                self.spc.sep_types.set_array();
                self.index_array(items, data, doc)
            }
            Value::Null => {
                self.index_partial_paths(doc);
                Ok(())
            }
            leaf => self.index_item_value(doc, data, leaf, 0),
        }
    }

    /// Resolve (and create as needed) the schema path for a field name,
    /// which may be dotted and may cross UUID-named segments.
    fn get_subproperties(&mut self, name: &str) -> Result<()> {
        let segments: Vec<&str> = name.split(PATH_SEP).collect();
        for segment in segments {
            if segment.is_empty() {
                return Err(Error::client(format!("Field {name} has an empty segment")));
            }
            let uuid_segment = uuids::is_uuid_like(segment) && self.spc.flags.uuid_detection;
            let canonical = if uuid_segment {
                uuids::normalize(segment)?
            } else {
                segment.to_string()
            };

            // Namespace ancestors accumulate their prefixes before the
            // child extends them.
            if self.spc.flags.is_namespace {
                self.spc.partial_prefixes.push(self.spc.prefix.clone());
                self.spc.flags.inside_namespace = true;
                self.spc.flags.is_namespace = false;
            }

            self.spc.meta_name = canonical.clone();
            if self.spc.full_meta_name.is_empty() {
                self.spc.full_meta_name = canonical.clone();
            } else {
                self.spc.full_meta_name =
                    format!("{}{PATH_SEP}{canonical}", self.spc.full_meta_name);
            }

            // Reset the node-local state inherited from the parent.
            self.spc.flags.concrete = false;
            self.spc.flags.complete = false;
            self.spc.flags.has_bool_term = false;
            self.spc.flags.bool_term = false;
            self.spc.flags.uuid_field = false;
            self.spc.sep_types = strata_core::SepTypes::default();
            self.spc.slot = BAD_SLOT;
            self.spc.accuracy = Vec::new();
            self.spc.acc_prefix = Vec::new();
            self.spc.local_prefix = Prefix::default();
            self.spc.reset_pending();

            let full_name = self.spc.full_meta_name.clone();
            let persisted = self.tree.get(&full_name).ok().cloned();
            match persisted {
                Some(props) => {
                    self.spc.flags.field_found = true;
                    self.feed_node(&props)?;
                }
                None => {
                    if !self.spc.flags.dynamic {
                        return Err(Error::client(format!(
                            "Field {full_name} does not exist and dynamic fields are disabled"
                        )));
                    }
                    self.spc.flags.field_found = false;
                    self.add_field(uuid_segment, &canonical)?;
                }
            }
            if self.spc.local_prefix.field.is_empty() {
                self.spc.local_prefix.field = field_prefix(&full_name);
            }

            if uuid_segment {
                self.spc.flags.uuid_field = true;
                self.spc.flags.uuid_path = true;
            }
            self.update_prefixes(uuid_segment, &canonical)?;
        }
        Ok(())
    }

    /// Create a new schema node for the current path and remember its
    /// generated prefix.
    fn add_field(&mut self, uuid_segment: bool, canonical: &str) -> Result<()> {
        let full_name = self.spc.full_meta_name.clone();
        self.spc.local_prefix.field = field_prefix(&full_name);
        let prefix_encoded = dispatch::encode_prefix(&self.spc.local_prefix.field);
        let props = self.tree.get_mutable(&full_name)?;
        props.insert("_prefix".to_string(), json!(prefix_encoded));
        if uuid_segment {
            debug!(field = %canonical, "created uuid field");
        } else {
            debug!(field = %canonical, "created field");
        }
        Ok(())
    }

    /// Extend the running prefixes with the current segment, handling
    /// the three UUID derivation strategies.
    fn update_prefixes(&mut self, uuid_segment: bool, canonical: &str) -> Result<()> {
        if uuid_segment {
            let parsed = uuids::parse(canonical)?;
            let local_uuid = uuid_prefix(parsed.as_bytes());
            match self.spc.index_uuid_field {
                UuidFieldIndex::Uuid => {
                    self.spc.prefix.field.extend_from_slice(&local_uuid);
                    if self.spc.flags.has_uuid_prefix {
                        self.spc.prefix.uuid.extend_from_slice(&local_uuid);
                    }
                }
                UuidFieldIndex::UuidField => {
                    let local_field = self.spc.local_prefix.field.clone();
                    self.spc.prefix.field.extend_from_slice(&local_field);
                    if self.spc.flags.has_uuid_prefix {
                        self.spc.prefix.uuid.extend_from_slice(&local_field);
                    }
                }
                UuidFieldIndex::Both => {
                    if !self.spc.flags.has_uuid_prefix {
                        self.spc.prefix.uuid = self.spc.prefix.field.clone();
                    }
                    let local_field = self.spc.local_prefix.field.clone();
                    self.spc.prefix.field.extend_from_slice(&local_field);
                    self.spc.prefix.uuid.extend_from_slice(&local_uuid);
                    self.spc.flags.has_uuid_prefix = true;
                }
            }
        } else {
            let local_field = self.spc.local_prefix.field.clone();
            self.spc.prefix.field.extend_from_slice(&local_field);
            if self.spc.flags.has_uuid_prefix {
                self.spc.prefix.uuid.extend_from_slice(&local_field);
            }
        }
        Ok(())
    }

    /// Index an object-valued field: apply its reserved properties,
    /// recurse into children, and index any pending leaf. Collapses
    /// `{_value: x}` in the stored object.
    fn index_map(
        &mut self,
        map: &Map<String, Value>,
        data: &mut Value,
        doc: &mut Document,
    ) -> Result<()> {
        let write = !self.spc.flags.field_found;
        self.apply_reserved(map, write)?;

        // Schema metadata is not document content; the stored object
        // keeps values, casts and comments only.
        if let Value::Object(data_map) = data {
            data_map.retain(|key, _| {
                !is_reserved(key)
                    || ReservedWord::parse(key).and_then(ReservedWord::cast_type).is_some()
            });
        }

        let children: Vec<&String> = map
            .keys()
            .filter(|k| is_valid_field_name(k))
            .collect();

        // A foreign field lives in another index; it cannot also carry
        // concrete children or a leaf value here.
        if self.spc.sep_types.foreign()
            && (!children.is_empty()
                || self.spc.value.is_some()
                || self.spc.value_rec.is_some())
        {
            return Err(Error::client(format!(
                "Foreign field {} cannot have values or child fields",
                self.label()
            )));
        }

        // Duplicate spellings among children (uuid forms) collapse.
        let mut seen = HashSet::new();
        for name in &children {
            let normalized = normalize_segment(name);
            if !seen.insert(normalized.clone()) {
                return Err(Error::client(format!("Field {normalized} is duplicated")));
            }
        }

        if !children.is_empty() {
            self.spc.sep_types.set_object();
            let parent_spc = self.spc.clone();
            for name in children {
                let value = map[name.as_str()].clone();
                self.spc = parent_spc.clone();
                let data_map = match &mut *data {
                    Value::Object(map) => map,
                    other => {
                        *other = Value::Object(Map::new());
                        match other {
                            Value::Object(map) => map,
                            _ => unreachable!("just assigned"),
                        }
                    }
                };
                let slot = data_map.entry(name.clone()).or_insert(Value::Null);
                let mut slot_value = std::mem::replace(slot, Value::Null);
                let outcome = self.index_object(&value, &mut slot_value, doc, name);
                if let Value::Object(data_map) = data {
                    if is_erasable(&slot_value) {
                        data_map.remove(name.as_str());
                    } else {
                        data_map.insert(name.clone(), slot_value);
                    }
                }
                outcome?;
            }
            self.spc = parent_spc;
        }

        // Pending leaves from _value and cast properties.
        let pending_value = self.spc.value.take();
        let pending_rec = self.spc.value_rec.take();
        if let Some(value) = pending_rec {
            let mut rec_data = Value::Null;
            self.index_item_value(doc, &mut rec_data, &value, 0)?;
        }
        if let Some(value) = pending_value {
            let mut value_data = Value::Null;
            match &value {
                Value::Array(items) => {
                    self.spc.sep_types.set_array();
                    value_data = Value::Array(Vec::new());
                    self.index_array(items, &mut value_data, doc)?;
                }
                leaf => self.index_item_value(doc, &mut value_data, leaf, 0)?,
            }
            // Collapse {_value: x} to x in the stored object.
            match data {
                Value::Object(data_map) if !data_map.is_empty() => {
                    data_map.insert("_value".to_string(), value_data);
                }
                other => *other = value_data,
            }
        }
        Ok(())
    }

    /// Per-element recursion over an array value, preserving positions.
    fn index_array(
        &mut self,
        items: &[Value],
        data: &mut Value,
        doc: &mut Document,
    ) -> Result<()> {
        let mut stored: Vec<Value> = Vec::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            match item {
                Value::Object(map) => {
                    let parent_spc = self.spc.clone();
                    let mut slot = item.clone();
                    let outcome = self.index_map(map, &mut slot, doc);
                    self.spc = parent_spc;
                    outcome?;
                    stored.push(slot);
                }
                Value::Null => {
                    self.index_partial_paths(doc);
                    stored.push(Value::Null);
                }
                leaf => {
                    let mut normalized = Value::Null;
                    self.index_item_value(doc, &mut normalized, leaf, pos)?;
                    stored.push(normalized);
                }
            }
        }
        *data = Value::Array(stored);
        Ok(())
    }

    /// Index one leaf value: settle the type, complete the
    /// specification, emit terms/values, and normalize the stored form.
    fn index_item_value(
        &mut self,
        doc: &mut Document,
        data: &mut Value,
        value: &Value,
        pos: usize,
    ) -> Result<()> {
        if !self.spc.flags.concrete {
            let t = self.detect_type(value)?;
            self.spc.sep_types.set_concrete(t);
            self.spc.flags.concrete = true;
        }
        self.complete_specification()?;
        let leaf = indexer::index_item(&self.spc, doc, &mut self.map_values, value, pos)?;
        self.index_partial_paths(doc);

        let normalized = leaf.normalized(value);
        indexer::add_value(data, normalized);
        Ok(())
    }

    /// Detection policy: consulted only when no explicit type exists and
    /// strict mode is off.
    fn detect_type(&self, value: &Value) -> Result<FieldType> {
        let flags = &self.spc.flags;
        if flags.strict {
            return Err(Error::MissingType(self.label()));
        }
        let undetectable = || {
            Error::serialisation(format!(
                "Cannot detect the type of {value} in {}",
                self.label()
            ))
        };
        Ok(match value {
            Value::Bool(_) => {
                if !flags.bool_detection {
                    return Err(undetectable());
                }
                FieldType::Boolean
            }
            Value::Number(n) => {
                if !flags.numeric_detection {
                    return Err(undetectable());
                }
                if n.is_u64() {
                    FieldType::Positive
                } else if n.is_i64() {
                    FieldType::Integer
                } else {
                    FieldType::Floating
                }
            }
            Value::String(s) => {
                if flags.uuid_detection && uuids::is_uuid_like(s) {
                    FieldType::Uuid
                } else if flags.datetime_detection && strata_core::temporal::looks_like_datetime(s)
                {
                    FieldType::Datetime
                } else if flags.date_detection && strata_core::temporal::looks_like_date(s) {
                    FieldType::Date
                } else if flags.time_detection && strata_core::temporal::looks_like_time(s) {
                    FieldType::Time
                } else if flags.timedelta_detection
                    && strata_core::temporal::looks_like_timedelta(s)
                {
                    FieldType::Timedelta
                } else if flags.bool_detection && (s == "true" || s == "false") {
                    FieldType::Boolean
                } else if flags.geo_detection && strata_spatial::is_ewkt(s) {
                    FieldType::Geo
                } else if flags.text_detection {
                    if flags.bool_term {
                        FieldType::Keyword
                    } else {
                        FieldType::Text
                    }
                } else {
                    return Err(undetectable());
                }
            }
            _ => return Err(undetectable()),
        })
    }

    /// Finish a concrete specification: settle slot, accuracies and the
    /// boolean-term default, derive namespace targets, and persist the
    /// essentials for new fields.
    fn complete_specification(&mut self) -> Result<()> {
        if self.spc.flags.complete {
            return Ok(());
        }
        let t = self.spc.sep_types.concrete_type();

        // Keyword fields named with an uppercase character filter
        // exactly by default.
        if t == FieldType::Keyword && !self.spc.flags.has_bool_term {
            self.spc.flags.bool_term =
                self.spc.meta_name.chars().any(char::is_uppercase);
        }

        if self.spc.slot == BAD_SLOT {
            self.spc.slot = slot_for(&self.spc.prefix.field, t.ctype());
        }

        // Per-document accuracy override, else persisted, else defaults.
        if let Some(mut doc_acc) = self.spc.doc_acc.take() {
            doc_acc.sort_unstable();
            doc_acc.dedup();
            self.validate_accuracy(t, &doc_acc)?;
            if self.spc.flags.field_found && !self.spc.accuracy.is_empty()
                && self.spc.accuracy != doc_acc
            {
                return Err(Error::client(format!(
                    "It is not allowed to change _accuracy  [{:?}  ->  {:?}]  in {}",
                    self.spc.accuracy,
                    doc_acc,
                    self.label()
                )));
            }
            self.spc.accuracy = doc_acc;
            if let Some(prefixes) = self.spc.doc_acc_prefix.take() {
                if prefixes.len() != self.spc.accuracy.len() {
                    return Err(Error::client(format!(
                        "_acc_prefix length does not match _accuracy in {}",
                        self.label()
                    )));
                }
                self.spc.acc_prefix = prefixes;
            }
        } else if self.spc.accuracy.is_empty() {
            if let Some(defaults) = default_accuracy(t) {
                self.spc.accuracy = defaults.to_vec();
            }
        }
        if self.spc.acc_prefix.len() != self.spc.accuracy.len() {
            self.spc.acc_prefix = self
                .spc
                .accuracy
                .iter()
                .map(|&acc| acc_prefix_for(&self.spc.prefix.field, acc))
                .collect();
        }

        // Namespace targets: one combined prefix per accumulated
        // ancestor prefix.
        if self.spc.flags.inside_namespace {
            let local = self.spc.local_prefix.field.clone();
            self.spc.partial_index_spcs = self
                .spc
                .partial_prefixes
                .iter()
                .map(|ancestor| {
                    let mut combined = ancestor.field.clone();
                    combined.extend_from_slice(&local);
                    PartialSpec {
                        slot: slot_for(&combined, t.ctype()),
                        prefix: combined,
                    }
                })
                .collect();
        }

        if !self.spc.flags.field_found {
            self.persist_essentials()?;
        }
        self.spc.flags.complete = true;
        Ok(())
    }

    fn validate_accuracy(&self, t: FieldType, accuracy: &[u64]) -> Result<()> {
        match t {
            FieldType::Date | FieldType::Datetime => {
                for acc in accuracy {
                    if !validate_acc_date(*acc) {
                        return Err(Error::client(format!(
                            "Invalid date accuracy {acc} in {}",
                            self.label()
                        )));
                    }
                }
            }
            FieldType::Geo => {
                for acc in accuracy {
                    if *acc > u64::from(MAX_LEVEL) {
                        return Err(Error::client(format!(
                            "Invalid geospatial accuracy level {acc} in {}",
                            self.label()
                        )));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Mirror the settled essentials of a new field into the draft.
    fn persist_essentials(&mut self) -> Result<()> {
        let type_str = format_type(&self.spc.sep_types);
        let slot = self.spc.slot;
        let prefix = dispatch::encode_prefix(&self.spc.local_prefix.field);
        let accuracy = self.spc.accuracy.clone();
        let acc_prefix: Vec<String> = self
            .spc
            .acc_prefix
            .iter()
            .map(|p| dispatch::encode_prefix(p))
            .collect();
        let bool_term = self.spc.flags.bool_term;
        let is_keyword = self.spc.sep_types.concrete_type() == FieldType::Keyword;
        let full_name = self.spc.full_meta_name.clone();

        let props = self.tree.get_mutable(&full_name)?;
        props.insert("_type".to_string(), json!(type_str));
        props.insert("_prefix".to_string(), json!(prefix));
        props.insert("_slot".to_string(), json!(slot));
        if !accuracy.is_empty() {
            props.insert("_accuracy".to_string(), json!(accuracy));
            props.insert("_acc_prefix".to_string(), json!(acc_prefix));
        }
        if is_keyword {
            props.insert("_bool_term".to_string(), json!(bool_term));
        }
        Ok(())
    }

    /// Emit ancestor-prefix presence terms so queries on partial paths
    /// match.
    fn index_partial_paths(&mut self, doc: &mut Document) {
        if !(self.spc.flags.partial_paths || self.spc.flags.inside_namespace) {
            return;
        }
        for ancestor in &self.spc.partial_prefixes {
            if !ancestor.field.is_empty() {
                doc.add_term(ancestor.field.clone(), 0);
            }
        }
        if !self.spc.prefix.field.is_empty() {
            doc.add_term(self.spc.prefix.field.clone(), 0);
        }
    }

    fn label(&self) -> String {
        if self.spc.full_meta_name.is_empty() {
            "the root".to_string()
        } else {
            self.spc.full_meta_name.clone()
        }
    }

    // -----------------------------------------------------------------------
    // Schema-only updates
    // -----------------------------------------------------------------------

    fn update_inner(&mut self, object: &Value, replace: bool) -> Result<bool> {
        let (endpoint, payload) = SchemaTree::check(object, true, true)?;
        if let Some(endpoint) = endpoint {
            self.tree.clear();
            let props = self.tree.get_mutable("")?;
            props.insert("_type".to_string(), json!("foreign/object"));
            props.insert("_endpoint".to_string(), json!(endpoint));
            debug!("schema root replaced by foreign redirect");
            return Ok(true);
        }
        let payload = payload.clone();
        if replace {
            self.tree.clear();
        }

        self.spc = Specification::default();
        let payload_map = payload
            .as_object()
            .ok_or_else(|| Error::client("Schema must be a map"))?;

        let root_props = self.tree.root().clone();
        let root_empty = root_props
            .as_object()
            .map(|map| map.is_empty())
            .unwrap_or(true);
        if root_empty {
            self.spc.flags.field_found = false;
            let props = self.tree.get_mutable("")?;
            props.insert("_type".to_string(), json!("object"));
        } else {
            self.feed_node(&root_props)?;
        }
        self.apply_reserved(payload_map, root_empty)?;
        let root_spc = self.spc.clone();

        // _id may carry property declarations at the root.
        if let Some(id_props) = payload_map.get("_id") {
            self.resolve_id_spec(Some(id_props), None)?;
        }

        for (name, value) in payload_map {
            if is_reserved(name) || is_comment(name) {
                continue;
            }
            self.spc = root_spc.clone();
            self.update_schema_field(name, value)?;
        }
        self.spc = root_spc;
        Ok(false)
    }

    /// Recursively apply property declarations for one schema field.
    fn update_schema_field(&mut self, name: &str, value: &Value) -> Result<()> {
        let map = value.as_object().ok_or_else(|| {
            Error::client(format!(
                "Schema field {name} must map to properties, got {value}"
            ))
        })?;
        self.get_subproperties(name)?;
        let write = !self.spc.flags.field_found;
        self.apply_reserved(map, write)?;
        // Settle concrete declarations so prefixes/slots/accuracies are
        // persisted even before the first document arrives.
        if self.spc.flags.concrete {
            self.complete_specification()?;
        }
        let parent_spc = self.spc.clone();
        for (child, child_value) in map {
            if is_reserved(child) || is_comment(child) {
                continue;
            }
            self.spc = parent_spc.clone();
            self.update_schema_field(child, child_value)?;
        }
        self.spc = parent_spc;
        Ok(())
    }
}

/// Normalize a sibling name for duplicate detection: every spelling of a
/// UUID collapses to its canonical form, per dotted segment.
fn normalize_segment(name: &str) -> String {
    name.split(PATH_SEP)
        .map(|segment| uuids::normalize(segment).unwrap_or_else(|_| segment.to_string()))
        .collect::<Vec<_>>()
        .join(".")
}

/// True when the root properties declare a foreign redirect.
fn foreign_endpoint(props: &Value) -> Result<Option<String>> {
    let Some(map) = props.as_object() else {
        return Ok(None);
    };
    let Some(type_str) = map.get("_type").and_then(Value::as_str) else {
        return Ok(None);
    };
    let sep = strata_core::parse_type(type_str)?;
    if !sep.foreign() {
        return Ok(None);
    }
    Ok(map
        .get("_endpoint")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Stored objects drop keys whose value collapsed to nothing.
fn is_erasable(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Merge an update patch over a stored object: maps merge recursively,
/// everything else is replaced by the patch.
pub fn merge_objects(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut merged = base_map.clone();
            for (key, patch_value) in patch_map {
                let entry = match merged.get(key) {
                    Some(base_value) => merge_objects(base_value, patch_value),
                    None => patch_value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        (_, patch) => patch.clone(),
    }
}
