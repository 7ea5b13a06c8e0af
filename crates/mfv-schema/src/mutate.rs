//! Document mutations performed before a validator runs.
//!
//! Two independent passes driven by the schema:
//!
//! - defaults: absent properties whose subschema declares `default` get a
//!   copy of that value;
//! - stripping: objects whose schema says `additionalProperties: false`
//!   lose every key not listed under `properties`.
//!
//! The walk follows `properties`, `items`, `prefixItems`, `allOf` and
//! `$ref`. Subschemas under `anyOf`/`oneOf`/`not` are never used for
//! mutation because which branch applies is unknown until validation.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Bound on `$ref` hops, guarding recursive schemas.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mutations {
    pub apply_defaults: bool,
    pub strip_additional: bool,
}

impl Mutations {
    pub fn is_noop(&self) -> bool {
        !self.apply_defaults && !self.strip_additional
    }
}

/// Applies mutations to `doc` according to `schema`.
///
/// `refs` resolves non-local `$ref`s: registration names, declared ids and
/// `json-schema:///` URIs, as built by the engine's registry snapshot.
pub(crate) fn apply(
    mutations: Mutations,
    schema: &Value,
    refs: &HashMap<String, Value>,
    doc: &mut Value,
) {
    if mutations.is_noop() {
        return;
    }
    let walker = Walker {
        mutations,
        root: schema,
        refs,
    };
    walker.visit(schema, schema, doc, 0);
}

struct Walker<'a> {
    mutations: Mutations,
    root: &'a Value,
    refs: &'a HashMap<String, Value>,
}

impl<'a> Walker<'a> {
    /// `base` is the document `#` refers to while inside `schema`.
    fn visit(&self, base: &'a Value, schema: &'a Value, doc: &mut Value, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        let Some(node) = schema.as_object() else {
            return;
        };

        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            if let Some((target_base, target)) = self.resolve(base, reference) {
                self.visit(target_base, target, doc, depth + 1);
            }
        }

        if let Some(Value::Array(all)) = node.get("allOf") {
            for sub in all {
                self.visit(base, sub, doc, depth + 1);
            }
        }

        match doc {
            Value::Object(fields) => self.visit_object(base, node, fields, depth),
            Value::Array(items) => self.visit_array(base, node, items, depth),
            _ => {}
        }
    }

    fn visit_object(
        &self,
        base: &'a Value,
        node: &'a Map<String, Value>,
        fields: &mut Map<String, Value>,
        depth: usize,
    ) {
        let properties = node.get("properties").and_then(Value::as_object);

        if self.mutations.strip_additional
            && node.get("additionalProperties") == Some(&Value::Bool(false))
            && !node.contains_key("patternProperties")
        {
            fields.retain(|key, _| properties.is_some_and(|p| p.contains_key(key)));
        }

        let Some(properties) = properties else {
            return;
        };
        for (key, sub) in properties {
            if self.mutations.apply_defaults && !fields.contains_key(key) {
                if let Some(default) = sub.get("default") {
                    fields.insert(key.clone(), default.clone());
                }
            }
            if let Some(value) = fields.get_mut(key) {
                self.visit(base, sub, value, depth + 1);
            }
        }
    }

    fn visit_array(
        &self,
        base: &'a Value,
        node: &'a Map<String, Value>,
        items: &mut [Value],
        depth: usize,
    ) {
        // Tuple form: `prefixItems` (2020-12) or array-valued `items` (draft-07).
        let tuple = node
            .get("prefixItems")
            .or_else(|| node.get("items").filter(|i| i.is_array()))
            .and_then(Value::as_array);

        if let Some(tuple) = tuple {
            for (sub, item) in tuple.iter().zip(items.iter_mut()) {
                self.visit(base, sub, item, depth + 1);
            }
            return;
        }

        if let Some(sub) = node.get("items").filter(|i| i.is_object()) {
            for item in items.iter_mut() {
                self.visit(base, sub, item, depth + 1);
            }
        }
    }

    fn resolve(&self, base: &'a Value, reference: &str) -> Option<(&'a Value, &'a Value)> {
        if let Some(pointer) = reference.strip_prefix('#') {
            return pointer_target(base, pointer).map(|target| (base, target));
        }

        let (document, fragment) = match reference.split_once('#') {
            Some((document, fragment)) => (document, Some(fragment)),
            None => (reference, None),
        };
        let target_base = self.lookup(document)?;
        match fragment {
            Some(pointer) => pointer_target(target_base, pointer).map(|t| (target_base, t)),
            None => Some((target_base, target_base)),
        }
    }

    fn lookup(&self, document: &str) -> Option<&'a Value> {
        if let Some(found) = self.refs.get(document) {
            return Some(found);
        }
        let bare = document.strip_prefix(crate::engine::DEFAULT_BASE_URI)?;
        self.refs.get(bare).or_else(|| {
            // A self-reference through the schema's own relative id.
            (self.root.get("$id").and_then(Value::as_str) == Some(bare)).then_some(self.root)
        })
    }
}

fn pointer_target<'v>(base: &'v Value, pointer: &str) -> Option<&'v Value> {
    if pointer.is_empty() {
        Some(base)
    } else {
        base.pointer(pointer)
    }
}
