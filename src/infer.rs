//! Model inference engine (arena + registries, single run).
//!
//! Classify one parsed JSON value into a typed node tree, then emit a
//! deduplicated, ordered sequence of named definitions.
//!
//! Design goals:
//! - Bottom-up emission: levels are processed deepest-first so every inner
//!   type is defined before an outer type references it.
//! - Content-addressed dedup: structurally identical objects anywhere in the
//!   tree resolve to one canonical name; only the first is emitted.
//! - No ambient state: all registries live in the run context and die with it.
//! - The only suspension point is the injected `confirm` callback deciding
//!   whether divergent siblings get merged.

pub mod def;
pub mod naming;
mod consolidate;

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::InferError;
pub use def::{Definition, FieldLine};
pub use naming::IdentPolicy;

// ------------------------------ Node arena -------------------------------- //

pub type NodeId = usize;

/// Leaf type of a scalar JSON value. Its resolved name is the kind itself;
/// scalars never enter the digest registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
    Null,
}

impl ScalarKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Null => "null",
        }
    }
}

#[derive(Debug)]
pub enum NodeKind {
    Scalar(ScalarKind),
    /// Elements keep the list's own key so dict-valued elements at different
    /// positions share a naming basis.
    List { elems: Vec<NodeId> },
    /// Field insertion order is preserved; it participates in the signature.
    Object { fields: IndexMap<String, NodeId> },
}

#[derive(Debug)]
pub struct Node {
    /// JSON key (or synthetic root key) this node was discovered under.
    pub key: String,
    /// Ancestor keys from the root, excluding this node's own key.
    pub ancestry: Vec<String>,
    pub kind: NodeKind,
}

// ------------------------------ Run context ------------------------------- //

/// One inference run over one JSON value.
///
/// Holds the node arena, the level index, and the digest / name-counter
/// registries. Reusing any of these across inputs would corrupt dedup and
/// the collision-counter sequence, so `run` consumes the context.
pub struct Inference {
    nodes: Vec<Node>,
    /// Composite (object/list) nodes bucketed by ancestry depth.
    levels: Vec<Vec<NodeId>>,
    /// Memoized resolved name per node, keyed by arena index.
    names: Vec<Option<String>>,
    /// Pending definition text per node; `None` for scalars, references and
    /// already-emitted nodes.
    defs: Vec<Option<Definition>>,
    /// Structural signature -> canonical type name.
    signatures: HashMap<[u8; 32], String>,
    /// Base class name -> next collision index (1 = bare name still free).
    counters: HashMap<String, u32>,
    policy: IdentPolicy,
}

impl Inference {
    pub fn new() -> Self {
        Self::with_policy(IdentPolicy::default())
    }

    pub fn with_policy(policy: IdentPolicy) -> Self {
        Self {
            nodes: Vec::new(),
            levels: Vec::new(),
            names: Vec::new(),
            defs: Vec::new(),
            signatures: HashMap::new(),
            counters: HashMap::new(),
            policy,
        }
    }

    /// Run the whole inference: classify, then emit level by level.
    ///
    /// `confirm` is consulted at most once per level when structurally
    /// divergent siblings share a key (see [`consolidate`]); automated
    /// callers pass a constant closure.
    pub fn run(
        mut self,
        value: &Value,
        root_key: &str,
        confirm: &mut dyn FnMut(&[Definition]) -> bool,
    ) -> Result<Vec<Definition>, InferError> {
        match value {
            Value::Object(_) | Value::Array(_) => {
                self.classify(value, root_key, &[])?;
            }
            _ => {
                // Degenerate: a top-level scalar has no composite to define.
                debug!("top-level scalar value, nothing to emit");
                return Ok(Vec::new());
            }
        }
        Ok(self.emit(confirm))
    }

    // ------------------------------ Classifier ---------------------------- //

    fn classify(
        &mut self,
        value: &Value,
        key: &str,
        ancestry: &[String],
    ) -> Result<NodeId, InferError> {
        let kind = match value {
            Value::Null => NodeKind::Scalar(ScalarKind::Null),
            Value::Bool(_) => NodeKind::Scalar(ScalarKind::Boolean),
            Value::String(_) => NodeKind::Scalar(ScalarKind::String),
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    NodeKind::Scalar(ScalarKind::Integer)
                } else if n.is_f64() {
                    NodeKind::Scalar(ScalarKind::Float)
                } else {
                    return Err(InferError::UnsupportedValue {
                        key: key.to_string(),
                        detail: format!("number {n} fits neither i64 nor f64"),
                    });
                }
            }
            Value::Array(xs) => {
                let mut child_ancestry = ancestry.to_vec();
                child_ancestry.push(key.to_string());
                let elems = xs
                    .iter()
                    .map(|el| self.classify(el, key, &child_ancestry))
                    .collect::<Result<Vec<_>, _>>()?;
                NodeKind::List { elems }
            }
            Value::Object(map) => {
                let mut child_ancestry = ancestry.to_vec();
                child_ancestry.push(key.to_string());
                let mut fields = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    let child = self.classify(v, k, &child_ancestry)?;
                    fields.insert(k.clone(), child);
                }
                NodeKind::Object { fields }
            }
        };

        let composite = matches!(kind, NodeKind::List { .. } | NodeKind::Object { .. });
        let id = self.alloc(Node {
            key: key.to_string(),
            ancestry: ancestry.to_vec(),
            kind,
        });
        if composite {
            let depth = ancestry.len();
            if self.levels.len() <= depth {
                self.levels.resize_with(depth + 1, Vec::new);
            }
            self.levels[depth].push(id);
        }
        Ok(id)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.names.push(None);
        self.defs.push(None);
        id
    }

    // ------------------------------ Resolution ---------------------------- //

    /// Resolved type name of a node, memoized by arena index.
    ///
    /// The first resolution of an object may allocate a name and stage a
    /// definition, so this must run at most once per node.
    fn resolve(&mut self, id: NodeId) -> String {
        if let Some(name) = &self.names[id] {
            return name.clone();
        }
        let name = match &self.nodes[id].kind {
            NodeKind::Scalar(kind) => kind.type_name().to_string(),
            NodeKind::List { elems } => {
                let elems = elems.clone();
                self.resolve_list(&elems)
            }
            NodeKind::Object { fields } => {
                let fields: Vec<(String, NodeId)> =
                    fields.iter().map(|(k, &v)| (k.clone(), v)).collect();
                self.resolve_object(id, &fields)
            }
        };
        self.names[id] = Some(name.clone());
        name
    }

    /// `list<A | B>` over the deduplicated element names, sorted with the
    /// numeric-aware comparator so the textual form is independent of
    /// element order. An empty list stays a bare `list`.
    fn resolve_list(&mut self, elems: &[NodeId]) -> String {
        let mut members: Vec<String> = elems.iter().map(|&e| self.resolve(e)).collect();
        members.sort_by(|a, b| naming::cmp_names(a, b));
        members.dedup();
        if members.is_empty() {
            "list".to_string()
        } else {
            format!("list<{}>", members.join(" | "))
        }
    }

    fn resolve_object(&mut self, id: NodeId, fields: &[(String, NodeId)]) -> String {
        let mut lines = Vec::with_capacity(fields.len());
        for (key, child) in fields {
            let type_name = self.resolve(*child);
            let (ident, alias) = self.policy.emit_ident(key);
            lines.push(FieldLine { ident, type_name, alias });
        }

        let sig = def::signature(&lines);
        if let Some(existing) = self.signatures.get(&sig) {
            trace!(name = existing.as_str(), "structural duplicate, reusing canonical name");
            return existing.clone();
        }

        let base = self.policy.base_name(&self.nodes[id].key);
        let next = self.counters.entry(base.clone()).or_insert(1);
        let name = if *next == 1 {
            base.clone()
        } else {
            format!("{base}{next}")
        };
        *next += 1;

        debug!(name = name.as_str(), fields = lines.len(), "new definition");
        self.signatures.insert(sig, name.clone());
        self.defs[id] = Some(Definition { name: name.clone(), lines });
        name
    }

    // --------------------------- Emission driver -------------------------- //

    /// Walk levels deepest-first. Per level: resolve every composite in
    /// discovery order (this fixes collision suffixes), offer one merge, then
    /// drain the staged definitions sorted by resolved name.
    fn emit(&mut self, confirm: &mut dyn FnMut(&[Definition]) -> bool) -> Vec<Definition> {
        let mut out = Vec::new();
        for depth in (0..self.levels.len()).rev() {
            let bucket = self.levels[depth].clone();
            for &id in &bucket {
                self.resolve(id);
            }
            self.consolidate_level(&bucket, confirm);

            let mut ordered = bucket;
            ordered.sort_by(|&a, &b| {
                let an = self.names[a].as_deref().unwrap_or_default();
                let bn = self.names[b].as_deref().unwrap_or_default();
                naming::cmp_names(an, bn)
            });
            for id in ordered {
                if let Some(definition) = self.defs[id].take() {
                    out.push(definition);
                }
            }
        }
        out
    }
}

impl Default for Inference {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------- Front API -------------------------------- //

/// One-shot inference over a parsed JSON value.
pub fn infer_value(
    value: &Value,
    root_key: &str,
    confirm: &mut dyn FnMut(&[Definition]) -> bool,
) -> Result<Vec<Definition>, InferError> {
    Inference::new().run(value, root_key, confirm)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn infer(value: &Value) -> Vec<Definition> {
        infer_value(value, "data", &mut |_| false).unwrap()
    }

    fn names(defs: &[Definition]) -> Vec<&str> {
        defs.iter().map(|d| d.name.as_str()).collect()
    }

    fn line(def: &Definition, ident: &str) -> FieldLine {
        def.lines
            .iter()
            .find(|l| l.ident == ident)
            .unwrap_or_else(|| panic!("no field `{ident}` in {}", def.name))
            .clone()
    }

    #[test]
    fn nested_object_emits_inner_before_root() {
        let v = json!({"a": "x", "c": {"ca": "y", "cb": ["z"]}});
        let defs = infer(&v);
        assert_eq!(names(&defs), vec!["CType", "DataType"]);

        let c = &defs[0];
        assert_eq!(line(c, "ca").type_name, "string");
        assert_eq!(line(c, "cb").type_name, "list<string>");

        let root = &defs[1];
        assert_eq!(line(root, "a").type_name, "string");
        assert_eq!(line(root, "c").type_name, "CType");
    }

    #[test]
    fn divergent_list_elements_become_sorted_union() {
        let v = json!({"b": [{"ba": 1, "bb": 2}, {"bc": 1, "bd": 2}]});
        let defs = infer(&v);
        assert_eq!(names(&defs), vec!["BType", "BType2", "DataType"]);
        assert_eq!(line(&defs[2], "b").type_name, "list<BType | BType2>");
    }

    #[test]
    fn structural_duplicates_collapse_to_one_definition() {
        let v = json!({"x": {"a": 1}, "y": {"a": 1}});
        let defs = infer(&v);
        assert_eq!(names(&defs), vec!["XType", "DataType"]);
        let root = &defs[1];
        assert_eq!(line(root, "x").type_name, "XType");
        assert_eq!(line(root, "y").type_name, "XType");
    }

    #[test]
    fn collision_suffixes_follow_discovery_order_deepest_first() {
        let v = json!({
            "item": {"a": 1},
            "x": {"item": {"b": 2}},
            "y": {"z": {"item": {"c": 3}}}
        });
        let defs = infer(&v);
        // The depth-3 occurrence resolves first and keeps the bare name.
        let item3 = defs.iter().find(|d| d.name == "ItemType").unwrap();
        assert_eq!(item3.lines[0].ident, "c");
        let item2 = defs.iter().find(|d| d.name == "ItemType2").unwrap();
        assert_eq!(item2.lines[0].ident, "b");
        let item1 = defs.iter().find(|d| d.name == "ItemType3").unwrap();
        assert_eq!(item1.lines[0].ident, "a");
    }

    #[test]
    fn reserved_prefix_key_carries_alias() {
        let v = json!({"_id": "abc"});
        let defs = infer(&v);
        let root = &defs[0];
        let id = line(root, "id");
        assert_eq!(id.type_name, "string");
        assert_eq!(id.alias.as_deref(), Some("_id"));
    }

    #[test]
    fn union_order_is_independent_of_element_order() {
        let a = json!({"k": ["s", {"a": 1}, {"b": 2}]});
        let b = json!({"k": [{"b": 2}, "s", {"a": 1}]});
        let ka = line(infer(&a).last().unwrap(), "k").type_name;
        let kb = line(infer(&b).last().unwrap(), "k").type_name;
        assert_eq!(ka, "list<KType | KType2 | string>");
        assert_eq!(kb, "list<KType | KType2 | string>");
    }

    #[test]
    fn declined_merge_keeps_separate_types() {
        let v = json!({"d": [{"da": 1}, {"db": 2}]});
        let defs = infer_value(&v, "data", &mut |_| false).unwrap();
        assert_eq!(names(&defs), vec!["DType", "DType2", "DataType"]);
        assert_eq!(line(&defs[2], "d").type_name, "list<DType | DType2>");
    }

    #[test]
    fn accepted_merge_concatenates_under_base_name() {
        let v = json!({"d": [{"da": 1}, {"db": 2}]});
        let mut asked = 0usize;
        let defs = infer_value(&v, "data", &mut |candidates| {
            asked += 1;
            assert_eq!(candidates.len(), 2);
            true
        })
        .unwrap();
        assert_eq!(asked, 1);
        assert_eq!(names(&defs), vec!["DType", "DataType"]);

        let d = &defs[0];
        assert_eq!(line(d, "da").type_name, "integer");
        assert_eq!(line(d, "db").type_name, "integer");
        // The absorbed sibling is now a pure reference to the base.
        assert_eq!(line(&defs[1], "d").type_name, "list<DType>");
    }

    #[test]
    fn merge_is_offered_for_first_group_only() {
        // Two divergent groups at the same depth; only the first is offered.
        let v = json!({
            "d": [{"da": 1}, {"db": 2}],
            "e": [{"ea": 1}, {"eb": 2}]
        });
        let mut asked = 0usize;
        let defs = infer_value(&v, "data", &mut |_| {
            asked += 1;
            true
        })
        .unwrap();
        assert_eq!(asked, 1);
        assert!(names(&defs).contains(&"EType"));
        assert!(names(&defs).contains(&"EType2"));
    }

    #[test]
    fn same_input_and_answers_give_identical_output() {
        let v = json!({
            "a": "x",
            "b": [{"ba": 1, "bb": 2}, {"bc": 1, "bd": 2}, "s"],
            "c": {"ca": "y", "cb": ["z"]},
            "_meta": {"v": 1}
        });
        let first = infer(&v);
        let second = infer(&v);
        assert_eq!(first, second);
    }

    #[test]
    fn top_level_scalar_emits_nothing() {
        assert!(infer(&json!("just a string")).is_empty());
        assert!(infer(&json!(42)).is_empty());
        assert!(infer(&json!(null)).is_empty());
    }

    #[test]
    fn root_array_emits_element_types_only() {
        let v = json!([{"a": 1}, {"a": 1}]);
        let defs = infer(&v);
        assert_eq!(names(&defs), vec!["DataType"]);
        assert_eq!(defs[0].lines[0].ident, "a");
    }

    #[test]
    fn empty_object_and_list_edge_cases() {
        let v = json!({"e": {}, "xs": []});
        let defs = infer(&v);
        let root = defs.last().unwrap();
        assert_eq!(line(root, "e").type_name, "EType");
        assert_eq!(line(root, "xs").type_name, "list");
        let e = defs.iter().find(|d| d.name == "EType").unwrap();
        assert!(e.lines.is_empty());
    }

    #[test]
    fn null_and_float_leaves_keep_literal_kinds() {
        let v = json!({"n": null, "f": 1.5, "i": 3, "b": true});
        let defs = infer(&v);
        let root = &defs[0];
        assert_eq!(line(root, "n").type_name, "null");
        assert_eq!(line(root, "f").type_name, "float");
        assert_eq!(line(root, "i").type_name, "integer");
        assert_eq!(line(root, "b").type_name, "boolean");
    }
}
