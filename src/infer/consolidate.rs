//! Merge offering for structurally divergent siblings.
//!
//! Nodes at one depth sharing both ancestry path and originating key are
//! instances of "the same field" seen with different shapes (typically dicts
//! in different positions of one array). Dedup already folded the identical
//! ones; this step offers, via the injected callback, to collapse the
//! remaining distinct shapes into a single definition.
//!
//! Known limitations, kept on purpose: only the first qualifying group per
//! level is offered (no fixpoint over all groups), and an accepted merge is a
//! literal concatenation of field lines, not a field union with optionals.

use indexmap::IndexMap;
use tracing::debug;

use super::{def, Definition, Inference, NodeId};

/// Grouping key for "the same field": ancestry path + originating key.
type ConsolidationKey = (Vec<String>, String);

impl Inference {
    /// Run the merge protocol once for one level. Every node in `bucket`
    /// must already be resolved.
    pub(super) fn consolidate_level(
        &mut self,
        bucket: &[NodeId],
        confirm: &mut dyn FnMut(&[Definition]) -> bool,
    ) {
        let mut groups: IndexMap<ConsolidationKey, Vec<NodeId>> = IndexMap::new();
        for &id in bucket {
            let node = &self.nodes[id];
            groups
                .entry((node.ancestry.clone(), node.key.clone()))
                .or_default()
                .push(id);
        }

        for (_, ids) in groups {
            // Pure references (deduplicated shapes) carry no definition text
            // and are not merge candidates.
            let candidates: Vec<NodeId> =
                ids.into_iter().filter(|&id| self.defs[id].is_some()).collect();
            if candidates.len() < 2 {
                continue;
            }

            let shown: Vec<Definition> = candidates
                .iter()
                .filter_map(|&id| self.defs[id].clone())
                .collect();
            if confirm(&shown) {
                self.merge(&candidates);
            } else {
                debug!(count = candidates.len(), "merge declined, keeping separate types");
            }
            // One merge opportunity per level.
            return;
        }
    }

    /// Concatenate all candidates' field lines under the first candidate's
    /// header. The others become pure references: their names point at the
    /// base and their signatures redirect future lookups there too.
    fn merge(&mut self, candidates: &[NodeId]) {
        let base_id = candidates[0];
        let Some(base_name) = self.names[base_id].clone() else {
            return;
        };

        let mut absorbed = Vec::new();
        for &id in &candidates[1..] {
            if let Some(definition) = self.defs[id].take() {
                self.signatures
                    .insert(def::signature(&definition.lines), base_name.clone());
                absorbed.extend(definition.lines);
                self.names[id] = Some(base_name.clone());
            }
        }
        if let Some(base) = self.defs[base_id].as_mut() {
            base.lines.extend(absorbed);
        }
        debug!(
            base = base_name.as_str(),
            absorbed = candidates.len() - 1,
            "merged divergent siblings"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::infer::infer_value;
    use serde_json::json;

    #[test]
    fn candidates_shown_in_discovery_order() {
        let v = json!({"d": [{"da": 1}, {"db": 2}]});
        let mut seen = Vec::new();
        infer_value(&v, "data", &mut |candidates| {
            seen = candidates.iter().map(|d| d.name.clone()).collect();
            false
        })
        .unwrap();
        assert_eq!(seen, vec!["DType", "DType2"]);
    }

    #[test]
    fn deduplicated_shapes_do_not_trigger_an_offer() {
        // Same structure in both positions: dedup handles it, no prompt.
        let v = json!({"d": [{"da": 1}, {"da": 5}]});
        let mut asked = false;
        let defs = infer_value(&v, "data", &mut |_| {
            asked = true;
            true
        })
        .unwrap();
        assert!(!asked);
        assert_eq!(defs.len(), 2); // DType + root
    }

    #[test]
    fn merged_signature_redirects_later_duplicates() {
        // After merging d's shapes, a structurally identical object under a
        // shallower key must resolve to the merged base name's registry
        // entries, not re-emit the absorbed shape.
        let v = json!({
            "d": [{"da": 1}, {"db": 2}],
            "late": {"db": 2}
        });
        let defs = infer_value(&v, "data", &mut |_| true).unwrap();
        let root = defs.last().unwrap();
        let late = root.lines.iter().find(|l| l.ident == "late").unwrap();
        assert_eq!(late.type_name, "DType");
    }
}
