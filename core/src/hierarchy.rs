//! C3 linearization of the agent type hierarchy.
//!
//! Agent types may declare several ordered base types. Type-level
//! attribute lookup walks a single most-specific-first order computed
//! here. The order is a pure function of the declared base lists, so the
//! catalog computes it once per type at load time and caches it.
//!
//! Rules enforced by the merge:
//!   - a type precedes all of its bases;
//!   - bases keep the order in which they were declared;
//!   - the result is monotonic: every base's own order is preserved.
//!
//! If no order satisfies all three the hierarchy is rejected.

use crate::error::{SimError, SimResult};
use std::collections::{HashMap, HashSet, VecDeque};

/// Linearize every type in `bases`. Returns type name → resolution order.
pub fn linearize_all(bases: &HashMap<String, Vec<String>>) -> SimResult<HashMap<String, Vec<String>>> {
    let mut linearizer = Linearizer::new(bases);
    let mut names: Vec<&String> = bases.keys().collect();
    names.sort();
    for name in names {
        linearizer.linearize(name)?;
    }
    Ok(linearizer.memo)
}

/// Linearize a single type.
pub fn linearize(name: &str, bases: &HashMap<String, Vec<String>>) -> SimResult<Vec<String>> {
    Linearizer::new(bases).linearize(name)
}

struct Linearizer<'a> {
    bases: &'a HashMap<String, Vec<String>>,
    memo: HashMap<String, Vec<String>>,
    visiting: HashSet<String>,
}

impl<'a> Linearizer<'a> {
    fn new(bases: &'a HashMap<String, Vec<String>>) -> Self {
        Self {
            bases,
            memo: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    fn linearize(&mut self, name: &str) -> SimResult<Vec<String>> {
        if let Some(order) = self.memo.get(name) {
            return Ok(order.clone());
        }
        let bases = self.bases;
        let direct = bases
            .get(name)
            .ok_or_else(|| SimError::UnknownAgentType {
                name: name.to_string(),
            })?;
        if !self.visiting.insert(name.to_string()) {
            return Err(SimError::InconsistentHierarchy {
                agent_type: name.to_string(),
                detail: "type inherits from itself".to_string(),
            });
        }

        let mut sequences: Vec<VecDeque<String>> = Vec::with_capacity(direct.len() + 1);
        for base in direct {
            sequences.push(self.linearize(base)?.into());
        }
        sequences.push(direct.iter().cloned().collect());

        let mut order = vec![name.to_string()];
        order.extend(merge(name, sequences)?);

        self.visiting.remove(name);
        self.memo.insert(name.to_string(), order.clone());
        Ok(order)
    }
}

/// The C3 merge: repeatedly take the first head that appears in no tail.
fn merge(name: &str, mut sequences: Vec<VecDeque<String>>) -> SimResult<Vec<String>> {
    let mut merged = Vec::new();
    loop {
        sequences.retain(|seq| !seq.is_empty());
        if sequences.is_empty() {
            return Ok(merged);
        }

        let candidate = sequences
            .iter()
            .filter_map(|seq| seq.front())
            .find(|head| {
                !sequences
                    .iter()
                    .any(|seq| seq.iter().skip(1).any(|item| item == *head))
            })
            .cloned();

        let Some(next) = candidate else {
            let heads: Vec<&str> = sequences
                .iter()
                .filter_map(|seq| seq.front().map(String::as_str))
                .collect();
            return Err(SimError::InconsistentHierarchy {
                agent_type: name.to_string(),
                detail: format!("cannot order bases {heads:?}"),
            });
        };

        for seq in sequences.iter_mut() {
            if seq.front() == Some(&next) {
                seq.pop_front();
            }
        }
        merged.push(next);
    }
}
