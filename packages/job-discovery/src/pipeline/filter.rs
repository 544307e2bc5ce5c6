//! Pure, order-preserving stub filters.

use std::collections::{HashMap, HashSet};

use crate::types::config::DuplicatePolicy;
use crate::types::item::ItemStub;

/// Drop stubs whose id is in `skip_ids`.
pub fn skip_listed(stubs: Vec<ItemStub>, skip_ids: &HashSet<String>) -> Vec<ItemStub> {
    if skip_ids.is_empty() {
        return stubs;
    }
    stubs
        .into_iter()
        .filter(|stub| !skip_ids.contains(&stub.id))
        .collect()
}

/// Drop stubs whose name contains any banned word, ignoring case.
///
/// Blank entries are ignored; an empty substring would match every name.
pub fn without_banned_words(stubs: Vec<ItemStub>, banned_words: &[String]) -> Vec<ItemStub> {
    let banned: Vec<String> = banned_words
        .iter()
        .map(|word| word.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect();

    if banned.is_empty() {
        return stubs;
    }

    stubs
        .into_iter()
        .filter(|stub| {
            let name = stub.name.to_lowercase();
            !banned.iter().any(|word| name.contains(word.as_str()))
        })
        .collect()
}

/// Collapse repeated ids according to `policy`.
pub fn dedupe(stubs: Vec<ItemStub>, policy: DuplicatePolicy) -> Vec<ItemStub> {
    match policy {
        DuplicatePolicy::KeepAll => stubs,
        DuplicatePolicy::LastSeenWins => {
            let mut position: HashMap<String, usize> = HashMap::with_capacity(stubs.len());
            let mut kept: Vec<ItemStub> = Vec::with_capacity(stubs.len());

            for stub in stubs {
                match position.get(&stub.id) {
                    Some(&at) => kept[at].name = stub.name,
                    None => {
                        position.insert(stub.id.clone(), kept.len());
                        kept.push(stub);
                    }
                }
            }
            kept
        }
    }
}
