//! Tree patching: merge a sorted batch of upserts and deletion markers into
//! an existing flat tree.
//!
//! The merge is a single lock-step walk over the base entries and the
//! update batch, so only the entry list is touched and the cost is
//! O(|base| + |updates|). Entry contents are never read.

use std::cmp::Ordering;

use aus_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Tree, TreeEntry};
use crate::traits::ObjectStore;

/// Sort an update batch into patch order and drop duplicate names, keeping
/// the last occurrence of each. Returns the number of entries dropped.
pub fn sort_updates(updates: &mut Vec<TreeEntry>) -> usize {
    updates.sort();
    let before = updates.len();
    let mut unique: Vec<TreeEntry> = Vec::with_capacity(before);
    for entry in updates.drain(..) {
        match unique.last_mut() {
            Some(last) if last.name == entry.name => *last = entry,
            _ => unique.push(entry),
        }
    }
    *updates = unique;
    before - updates.len()
}

fn check_sorted(updates: &[TreeEntry]) -> StoreResult<()> {
    if let Some(pair) = updates.windows(2).find(|w| w[0] >= w[1]) {
        return Err(StoreError::Precondition(format!(
            "tree updates must be sorted and unique by name: {:?} before {:?}",
            pair[0].name, pair[1].name
        )));
    }
    Ok(())
}

/// Merge `updates` into `base`.
///
/// - name only in base: kept.
/// - name only in updates: inserted, unless it is a deletion marker (no-op).
/// - name in both: the update wins; a deletion marker drops the entry.
///
/// `updates` must be strictly ascending by name (see [`sort_updates`]);
/// `base` is assumed canonical.
pub fn patch_entries(base: &[TreeEntry], updates: &[TreeEntry]) -> StoreResult<Vec<TreeEntry>> {
    check_sorted(updates)?;
    debug_assert!(base.windows(2).all(|w| w[0] < w[1]));

    let mut out = Vec::with_capacity(base.len() + updates.len());
    let (mut i, mut j) = (0, 0);
    while i < base.len() && j < updates.len() {
        let (old, new) = (&base[i], &updates[j]);
        match old.cmp(new) {
            Ordering::Less => {
                out.push(old.clone());
                i += 1;
            }
            Ordering::Greater => {
                if !new.mode.is_deleted() {
                    out.push(new.clone());
                }
                j += 1;
            }
            Ordering::Equal => {
                if !new.mode.is_deleted() {
                    out.push(new.clone());
                }
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&base[i..]);
    out.extend(updates[j..].iter().filter(|u| !u.mode.is_deleted()).cloned());
    Ok(out)
}

/// Applies update batches to trees and persists the result.
pub struct TreePatcher<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> TreePatcher<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Patch `base` with `updates`, store the resulting tree and return its
    /// id alongside it. Nothing is written when the precondition fails.
    pub fn patch(&self, base: &Tree, updates: &[TreeEntry]) -> StoreResult<(ObjectId, Tree)> {
        let tree = Tree {
            entries: patch_entries(&base.entries, updates)?,
        };
        let id = self.store.write(&tree.to_stored_object()?)?;
        tracing::debug!(
            tree = %id,
            base = base.len(),
            updates = updates.len(),
            result = tree.len(),
            "patched tree"
        );
        Ok((id, tree))
    }
}
