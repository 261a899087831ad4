//! Keyed comparison of two declaration trees.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::differ::changes::{DeclarationDiff, DiffKind};
use crate::types::{DeclId, DeclKind, DeclarationTree};

type Identity<'a> = (DeclKind, &'a str);

/// Diff the top-level declarations of two snapshots.
///
/// Declarations are matched by (kind, name) at every level. Duplicate identities
/// pair up in source order and the surplus is reported as added or removed.
/// Removed entries come first in old order, then the remaining entries in new order.
pub fn diff_trees(old: &DeclarationTree, new: &DeclarationTree) -> Vec<DeclarationDiff> {
    diff_level(old, old.roots(), new, new.roots())
}

fn diff_level(
    old: &DeclarationTree,
    old_ids: &[DeclId],
    new: &DeclarationTree,
    new_ids: &[DeclId],
) -> Vec<DeclarationDiff> {
    let mut by_identity: HashMap<Identity, VecDeque<DeclId>> = HashMap::new();
    for &id in old_ids {
        let decl = old.get(id);
        by_identity
            .entry((decl.kind, decl.name.as_str()))
            .or_default()
            .push_back(id);
    }

    let pairs: Vec<(DeclId, Option<DeclId>)> = new_ids
        .iter()
        .map(|&new_id| {
            let decl = new.get(new_id);
            let matched = by_identity
                .get_mut(&(decl.kind, decl.name.as_str()))
                .and_then(|queue| queue.pop_front());
            (new_id, matched)
        })
        .collect();

    let matched_old: HashSet<DeclId> = pairs.iter().filter_map(|(_, old_id)| *old_id).collect();

    let mut diffs: Vec<DeclarationDiff> = old_ids
        .iter()
        .filter(|id| !matched_old.contains(id))
        .map(|&id| whole(old, id, DiffKind::Removed))
        .collect();

    for (new_id, old_id) in pairs {
        match old_id {
            None => diffs.push(whole(new, new_id, DiffKind::Added)),
            Some(old_id) => {
                let diff = compare(old, old_id, new, new_id);
                if diff.has_change() {
                    diffs.push(diff);
                }
            }
        }
    }

    diffs
}

fn compare(
    old: &DeclarationTree,
    old_id: DeclId,
    new: &DeclarationTree,
    new_id: DeclId,
) -> DeclarationDiff {
    let before = old.get(old_id);
    let after = new.get(new_id);

    let change = if before.signature != after.signature {
        DiffKind::ModifiedSignature
    } else if before.body_hash != after.body_hash {
        DiffKind::ModifiedBody
    } else {
        DiffKind::Unchanged
    };

    let nested = if after.kind.is_container() {
        diff_level(old, &before.members, new, &after.members)
    } else {
        Vec::new()
    };

    DeclarationDiff::new(after.kind, after.name.clone(), change).with_nested(nested)
}

/// An added or removed declaration, carrying all of its members with the same change.
fn whole(tree: &DeclarationTree, id: DeclId, change: DiffKind) -> DeclarationDiff {
    let decl = tree.get(id);
    let nested = decl
        .members
        .iter()
        .map(|&member| whole(tree, member, change))
        .collect();
    DeclarationDiff::new(decl.kind, decl.name.clone(), change).with_nested(nested)
}
