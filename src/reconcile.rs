//
// src/reconcile.rs
//
// Merging freshly queried item status with the user's selection.
//
// Every refresh produces a new list of items. The selection map remembers,
// per path, whether the item takes part in the operation. Paths seen before
// keep whatever the user made of them; new paths get a default from the
// activation policy. Entries for paths that disappear are kept, so that a
// file that comes back is selected the way it was.
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use crate::vcs::{Item, ItemStatus};
use crate::error;

use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};


/// Per-path "included in the operation" flags
pub type SelectionMap = HashMap<String, bool>;

/// How a path that was never seen before is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    /// seed paths and everything under version control
    Commit,
    /// seed paths and versioned items that still exist on disk
    Diff
}

impl ActivationPolicy {
    pub fn default_activation(self, item: &Item, seeds: &HashSet<String>) -> bool {
        let seeded = seeds.contains(&item.path);

        match self {
            ActivationPolicy::Commit => seeded || item.is_versioned,
            ActivationPolicy::Diff   => {
                seeded || (item.is_versioned && item.content_status != ItemStatus::Missing)
            }
        }
    }
}

/// A visible line of the file table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub included        : bool,
    pub path            : String,
    pub extension       : String,
    pub content_status  : ItemStatus,
    pub metadata_status : ItemStatus
}

impl Row {
    fn new(item: &Item, included: bool) -> Self {
        use crate::util::file_extension;

        Row {
            included,
            path            : item.path.clone(),
            extension       : file_extension(&item.path),
            content_status  : item.content_status,
            metadata_status : item.metadata_status
        }
    }

    /// The item this row was built from
    pub fn to_item(&self) -> Item {
        Item::new(self.path.clone(), self.content_status, self.metadata_status)
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub rows        : Vec<Row>,
    /// number of versioned items, visible or not
    pub versioned   : usize,
    /// number of unversioned items, visible or not
    pub unversioned : usize
}

impl Reconciliation {
    pub fn summary(&self) -> String {
        format!(
            "Found {} changed and {} unversioned item(s)",
            self.versioned,
            self.unversioned
        )
    }

    /// Paths of the visible rows that are checked, in row order
    pub fn included_paths(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().filter(|row| row.included).map(|row| row.path.as_str())
    }
}


/// Reconcile `items` against the selection
///
/// Items are processed in order and rows keep that order. Unknown paths are
/// added to `selection` using `policy`; known paths keep their flag. Hidden
/// unversioned items still count and still get a selection entry.
///
/// An item without a path fails the whole call with `InvalidItem`, before
/// `selection` is modified.
pub fn reconcile(
    items: &[Item],
    selection: &mut SelectionMap,
    seeds: &HashSet<String>,
    show_unversioned: bool,
    policy: ActivationPolicy
) -> Result<Reconciliation> {
    if let Some(index) = items.iter().position(|item| item.path.is_empty()) {
        bail!(error::InvalidItem { index, reason: "missing path".to_owned() });
    }

    let mut result = Reconciliation::default();

    for item in items {
        let included = *selection
            .entry(item.path.clone())
            .or_insert_with(|| policy.default_activation(item, seeds));

        if item.is_versioned {
            result.versioned += 1;
        } else {
            result.unversioned += 1;
        }

        if !show_unversioned && !item.is_versioned {
            continue;
        }

        result.rows.push(Row::new(item, included));
    }

    Ok( result )
}


#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, status: ItemStatus) -> Item {
        Item::new(path, status, ItemStatus::None)
    }

    fn seeds(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|path| path.to_string()).collect()
    }

    fn sample() -> Vec<Item> {
        vec![
            item("a.txt", ItemStatus::Modified),
            item("b.txt", ItemStatus::Unversioned)
        ]
    }

    #[test]
    fn test_first_refresh_hides_unversioned() {
        let mut selection = SelectionMap::new();

        let result = reconcile(
            &sample(), &mut selection, &seeds(&["a.txt"]), false, ActivationPolicy::Commit
        ).unwrap();

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].path, "a.txt");
        assert_eq!(result.rows[0].extension, ".txt");
        assert!(result.rows[0].included);
        assert_eq!((result.versioned, result.unversioned), (1, 1));

        let expected: SelectionMap = vec![("a.txt".to_owned(), true), ("b.txt".to_owned(), false)]
            .into_iter().collect();
        assert_eq!(selection, expected);
    }

    #[test]
    fn test_toggle_survives_visibility_change() {
        let mut selection = SelectionMap::new();
        let seeds = seeds(&["a.txt"]);

        reconcile(&sample(), &mut selection, &seeds, false, ActivationPolicy::Commit).unwrap();
        selection.insert("b.txt".to_owned(), true);

        let result = reconcile(&sample(), &mut selection, &seeds, true, ActivationPolicy::Commit).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[1].path, "b.txt");
        assert!(result.rows[1].included);
    }

    #[test]
    fn test_idempotent() {
        let mut selection = SelectionMap::new();
        let seeds = seeds(&[]);

        let first = reconcile(&sample(), &mut selection, &seeds, true, ActivationPolicy::Commit).unwrap();
        let snapshot = selection.clone();
        let second = reconcile(&sample(), &mut selection, &seeds, true, ActivationPolicy::Commit).unwrap();

        assert_eq!(first, second);
        assert_eq!(snapshot, selection);
    }

    #[test]
    fn test_known_paths_keep_their_flag() {
        let mut selection = SelectionMap::new();
        selection.insert("a.txt".to_owned(), false);
        selection.insert("b.txt".to_owned(), true);

        // a.txt is versioned and seeded, b.txt is unversioned: neither matters
        let result = reconcile(
            &sample(), &mut selection, &seeds(&["a.txt"]), true, ActivationPolicy::Commit
        ).unwrap();

        assert_eq!(
            result.rows.iter().map(|row| row.included).collect::<Vec<_>>(),
            vec![false, true]
        );
    }

    #[test]
    fn test_seeded_unversioned_path_is_included() {
        let mut selection = SelectionMap::new();
        let items = vec![item("new.rs", ItemStatus::Unversioned)];

        let result = reconcile(
            &items, &mut selection, &seeds(&["new.rs"]), true, ActivationPolicy::Commit
        ).unwrap();

        assert!(result.rows[0].included);
        assert_eq!(result.rows[0].extension, ".rs");
    }

    #[test]
    fn test_visibility_leaves_selection_alone() {
        let items = sample();
        let seeds = seeds(&[]);

        let mut hidden = SelectionMap::new();
        let mut shown = SelectionMap::new();

        let hidden_result = reconcile(&items, &mut hidden, &seeds, false, ActivationPolicy::Commit).unwrap();
        let shown_result = reconcile(&items, &mut shown, &seeds, true, ActivationPolicy::Commit).unwrap();

        assert_eq!(hidden, shown);
        assert_eq!(hidden_result.rows.len(), 1);
        assert_eq!(shown_result.rows.len(), 2);
    }

    #[test]
    fn test_counters_cover_every_item() {
        let items = vec![
            item("a", ItemStatus::Modified),
            item("b", ItemStatus::Unversioned),
            item("c", ItemStatus::Added),
            item("d", ItemStatus::Unversioned),
            item("e", ItemStatus::Missing)
        ];

        for &show in &[true, false] {
            let result = reconcile(
                &items, &mut SelectionMap::new(), &seeds(&[]), show, ActivationPolicy::Commit
            ).unwrap();

            assert_eq!(result.versioned + result.unversioned, items.len());
            assert_eq!(result.summary(), "Found 3 changed and 2 unversioned item(s)");
        }
    }

    #[test]
    fn test_stale_entries_are_kept() {
        let mut selection = SelectionMap::new();
        let seeds = seeds(&[]);

        reconcile(&sample(), &mut selection, &seeds, true, ActivationPolicy::Commit).unwrap();
        selection.insert("a.txt".to_owned(), false);

        let result = reconcile(&sample()[1..], &mut selection, &seeds, true, ActivationPolicy::Commit).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(selection.get("a.txt"), Some(&false));

        // the file comes back with the flag the user left it with
        let result = reconcile(&sample(), &mut selection, &seeds, true, ActivationPolicy::Commit).unwrap();
        assert!(!result.rows[0].included);
    }

    #[test]
    fn test_diff_policy_skips_missing() {
        let items = vec![
            item("kept.c", ItemStatus::Modified),
            item("lost.c", ItemStatus::Missing),
            item("lost_seed.c", ItemStatus::Missing)
        ];

        let result = reconcile(
            &items, &mut SelectionMap::new(), &seeds(&["lost_seed.c"]), true, ActivationPolicy::Diff
        ).unwrap();

        assert_eq!(
            result.rows.iter().map(|row| row.included).collect::<Vec<_>>(),
            vec![true, false, true]
        );
    }

    #[test]
    fn test_missing_path_is_rejected_atomically() {
        let mut selection = SelectionMap::new();
        let items = vec![item("a.txt", ItemStatus::Modified), item("", ItemStatus::Added)];

        let err = reconcile(&items, &mut selection, &seeds(&[]), true, ActivationPolicy::Commit)
            .unwrap_err();

        let invalid = err.downcast_ref::<error::InvalidItem>().expect("InvalidItem");
        assert_eq!(invalid.index, 1);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_included_paths_follow_rows() {
        let mut selection = SelectionMap::new();
        selection.insert("b.txt".to_owned(), true);

        let result = reconcile(
            &sample(), &mut selection, &seeds(&[]), false, ActivationPolicy::Commit
        ).unwrap();

        // b.txt is checked but hidden
        assert_eq!(result.included_paths().collect::<Vec<_>>(), vec!["a.txt"]);
    }
}
