//
// src/vcs/item.rs
//
// Working copy items and their status, as reported by a backend
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use std::fmt;

/// Status of a working copy item along one axis (content or metadata)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, smart_default::SmartDefault)]
pub enum ItemStatus {
    #[default]
    None,
    Normal,
    Added,
    Modified,
    Deleted,
    Missing,
    Unversioned,
    Ignored,
    Replaced,
    Conflicted,
    Obstructed,
    External,
    Incomplete
}

/// Statuses that make an item a candidate for a commit
pub const STATUSES_FOR_COMMIT: &[ItemStatus] = &[
    ItemStatus::Added,
    ItemStatus::Deleted,
    ItemStatus::Replaced,
    ItemStatus::Modified,
    ItemStatus::Missing,
    ItemStatus::Unversioned,
    ItemStatus::Obstructed
];

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::None        => "none",
            ItemStatus::Normal      => "normal",
            ItemStatus::Added       => "added",
            ItemStatus::Modified    => "modified",
            ItemStatus::Deleted     => "deleted",
            ItemStatus::Missing     => "missing",
            ItemStatus::Unversioned => "unversioned",
            ItemStatus::Ignored     => "ignored",
            ItemStatus::Replaced    => "replaced",
            ItemStatus::Conflicted  => "conflicted",
            ItemStatus::Obstructed  => "obstructed",
            ItemStatus::External    => "external",
            ItemStatus::Incomplete  => "incomplete",
        }
    }

    /// Whether an item whose content has this status is under version control
    pub fn is_versioned(self) -> bool {
        !matches!(self, ItemStatus::Unversioned | ItemStatus::Ignored | ItemStatus::None)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}


/// A single filesystem entry with its VCS status
///
/// `path` is absolute and unique within one status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub path            : String,
    pub is_versioned    : bool,
    pub content_status  : ItemStatus,
    pub metadata_status : ItemStatus
}

impl Item {
    pub fn new<S: Into<String>>(path: S, content_status: ItemStatus, metadata_status: ItemStatus) -> Self {
        Item {
            path : path.into(),
            is_versioned : content_status.is_versioned(),
            content_status,
            metadata_status
        }
    }

    /// Whether either status axis is in the filter
    pub fn matches(&self, filter: &[ItemStatus]) -> bool {
        filter.contains(&self.content_status) || filter.contains(&self.metadata_status)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_classification() {
        assert!(Item::new("/wc/a", ItemStatus::Modified, ItemStatus::None).is_versioned);
        assert!(Item::new("/wc/a", ItemStatus::Missing, ItemStatus::None).is_versioned);
        assert!(!Item::new("/wc/b", ItemStatus::Unversioned, ItemStatus::None).is_versioned);
        assert!(!Item::new("/wc/c", ItemStatus::Ignored, ItemStatus::None).is_versioned);
    }

    #[test]
    fn test_filter_matches_either_axis() {
        let props_only = Item::new("/wc/dir", ItemStatus::Normal, ItemStatus::Modified);
        let ignored    = Item::new("/wc/x.o", ItemStatus::Ignored, ItemStatus::None);

        assert!(props_only.matches(STATUSES_FOR_COMMIT));
        assert!(!ignored.matches(STATUSES_FOR_COMMIT));
    }

    #[test]
    fn test_status_display_pads() {
        assert_eq!(format!("{:<10}|", ItemStatus::Added), "added     |");
    }
}
