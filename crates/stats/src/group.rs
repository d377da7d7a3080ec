//! Dimension grouping.
//!
//! Every dimension of a normalized vector carries a [`GroupId`]. Dimensions
//! that share an id pool their samples into one running statistic; the
//! reserved [`GroupId::NONE`] opts a dimension out of normalization entirely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a normalization group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i32);

impl GroupId {
    /// Dimensions in this group are passed through unchanged (mean 0, std 1).
    pub const NONE: GroupId = GroupId(-1);

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl From<i32> for GroupId {
    fn from(id: i32) -> Self {
        GroupId(id)
    }
}

/// Resolved partition of `0..dimension` into pooled groups.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupLayout {
    group_of: Vec<GroupId>,
    pooled: Vec<Vec<usize>>,
    excluded: Vec<usize>,
}

impl GroupLayout {
    /// One group per dimension; nothing is shared.
    #[must_use]
    pub fn singletons(dimension: usize) -> Self {
        let ids = (0..dimension)
            .map(|i| GroupId(i32::try_from(i).unwrap_or(i32::MAX)))
            .collect();
        Self::from_ids(ids)
    }

    #[must_use]
    pub fn from_ids(group_of: Vec<GroupId>) -> Self {
        let mut by_id: BTreeMap<GroupId, Vec<usize>> = BTreeMap::new();
        let mut excluded = Vec::new();
        for (index, &id) in group_of.iter().enumerate() {
            if id.is_none() {
                excluded.push(index);
            } else {
                by_id.entry(id).or_default().push(index);
            }
        }
        Self {
            group_of,
            pooled: by_id.into_values().collect(),
            excluded,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.group_of.len()
    }

    #[must_use]
    pub fn group_of(&self) -> &[GroupId] {
        &self.group_of
    }

    /// Member indices of every pooled group, excluded dimensions omitted.
    pub fn groups(&self) -> impl Iterator<Item = &[usize]> {
        self.pooled.iter().map(Vec::as_slice)
    }

    #[must_use]
    pub fn excluded(&self) -> &[usize] {
        &self.excluded
    }

    #[must_use]
    pub fn is_excluded(&self, index: usize) -> bool {
        self.group_of.get(index).is_some_and(|id| id.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_share_nothing() {
        let layout = GroupLayout::singletons(3);
        let groups: Vec<&[usize]> = layout.groups().collect();
        assert_eq!(groups, vec![&[0][..], &[1][..], &[2][..]]);
        assert!(layout.excluded().is_empty());
    }

    #[test]
    fn shared_and_excluded_ids_partition_dimensions() {
        let layout = GroupLayout::from_ids(vec![
            GroupId(4),
            GroupId::NONE,
            GroupId(4),
            GroupId(1),
        ]);
        let groups: Vec<&[usize]> = layout.groups().collect();
        assert_eq!(groups, vec![&[3][..], &[0, 2][..]]);
        assert_eq!(layout.excluded(), &[1]);
        assert!(layout.is_excluded(1));
        assert!(!layout.is_excluded(0));
        assert!(!layout.is_excluded(7));
    }
}
