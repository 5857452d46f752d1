//! Coupling groups: pattern nodes that must resolve to one value.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::pattern::{PatRef, PatRefs};

/// Index of a coupling group within its [`Couplings`].
pub type GroupId = usize;

/// The coupling groups of one search and replace.
///
/// Groups are independent: a pattern in several groups must agree with
/// every one of them, so `A=B` and `B=C` with `A` and `C` bound to different
/// values can never both hold.
#[derive(Clone, Debug, Default)]
pub struct Couplings {
    groups: Vec<PatRefs>,
    by_member: HashMap<PatRef, SmallVec<[GroupId; 2]>>,
}

impl Couplings {
    pub fn new<G, I>(groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = PatRef>,
    {
        let mut couplings = Couplings::default();
        for group in groups {
            couplings.add(group);
        }
        couplings
    }

    /// Add a group.
    ///
    /// # Panics
    ///
    /// Panics if the group has fewer than two members.
    pub fn add(&mut self, members: impl IntoIterator<Item = PatRef>) -> GroupId {
        let mut group = PatRefs::new();
        for member in members {
            if !group.contains(&member) {
                group.push(member);
            }
        }
        assert!(
            group.len() >= 2,
            "coupling {group:?} needs at least two distinct members"
        );
        let id = self.groups.len();
        for &member in &group {
            self.by_member.entry(member).or_default().push(id);
        }
        self.groups.push(group);
        id
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn members(&self, group: GroupId) -> &[PatRef] {
        &self.groups[group]
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &[PatRef])> + '_ {
        self.groups.iter().enumerate().map(|(id, g)| (id, g.as_slice()))
    }

    /// Groups `pat` belongs to.
    pub fn groups_of(&self, pat: PatRef) -> &[GroupId] {
        match self.by_member.get(&pat) {
            Some(ids) => ids,
            None => &[],
        }
    }

    pub fn all_members(&self) -> impl Iterator<Item = PatRef> + '_ {
        self.groups.iter().flat_map(|g| g.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pat(n: u32) -> PatRef {
        PatRef::from_u32(n)
    }

    #[test]
    fn member_of_several_groups() {
        let couplings = Couplings::new([[pat(0), pat(1)], [pat(1), pat(2)]]);
        assert_eq!(couplings.len(), 2);
        assert_eq!(couplings.groups_of(pat(1)), &[0, 1]);
        assert_eq!(couplings.groups_of(pat(2)), &[1]);
        assert!(couplings.groups_of(pat(3)).is_empty());
    }

    #[test]
    #[should_panic(expected = "at least two distinct members")]
    fn degenerate_group() {
        Couplings::new([[pat(0), pat(0)]]);
    }
}
