use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipEdit {
    Add,
    Remove,
}

/// Place/group edges kept as two independent indexes.
///
/// Every write touches both maps, so `groups_of(p)` contains `g` exactly when
/// `places_of(g)` contains `p`.
#[derive(Clone, Debug, Default)]
pub struct Memberships {
    by_place: HashMap<Uuid, BTreeSet<Uuid>>,
    by_group: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl Memberships {
    /// Returns whether the edge set changed.
    pub fn apply(&mut self, group_id: Uuid, place_id: Uuid, edit: MembershipEdit) -> bool {
        match edit {
            MembershipEdit::Add => self.insert(group_id, place_id),
            MembershipEdit::Remove => self.remove(group_id, place_id),
        }
    }

    pub fn insert(&mut self, group_id: Uuid, place_id: Uuid) -> bool {
        let added = self.by_group.entry(group_id).or_default().insert(place_id);
        self.by_place.entry(place_id).or_default().insert(group_id);

        added
    }

    pub fn remove(&mut self, group_id: Uuid, place_id: Uuid) -> bool {
        let removed = remove_edge(&mut self.by_group, group_id, place_id);
        remove_edge(&mut self.by_place, place_id, group_id);

        removed
    }

    pub fn groups_of(&self, place_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.by_place.get(&place_id).into_iter().flatten().copied()
    }

    pub fn places_of(&self, group_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.by_group.get(&group_id).into_iter().flatten().copied()
    }

    /// Checks that both indexes hold the same edges.
    pub fn is_symmetric(&self) -> bool {
        let forward = self
            .by_group
            .iter()
            .all(|(g, places)| places.iter().all(|p| contains(&self.by_place, p, g)));
        let backward = self
            .by_place
            .iter()
            .all(|(p, groups)| groups.iter().all(|g| contains(&self.by_group, g, p)));

        forward && backward
    }
}

fn contains(index: &HashMap<Uuid, BTreeSet<Uuid>>, key: &Uuid, value: &Uuid) -> bool {
    index.get(key).map_or(false, |values| values.contains(value))
}

fn remove_edge(index: &mut HashMap<Uuid, BTreeSet<Uuid>>, key: Uuid, value: Uuid) -> bool {
    let Some(values) = index.get_mut(&key) else {
        return false;
    };

    let removed = values.remove(&value);
    if values.is_empty() {
        index.remove(&key);
    }

    removed
}

#[test]
fn edges_are_mirrored() {
    let (g1, g2, p1, p2) = (
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
    );
    let mut memberships = Memberships::default();

    assert!(memberships.apply(g1, p1, MembershipEdit::Add));
    assert!(!memberships.apply(g1, p1, MembershipEdit::Add));
    assert!(memberships.insert(g1, p2));
    assert!(memberships.insert(g2, p1));
    assert!(memberships.is_symmetric());

    assert_eq!(memberships.places_of(g1).count(), 2);
    assert_eq!(memberships.groups_of(p1).count(), 2);

    assert!(memberships.apply(g1, p1, MembershipEdit::Remove));
    assert!(!memberships.apply(g1, p1, MembershipEdit::Remove));
    assert!(!memberships.places_of(g1).any(|p| p == p1));
    assert_eq!(memberships.groups_of(p1).collect::<Vec<_>>(), vec![g2]);
    assert!(memberships.is_symmetric());
}

#[test]
fn removing_unknown_edge_is_noop() {
    let mut memberships = Memberships::default();

    assert!(!memberships.remove(Uuid::new_v4(), Uuid::new_v4()));
    assert!(memberships.is_symmetric());
}
