use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::{Closest, Distance, Haversine, HaversineClosestPoint};
use geo_types::{Geometry, Line, Point};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{MembershipOutcome, SpatialQuery, Store};
use crate::entities::{Category, MembershipEdit, Memberships, Page, PageRequest, Place, PlaceGroup};
use crate::error::{invalid_input_error, Error};

/// In-process store measuring distances on a sphere (haversine).
///
/// Place and group records are kept without their membership sets; those
/// are read from `Memberships` and filtered to live entities on the way out.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    places: HashMap<Uuid, Place>,
    groups: HashMap<Uuid, PlaceGroup>,
    memberships: Memberships,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn live_place(&self, id: Uuid) -> Option<Place> {
        let mut place = self.places.get(&id).filter(|p| p.is_live())?.clone();
        place.group_ids = self
            .memberships
            .groups_of(id)
            .filter(|g| self.groups.get(g).map_or(false, |g| g.is_live()))
            .collect();

        Some(place)
    }

    fn live_group(&self, id: Uuid) -> Option<PlaceGroup> {
        let mut group = self.groups.get(&id).filter(|g| g.is_live())?.clone();
        group.place_ids = self
            .memberships
            .places_of(id)
            .filter(|p| self.places.get(p).map_or(false, |p| p.is_live()))
            .collect();

        Some(group)
    }

    fn live_places_where<F>(&self, mut predicate: F) -> Vec<Place>
    where
        F: FnMut(&Place) -> bool,
    {
        let mut matches: Vec<Place> = self
            .places
            .values()
            .filter(|p| p.is_live() && predicate(p))
            .filter_map(|p| self.live_place(p.id))
            .collect();
        matches.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        matches
    }
}

/// Haversine distance in meters from `location` to the nearest point of
/// `geometry`.
pub fn distance_meters(geometry: &Geometry<f64>, location: Point<f64>) -> Option<f64> {
    match geometry {
        Geometry::Point(point) => Some(Haversine::distance(location, *point)),
        Geometry::LineString(line) => line
            .lines()
            .filter_map(|segment| segment_distance(segment, location))
            .reduce(f64::min),
        _ => None,
    }
}

fn segment_distance(segment: Line<f64>, location: Point<f64>) -> Option<f64> {
    // repeated fixes make zero-length segments
    if segment.start == segment.end {
        return Some(Haversine::distance(location, segment.start_point()));
    }

    match segment.haversine_closest_point(&location) {
        Closest::Intersection(closest) | Closest::SinglePoint(closest) => {
            Some(Haversine::distance(location, closest))
        }
        Closest::Indeterminate => None,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_place(&self, place: &Place) -> Result<(), Error> {
        let mut state = self.state.lock().await;

        if state.places.contains_key(&place.id) {
            return Err(invalid_input_error(format!("duplicate place id: {}", place.id)));
        }

        let mut place = place.clone();
        place.group_ids.clear();
        state.places.insert(place.id, place);

        Ok(())
    }

    async fn fetch_place(&self, id: Uuid) -> Result<Option<Place>, Error> {
        Ok(self.state.lock().await.live_place(id))
    }

    async fn list_places(
        &self,
        category: Option<Category>,
        page: &PageRequest,
    ) -> Result<Page<Place>, Error> {
        let state = self.state.lock().await;
        let matches = state.live_places_where(|p| category.map_or(true, |c| p.category == c));

        Ok(Page::from_ordered(matches, page))
    }

    async fn delete_place(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, Error> {
        let mut state = self.state.lock().await;

        match state.places.get_mut(&id).filter(|p| p.is_live()) {
            Some(place) => {
                place.mark_deleted(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_group(&self, group: &PlaceGroup) -> Result<(), Error> {
        let mut state = self.state.lock().await;

        if state.groups.contains_key(&group.id) {
            return Err(invalid_input_error(format!("duplicate group id: {}", group.id)));
        }

        let mut group = group.clone();
        group.place_ids.clear();
        state.groups.insert(group.id, group);

        Ok(())
    }

    async fn fetch_group(&self, id: Uuid) -> Result<Option<PlaceGroup>, Error> {
        Ok(self.state.lock().await.live_group(id))
    }

    async fn list_groups(&self, page: &PageRequest) -> Result<Page<PlaceGroup>, Error> {
        let state = self.state.lock().await;

        let mut groups: Vec<PlaceGroup> = state
            .groups
            .keys()
            .filter_map(|id| state.live_group(*id))
            .collect();
        groups.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        Ok(Page::from_ordered(groups, page))
    }

    async fn delete_group(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, Error> {
        let mut state = self.state.lock().await;

        match state.groups.get_mut(&id).filter(|g| g.is_live()) {
            Some(group) => {
                group.mark_deleted(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn search_places(
        &self,
        query: &SpatialQuery,
        page: &PageRequest,
    ) -> Result<Page<Place>, Error> {
        let state = self.state.lock().await;

        let matches = state.live_places_where(|place| {
            if query.category.map_or(false, |c| place.category != c) {
                return false;
            }

            distance_meters(&query.geometry, place.location)
                .map_or(false, |distance| distance <= query.threshold_meters(place))
        });

        Ok(Page::from_ordered(matches, page))
    }

    async fn update_membership(
        &self,
        group_id: Uuid,
        place_id: Uuid,
        edit: MembershipEdit,
        at: DateTime<Utc>,
    ) -> Result<MembershipOutcome, Error> {
        let mut state = self.state.lock().await;

        if state.live_group(group_id).is_none() {
            return Ok(MembershipOutcome::GroupNotFound);
        }

        if state.live_place(place_id).is_none() {
            return Ok(MembershipOutcome::PlaceNotFound);
        }

        let changed = state.memberships.apply(group_id, place_id, edit);
        debug_assert!(state.memberships.is_symmetric());

        if changed {
            if let Some(place) = state.places.get_mut(&place_id) {
                place.updated_at = at;
            }
            if let Some(group) = state.groups.get_mut(&group_id) {
                group.updated_at = at;
            }
        }

        match state.live_group(group_id) {
            Some(group) => Ok(MembershipOutcome::Updated(group)),
            None => Ok(MembershipOutcome::GroupNotFound),
        }
    }
}

#[test]
fn distance_to_point_and_line() {
    let berlin = Point::new(13.4050, 52.5200);
    let paris = Point::new(2.3522, 48.8566);

    let to_paris = distance_meters(&Geometry::Point(berlin), paris).unwrap();
    assert!((to_paris - 877_000.0).abs() < 5_000.0);

    let line = geo_types::LineString::from(vec![(13.4050, 52.5200), (13.4056, 52.5206)]);
    let on_line = distance_meters(&Geometry::LineString(line), Point::new(13.4053, 52.5203));
    assert!(on_line.unwrap() < 1.0);

    let stutter = geo_types::LineString::from(vec![(13.4050, 52.5200), (13.4050, 52.5200)]);
    let to_stutter =
        distance_meters(&Geometry::LineString(stutter), Point::new(13.4050, 52.5210)).unwrap();
    assert!((to_stutter - 111.2).abs() < 1.0);
}

#[test]
fn insert_strips_membership_sets() {
    use crate::entities::new_place;
    use tokio_test::block_on;

    let store = MemoryStore::new();
    let mut place = Place::new(new_place("a", 1.0, 1.0, 10)).unwrap();
    place.group_ids.insert(Uuid::new_v4());

    block_on(store.insert_place(&place)).unwrap();
    let stored = block_on(store.fetch_place(place.id)).unwrap().unwrap();

    assert!(stored.group_ids.is_empty());
    assert!(block_on(store.insert_place(&place)).is_err());
}

#[test]
fn membership_edits_keep_indexes_mirrored() {
    use crate::entities::{new_place, NewGroup};
    use tokio_test::block_on;

    let store = MemoryStore::new();
    let place = Place::new(new_place("Hackescher Markt", 52.5225, 13.4020, 50)).unwrap();
    let group = PlaceGroup::new(NewGroup {
        name: "Mitte".into(),
        description: None,
    })
    .unwrap();
    block_on(store.insert_place(&place)).unwrap();
    block_on(store.insert_group(&group)).unwrap();

    let at = Utc::now();
    let outcome =
        block_on(store.update_membership(group.id, place.id, MembershipEdit::Add, at)).unwrap();
    assert!(matches!(outcome, MembershipOutcome::Updated(ref g) if g.place_ids.contains(&place.id)));

    {
        let state = block_on(store.state.lock());
        assert!(state.memberships.is_symmetric());
        assert_eq!(state.places[&place.id].updated_at, at);
        assert_eq!(state.groups[&group.id].updated_at, at);
    }

    block_on(store.update_membership(group.id, place.id, MembershipEdit::Remove, Utc::now()))
        .unwrap();

    let state = block_on(store.state.lock());
    assert!(state.memberships.is_symmetric());
    assert_eq!(state.memberships.groups_of(place.id).count(), 0);
}
