use super::Engine;

use async_trait::async_trait;
use geo_types::Geometry;

use crate::{
    api::SearchAPI,
    db::{SpatialQuery, Threshold},
    entities::{Category, Page, PageRequest, Place},
    error::{invalid_radius_error, Error},
    geometry::{path_from, Coordinates},
};

#[async_trait]
impl SearchAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_near(
        &self,
        center: Coordinates,
        search_radius_meters: f64,
        category: Option<Category>,
        page: PageRequest,
    ) -> Result<Page<Place>, Error> {
        let center = center.to_point()?;

        // zero and negative radii are rejected alike
        if !(search_radius_meters.is_finite() && search_radius_meters > 0.0) {
            return Err(invalid_radius_error());
        }

        let query = SpatialQuery {
            geometry: Geometry::Point(center),
            threshold: Threshold::SearchRadius(search_radius_meters),
            category,
        };

        let places = self.store.search_places(&query, &page).await?;

        tracing::info!(total = places.total_elements, "found places near point");

        Ok(places)
    }

    #[tracing::instrument(skip(self, points))]
    async fn find_intersecting_track(
        &self,
        points: Vec<Coordinates>,
        category: Option<Category>,
        page: PageRequest,
    ) -> Result<Page<Place>, Error> {
        let track = path_from(&points)?;

        tracing::info!(%track, fixes = track.fix_count(), "searching places visited by track");

        let query = SpatialQuery {
            geometry: track.into_geometry(),
            threshold: Threshold::VisitRadius,
            category,
        };

        let places = self.store.search_places(&query, &page).await?;

        tracing::info!(total = places.total_elements, "found places along track");

        Ok(places)
    }
}

#[cfg(test)]
fn names(page: &Page<Place>) -> Vec<&str> {
    let mut names: Vec<&str> = page.content.iter().map(|p| p.name.as_str()).collect();
    names.sort();
    names
}

#[cfg(test)]
fn berlin_track() -> Vec<Coordinates> {
    vec![
        Coordinates::new(52.5200, 13.4050),
        Coordinates::new(52.5203, 13.4053),
        Coordinates::new(52.5206, 13.4056),
    ]
}

#[test]
fn find_near_returns_close_places_only() {
    use crate::api::PlaceAPI;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    block_on(engine.create_place(new_place("A", 52.5200, 13.4050, 100))).unwrap();
    block_on(engine.create_place(new_place("B", 48.8566, 2.3522, 100))).unwrap();

    let page = block_on(engine.find_near(
        Coordinates::new(52.5200, 13.4050),
        500.0,
        None,
        PageRequest::default(),
    ))
    .unwrap();

    assert_eq!(names(&page), vec!["A"]);
    assert_eq!(page.total_elements, 1);
}

#[test]
fn find_near_includes_boundary_distance() {
    use crate::api::PlaceAPI;
    use crate::db::distance_meters;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    let place = block_on(engine.create_place(new_place("Edge", 52.5250, 13.4100, 1))).unwrap();

    let center = Coordinates::new(52.5200, 13.4050);
    let exact = distance_meters(&Geometry::Point(center.to_point().unwrap()), place.location)
        .unwrap();

    let at_boundary =
        block_on(engine.find_near(center, exact, None, PageRequest::default())).unwrap();
    assert_eq!(names(&at_boundary), vec!["Edge"]);

    let too_short =
        block_on(engine.find_near(center, exact * 0.999, None, PageRequest::default())).unwrap();
    assert!(too_short.content.is_empty());
}

#[test]
fn find_near_ignores_visit_radius() {
    use crate::api::PlaceAPI;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    // ~1.1 km north of the center, with a visit radius far larger than that
    block_on(engine.create_place(new_place("Wide", 52.5300, 13.4050, 5_000))).unwrap();

    let page = block_on(engine.find_near(
        Coordinates::new(52.5200, 13.4050),
        500.0,
        None,
        PageRequest::default(),
    ))
    .unwrap();

    assert!(page.content.is_empty());
}

#[test]
fn find_near_rejects_bad_input() {
    use tokio_test::block_on;

    let engine = super::test_engine();
    let center = Coordinates::new(52.52, 13.405);

    for radius in [0.0, -10.0, f64::NAN] {
        let err = block_on(engine.find_near(center, radius, None, PageRequest::default()))
            .unwrap_err();
        assert_eq!(err.code, 103);
    }

    let err = block_on(engine.find_near(
        Coordinates::new(-91.0, 0.0),
        100.0,
        None,
        PageRequest::default(),
    ))
    .unwrap_err();
    assert_eq!(err.code, 102);
}

#[test]
fn find_near_filters_by_category() {
    use crate::api::PlaceAPI;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    let mut museum = new_place("Pergamon", 52.5212, 13.3969, 100);
    museum.category = Category::Museum;
    block_on(engine.create_place(museum)).unwrap();
    block_on(engine.create_place(new_place("Bode", 52.5219, 13.3947, 100))).unwrap();

    let center = Coordinates::new(52.5215, 13.3960);
    let museums = block_on(engine.find_near(
        center,
        1_000.0,
        Some(Category::Museum),
        PageRequest::default(),
    ))
    .unwrap();
    let everything =
        block_on(engine.find_near(center, 1_000.0, None, PageRequest::default())).unwrap();

    assert_eq!(names(&museums), vec!["Pergamon"]);
    assert_eq!(everything.total_elements, 2);
}

#[test]
fn find_near_paginates_matches() {
    use crate::api::PlaceAPI;
    use crate::entities::new_place;
    use std::collections::HashSet;
    use tokio_test::block_on;

    let engine = super::test_engine();
    for i in 0..5 {
        block_on(engine.create_place(new_place(&format!("near {i}"), 52.5200, 13.4050, 10)))
            .unwrap();
    }
    block_on(engine.create_place(new_place("far", 48.8566, 2.3522, 10))).unwrap();

    let center = Coordinates::new(52.5200, 13.4050);
    let mut seen = HashSet::new();
    for index in 0..3 {
        let page = block_on(engine.find_near(
            center,
            100.0,
            None,
            PageRequest::new(index, 2).unwrap(),
        ))
        .unwrap();

        assert_eq!(page.total_elements, 5);
        assert_eq!(page.number, index);
        for place in page.content {
            assert!(seen.insert(place.id));
        }
    }

    assert_eq!(seen.len(), 5);
}

#[test]
fn track_search_finds_places_on_track() {
    use crate::api::PlaceAPI;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    block_on(engine.create_place(new_place("OnTrack", 52.5202, 13.4052, 150))).unwrap();
    block_on(engine.create_place(new_place("OffTrack", 52.5300, 13.4200, 50))).unwrap();

    let page = block_on(engine.find_intersecting_track(
        berlin_track(),
        None,
        PageRequest::default(),
    ))
    .unwrap();

    assert_eq!(names(&page), vec!["OnTrack"]);
    assert_eq!(page.total_elements, 1);
}

#[test]
fn track_search_uses_each_places_visit_radius() {
    use crate::api::PlaceAPI;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    // both ~60 m past the end of the track
    block_on(engine.create_place(new_place("Generous", 52.5210, 13.4050, 100))).unwrap();
    block_on(engine.create_place(new_place("Strict", 52.5210, 13.4050, 30))).unwrap();

    let page = block_on(engine.find_intersecting_track(
        berlin_track(),
        None,
        PageRequest::default(),
    ))
    .unwrap();

    assert_eq!(names(&page), vec!["Generous"]);
}

#[test]
fn track_search_returns_each_place_once() {
    use crate::api::PlaceAPI;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    block_on(engine.create_place(new_place("Hub", 52.5203, 13.4053, 500))).unwrap();

    // out and back over the same segments
    let mut points = berlin_track();
    points.extend(berlin_track().into_iter().rev());

    let page = block_on(engine.find_intersecting_track(points, None, PageRequest::default()))
        .unwrap();

    assert_eq!(names(&page), vec!["Hub"]);
    assert_eq!(page.total_elements, 1);
}

#[test]
fn single_point_track_matches_point_geometry() {
    use crate::api::PlaceAPI;
    use crate::db::distance_meters;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    let fix = Coordinates::new(52.5200, 13.4050);
    let candidates = [
        ("Here", 52.5200, 13.4050, 5),
        ("Close", 52.5205, 13.4050, 100),
        ("Short", 52.5205, 13.4050, 20),
        ("Away", 52.5400, 13.4050, 100),
    ];

    let mut expected = vec![];
    for (name, lat, lon, radius) in candidates {
        let place = block_on(engine.create_place(new_place(name, lat, lon, radius))).unwrap();
        let distance =
            distance_meters(&Geometry::Point(fix.to_point().unwrap()), place.location).unwrap();
        if distance <= radius as f64 {
            expected.push(name);
        }
    }

    let page = block_on(engine.find_intersecting_track(vec![fix], None, PageRequest::default()))
        .unwrap();

    expected.sort();
    assert_eq!(names(&page), expected);
    assert_eq!(expected, vec!["Close", "Here"]);
}

#[test]
fn track_search_rejects_bad_tracks() {
    use tokio_test::block_on;

    let engine = super::test_engine();

    let err = block_on(engine.find_intersecting_track(vec![], None, PageRequest::default()))
        .unwrap_err();
    assert_eq!(err.code, 104);

    let err = block_on(engine.find_intersecting_track(
        vec![Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 181.0)],
        None,
        PageRequest::default(),
    ))
    .unwrap_err();
    assert_eq!(err.code, 102);
}

#[test]
fn deleted_places_are_not_searchable() {
    use crate::api::PlaceAPI;
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();
    let place = block_on(engine.create_place(new_place("Gone", 52.5202, 13.4052, 150))).unwrap();
    block_on(engine.delete_place(place.id)).unwrap();

    let near = block_on(engine.find_near(
        Coordinates::new(52.5202, 13.4052),
        1_000.0,
        None,
        PageRequest::default(),
    ))
    .unwrap();
    let along = block_on(engine.find_intersecting_track(
        berlin_track(),
        None,
        PageRequest::default(),
    ))
    .unwrap();

    assert!(near.content.is_empty());
    assert!(along.content.is_empty());
}
