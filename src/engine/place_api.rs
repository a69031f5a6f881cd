use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::PlaceAPI,
    entities::{Category, NewPlace, Page, PageRequest, Place},
    error::{not_found_error, Error},
};

#[async_trait]
impl PlaceAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_place(&self, request: NewPlace) -> Result<Place, Error> {
        let place = Place::new(request)?;

        self.store.insert_place(&place).await?;

        tracing::info!(id = %place.id, "place created");

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    async fn find_place(&self, id: Uuid) -> Result<Place, Error> {
        self.store
            .fetch_place(id)
            .await?
            .ok_or_else(|| not_found_error("place", id))
    }

    #[tracing::instrument(skip(self))]
    async fn list_places(
        &self,
        category: Option<Category>,
        page: PageRequest,
    ) -> Result<Page<Place>, Error> {
        self.store.list_places(category, &page).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_place(&self, id: Uuid) -> Result<(), Error> {
        if !self.store.delete_place(id, Utc::now()).await? {
            return Err(not_found_error("place", id));
        }

        tracing::info!("place soft-deleted");

        Ok(())
    }
}

#[test]
fn create_then_find_place() {
    use crate::entities::new_place;
    use crate::geometry::Coordinates;
    use tokio_test::block_on;

    let engine = super::test_engine();

    let created = block_on(engine.create_place(new_place("Fernsehturm", 52.520815, 13.409419, 50)))
        .unwrap();
    let found = block_on(engine.find_place(created.id)).unwrap();

    assert_eq!(found.coordinates(), Coordinates::new(52.520815, 13.409419));
    assert_eq!(found.name, "Fernsehturm");
    assert_eq!(found.visit_radius_meters, 50);
    assert_eq!(found, created);
}

#[test]
fn create_place_rejects_invalid_requests() {
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();

    let err = block_on(engine.create_place(new_place("Nowhere", 95.0, 0.0, 10))).unwrap_err();
    assert_eq!(err.code, 102);

    let err = block_on(engine.create_place(new_place("Nowhere", 0.0, 0.0, 0))).unwrap_err();
    assert_eq!(err.code, 103);

    let page = block_on(engine.list_places(None, PageRequest::default())).unwrap();
    assert_eq!(page.total_elements, 0);
}

#[test]
fn find_unknown_place_is_not_found() {
    use tokio_test::block_on;

    let engine = super::test_engine();

    let err = block_on(engine.find_place(Uuid::new_v4())).unwrap_err();
    assert!(err.is_not_found_error());
}

#[test]
fn list_places_filters_by_category() {
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();

    let mut park = new_place("Tiergarten", 52.5145, 13.3501, 300);
    park.category = Category::Park;
    block_on(engine.create_place(park)).unwrap();
    block_on(engine.create_place(new_place("Reichstag", 52.5186, 13.3761, 80))).unwrap();

    let all = block_on(engine.list_places(None, PageRequest::default())).unwrap();
    let parks = block_on(engine.list_places(Some(Category::Park), PageRequest::default())).unwrap();
    let museums =
        block_on(engine.list_places(Some(Category::Museum), PageRequest::default())).unwrap();

    assert_eq!(all.total_elements, 2);
    assert_eq!(parks.total_elements, 1);
    assert_eq!(parks.content[0].name, "Tiergarten");
    assert!(museums.content.is_empty());
}

#[test]
fn list_places_pages_are_disjoint() {
    use crate::entities::new_place;
    use std::collections::HashSet;
    use tokio_test::block_on;

    let engine = super::test_engine();

    for i in 0..5 {
        block_on(engine.create_place(new_place(&format!("place {i}"), 10.0, 10.0, 10))).unwrap();
    }

    let mut seen = HashSet::new();
    for index in 0..3 {
        let page = block_on(engine.list_places(None, PageRequest::new(index, 2).unwrap())).unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages(), 3);
        for place in page.content {
            assert!(seen.insert(place.id));
        }
    }

    assert_eq!(seen.len(), 5);
}

#[test]
fn delete_place_hides_it_from_reads() {
    use crate::entities::new_place;
    use tokio_test::block_on;

    let engine = super::test_engine();

    let place = block_on(engine.create_place(new_place("Checkpoint Charlie", 52.5075, 13.3904, 40)))
        .unwrap();
    block_on(engine.delete_place(place.id)).unwrap();

    assert!(block_on(engine.find_place(place.id))
        .unwrap_err()
        .is_not_found_error());
    assert!(block_on(engine.list_places(None, PageRequest::default()))
        .unwrap()
        .content
        .is_empty());

    // the second delete resolves through the same lookup as reads
    assert!(block_on(engine.delete_place(place.id))
        .unwrap_err()
        .is_not_found_error());
}
