use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Category, NewGroup, NewPlace, Page, PageRequest, Place, PlaceGroup};
use crate::error::Error;
use crate::geometry::Coordinates;

#[async_trait]
pub trait PlaceAPI {
    async fn create_place(&self, request: NewPlace) -> Result<Place, Error>;
    async fn find_place(&self, id: Uuid) -> Result<Place, Error>;
    async fn list_places(
        &self,
        category: Option<Category>,
        page: PageRequest,
    ) -> Result<Page<Place>, Error>;
    async fn delete_place(&self, id: Uuid) -> Result<(), Error>;
}

#[async_trait]
pub trait GroupAPI {
    async fn create_group(&self, request: NewGroup) -> Result<PlaceGroup, Error>;
    async fn find_group(&self, id: Uuid) -> Result<PlaceGroup, Error>;
    async fn list_groups(&self, page: PageRequest) -> Result<Page<PlaceGroup>, Error>;
    async fn delete_group(&self, id: Uuid) -> Result<(), Error>;
}

#[async_trait]
pub trait MembershipAPI {
    async fn add_place_to_group(&self, group_id: Uuid, place_id: Uuid)
        -> Result<PlaceGroup, Error>;
    async fn remove_place_from_group(
        &self,
        group_id: Uuid,
        place_id: Uuid,
    ) -> Result<PlaceGroup, Error>;
}

#[async_trait]
pub trait SearchAPI {
    /// Places within `search_radius_meters` of `center`.
    async fn find_near(
        &self,
        center: Coordinates,
        search_radius_meters: f64,
        category: Option<Category>,
        page: PageRequest,
    ) -> Result<Page<Place>, Error>;

    /// Places the track passes within their own visit radius.
    async fn find_intersecting_track(
        &self,
        points: Vec<Coordinates>,
        category: Option<Category>,
        page: PageRequest,
    ) -> Result<Page<Place>, Error>;
}

pub trait API: PlaceAPI + GroupAPI + MembershipAPI + SearchAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
