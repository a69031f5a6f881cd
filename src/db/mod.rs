mod memory;
mod postgres;

pub use memory::{distance_meters, MemoryStore};
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo_types::Geometry;
use uuid::Uuid;

use crate::entities::{Category, MembershipEdit, Page, PageRequest, Place, PlaceGroup};
use crate::error::Error;

/// Distance a candidate place must be within to match a spatial query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Threshold {
    /// One caller-supplied radius applied to every candidate.
    SearchRadius(f64),
    /// Each candidate's own `visit_radius_meters`.
    VisitRadius,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpatialQuery {
    /// WGS84, (lon, lat).
    pub geometry: Geometry<f64>,
    pub threshold: Threshold,
    pub category: Option<Category>,
}

impl SpatialQuery {
    pub fn threshold_meters(&self, place: &Place) -> f64 {
        match self.threshold {
            Threshold::SearchRadius(search_radius_meters) => search_radius_meters,
            Threshold::VisitRadius => place.visit_radius_meters as f64,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MembershipOutcome {
    Updated(PlaceGroup),
    GroupNotFound,
    PlaceNotFound,
}

/// Backing store for places, groups and their memberships.
///
/// Every read filters out soft-deleted rows, membership listings included.
/// Writes are atomic: a membership edit and the timestamps it bumps land in
/// one transaction.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_place(&self, place: &Place) -> Result<(), Error>;
    async fn fetch_place(&self, id: Uuid) -> Result<Option<Place>, Error>;
    async fn list_places(
        &self,
        category: Option<Category>,
        page: &PageRequest,
    ) -> Result<Page<Place>, Error>;
    /// Returns `false` when no live place has this id.
    async fn delete_place(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, Error>;

    async fn insert_group(&self, group: &PlaceGroup) -> Result<(), Error>;
    async fn fetch_group(&self, id: Uuid) -> Result<Option<PlaceGroup>, Error>;
    async fn list_groups(&self, page: &PageRequest) -> Result<Page<PlaceGroup>, Error>;
    /// Returns `false` when no live group has this id.
    async fn delete_group(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, Error>;

    /// Live places within `query.threshold` of `query.geometry`, each at
    /// most once, ordered by creation time then id.
    async fn search_places(
        &self,
        query: &SpatialQuery,
        page: &PageRequest,
    ) -> Result<Page<Place>, Error>;

    async fn update_membership(
        &self,
        group_id: Uuid,
        place_id: Uuid,
        edit: MembershipEdit,
        at: DateTime<Utc>,
    ) -> Result<MembershipOutcome, Error>;
}
