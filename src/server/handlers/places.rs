use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::{Category, NewPlace, PageRequest, DEFAULT_PAGE_SIZE};
use crate::error::Error;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::geometry::Coordinates;
use crate::server::responses::{PageResponse, PlaceResponse};

pub(super) fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Serialize, Deserialize)]
pub struct ListParams {
    category: Option<Category>,
    #[serde(default)]
    page: u32,
    #[serde(default = "default_size")]
    size: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearParams {
    lat: f64,
    lon: f64,
    radius_meters: f64,
    category: Option<Category>,
    #[serde(default)]
    page: u32,
    #[serde(default = "default_size")]
    size: u32,
}

#[derive(Serialize, Deserialize)]
pub struct TrackParams {
    points: Vec<Coordinates>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    ApiJson(params): ApiJson<NewPlace>,
) -> Result<(StatusCode, Json<PlaceResponse>), Error> {
    let place = api.create_place(params).await?;

    Ok((StatusCode::CREATED, Json(place.into())))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PlaceResponse>, Error> {
    let place = api.find_place(id).await?;

    Ok(Json(place.into()))
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<PageResponse<PlaceResponse>>, Error> {
    let page = PageRequest::new(params.page, params.size)?;
    let places = api.list_places(params.category, page).await?;

    Ok(Json(places.into()))
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, Error> {
    api.delete_place(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn near(
    Extension(api): Extension<DynAPI>,
    ApiQuery(params): ApiQuery<NearParams>,
) -> Result<Json<PageResponse<PlaceResponse>>, Error> {
    let page = PageRequest::new(params.page, params.size)?;
    let places = api
        .find_near(
            Coordinates::new(params.lat, params.lon),
            params.radius_meters,
            params.category,
            page,
        )
        .await?;

    Ok(Json(places.into()))
}

pub async fn intersections(
    Extension(api): Extension<DynAPI>,
    ApiQuery(params): ApiQuery<ListParams>,
    ApiJson(track): ApiJson<TrackParams>,
) -> Result<Json<PageResponse<PlaceResponse>>, Error> {
    let page = PageRequest::new(params.page, params.size)?;
    let places = api
        .find_intersecting_track(track.points, params.category, page)
        .await?;

    Ok(Json(places.into()))
}

#[test]
fn near_handler_maps_page() {
    use crate::db::MemoryStore;
    use crate::engine::Engine;
    use std::sync::Arc;
    use tokio_test::block_on;

    let api = Arc::new(Engine::new(MemoryStore::new())) as DynAPI;
    let place = NewPlace {
        name: "Alexanderplatz".into(),
        description: Some("Square".into()),
        category: Category::Landmark,
        latitude: 52.5219,
        longitude: 13.4132,
        visit_radius_meters: 75,
    };

    let (status, Json(created)) = block_on(create(Extension(api.clone()), ApiJson(place))).unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let params = NearParams {
        lat: 52.5219,
        lon: 13.4132,
        radius_meters: 10.0,
        category: None,
        page: 0,
        size: 20,
    };
    let Json(page) = block_on(near(Extension(api.clone()), ApiQuery(params))).unwrap();

    assert_eq!(page.total_elements, 1);
    assert_eq!(page.content[0].id, created.id);
    assert!(page.first && page.last && !page.empty);

    let status = block_on(delete(Extension(api.clone()), ApiPath(created.id))).unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let err = block_on(find(Extension(api), ApiPath(created.id))).unwrap_err();
    assert!(err.is_not_found_error());
}

#[test]
fn intersections_handler_rejects_empty_track() {
    use crate::db::MemoryStore;
    use crate::engine::Engine;
    use std::sync::Arc;
    use tokio_test::block_on;

    let api = Arc::new(Engine::new(MemoryStore::new())) as DynAPI;
    let params = ListParams {
        category: None,
        page: 0,
        size: 20,
    };

    let err = block_on(intersections(
        Extension(api),
        ApiQuery(params),
        ApiJson(TrackParams { points: vec![] }),
    ))
    .unwrap_err();

    assert_eq!(err.code, 104);
}

#[test]
fn track_params_accept_lat_lon_objects() {
    let params: TrackParams = serde_json::from_value(serde_json::json!({
        "points": [
            { "latitude": 52.5200, "longitude": 13.4050 },
            { "latitude": 52.5203, "longitude": 13.4053 }
        ]
    }))
    .unwrap();

    assert_eq!(params.points[1], Coordinates::new(52.5203, 13.4053));
}
