use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::places::default_size;
use crate::api::DynAPI;
use crate::entities::{NewGroup, PageRequest};
use crate::error::Error;
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::responses::{PageResponse, PlaceGroupResponse};

#[derive(Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    page: u32,
    #[serde(default = "default_size")]
    size: u32,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    ApiJson(params): ApiJson<NewGroup>,
) -> Result<(StatusCode, Json<PlaceGroupResponse>), Error> {
    let group = api.create_group(params).await?;

    Ok((StatusCode::CREATED, Json(group.into())))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PlaceGroupResponse>, Error> {
    let group = api.find_group(id).await?;

    Ok(Json(group.into()))
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<PageResponse<PlaceGroupResponse>>, Error> {
    let page = PageRequest::new(params.page, params.size)?;
    let groups = api.list_groups(page).await?;

    Ok(Json(groups.into()))
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, Error> {
    api.delete_group(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_place(
    Extension(api): Extension<DynAPI>,
    ApiPath((group_id, place_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<PlaceGroupResponse>, Error> {
    let group = api.add_place_to_group(group_id, place_id).await?;

    Ok(Json(group.into()))
}

pub async fn remove_place(
    Extension(api): Extension<DynAPI>,
    ApiPath((group_id, place_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<PlaceGroupResponse>, Error> {
    let group = api.remove_place_from_group(group_id, place_id).await?;

    Ok(Json(group.into()))
}

#[test]
fn membership_handlers_round_trip() {
    use crate::db::MemoryStore;
    use crate::engine::Engine;
    use crate::entities::new_place;
    use std::sync::Arc;
    use tokio_test::block_on;

    let api = Arc::new(Engine::new(MemoryStore::new())) as DynAPI;
    let place = block_on(api.create_place(new_place("Kreuzberg", 52.4986, 13.4030, 400))).unwrap();

    let (_, Json(group)) = block_on(create(
        Extension(api.clone()),
        ApiJson(NewGroup {
            name: "Neighbourhoods".into(),
            description: None,
        }),
    ))
    .unwrap();

    let Json(added) =
        block_on(add_place(Extension(api.clone()), ApiPath((group.id, place.id)))).unwrap();
    assert_eq!(added.place_ids, vec![place.id]);

    let Json(removed) =
        block_on(remove_place(Extension(api.clone()), ApiPath((group.id, place.id)))).unwrap();
    assert!(removed.place_ids.is_empty());

    let params = ListParams { page: 0, size: 10 };
    let Json(page) = block_on(list(Extension(api), ApiQuery(params))).unwrap();
    assert_eq!(page.total_elements, 1);
}
