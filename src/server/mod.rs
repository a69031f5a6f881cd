mod extract;
mod handlers;
pub mod responses;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{groups, places};

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/api/v1/places", post(places::create).get(places::list))
        .route("/api/v1/places/near", get(places::near))
        .route("/api/v1/places/intersections", post(places::intersections))
        .route("/api/v1/places/:id", get(places::find).delete(places::delete))
        .route("/api/v1/groups", post(groups::create).get(groups::list))
        .route("/api/v1/groups/:id", get(groups::find).delete(groups::delete))
        .route(
            "/api/v1/groups/:id/places/:place_id",
            post(groups::add_place).delete(groups::remove_place),
        )
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let api = Arc::new(api) as DynAPI;

    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!(%err, "server stopped");
            unexpected_error()
        })
}

#[cfg(test)]
fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    tokio_test::block_on(async {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    })
}

#[test]
fn router_serves_places_and_groups() {
    use crate::db::MemoryStore;
    use crate::engine::Engine;
    use axum::http::StatusCode;
    use serde_json::json;

    let app = router(Arc::new(Engine::new(MemoryStore::new())) as DynAPI);

    let (status, place) = send(
        &app,
        "POST",
        "/api/v1/places",
        Some(json!({
            "name": "Alexanderplatz",
            "category": "LANDMARK",
            "latitude": 52.5219,
            "longitude": 13.4132,
            "visitRadiusMeters": 75
        })),
    );
    assert_eq!(status, StatusCode::CREATED);
    let place_id = place["id"].as_str().unwrap().to_string();

    let (status, group) = send(
        &app,
        "POST",
        "/api/v1/groups",
        Some(json!({ "name": "Mitte", "description": null })),
    );
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_str().unwrap().to_string();

    let membership = format!("/api/v1/groups/{group_id}/places/{place_id}");
    let (status, added) = send(&app, "POST", &membership, None);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(added["placeIds"], json!([place_id]));

    let (status, near) = send(
        &app,
        "GET",
        "/api/v1/places/near?lat=52.5219&lon=13.4132&radiusMeters=50",
        None,
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(near["totalElements"], 1);
    assert_eq!(near["content"][0]["groupIds"], json!([group_id]));

    let (status, track) = send(
        &app,
        "POST",
        "/api/v1/places/intersections",
        Some(json!({ "points": [
            { "latitude": 52.5215, "longitude": 13.4125 },
            { "latitude": 52.5223, "longitude": 13.4140 }
        ] })),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(track["content"][0]["id"], json!(place_id));

    let (status, removed) = send(&app, "DELETE", &membership, None);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["placeIds"], json!([]));

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/places/{place_id}"), None);
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, missing) = send(&app, "GET", &format!("/api/v1/places/{place_id}"), None);
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["code"], 200);
}

#[test]
fn router_renders_rejections_as_invalid_input() {
    use crate::db::MemoryStore;
    use crate::engine::Engine;
    use axum::http::StatusCode;
    use serde_json::json;

    let app = router(Arc::new(Engine::new(MemoryStore::new())) as DynAPI);

    let (status, body) = send(&app, "GET", "/api/v1/places?category=CASTLE", None);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 101);

    let (status, body) = send(&app, "GET", "/api/v1/places/near?lat=1&lon=1", None);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 101);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/places",
        Some(json!({ "name": "No coordinates", "category": "PARK" })),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 101);

    let (status, body) = send(&app, "GET", "/api/v1/groups/not-a-uuid", None);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 101);

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/places/near?lat=1&lon=1&radiusMeters=0",
        None,
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 103);

    let (status, body) = send(&app, "GET", "/api/v1/places?size=0", None);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 101);
}
