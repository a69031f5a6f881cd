use async_trait::async_trait;
use axum::body::HttpBody;
use axum::extract::{FromRequest, Json, Path, Query, RequestParts};
use axum::BoxError;
use serde::de::DeserializeOwned;

use crate::error::{invalid_input_error, Error};

/// `Query` whose rejection renders as an `InvalidInput` error body.
pub struct ApiQuery<T>(pub T);

/// `Json` whose rejection renders as an `InvalidInput` error body.
pub struct ApiJson<T>(pub T);

/// `Path` whose rejection renders as an `InvalidInput` error body.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request(req)
            .await
            .map_err(|rejection| invalid_input_error(rejection.to_string()))?;

        Ok(Self(value))
    }
}

#[async_trait]
impl<T, B> FromRequest<B> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req)
            .await
            .map_err(|rejection| invalid_input_error(rejection.to_string()))?;

        Ok(Self(value))
    }
}

#[async_trait]
impl<T, B> FromRequest<B> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request(req)
            .await
            .map_err(|rejection| invalid_input_error(rejection.to_string()))?;

        Ok(Self(value))
    }
}
