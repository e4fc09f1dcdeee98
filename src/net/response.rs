use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

pub struct ResponseError(Response);

impl IntoResponse for ResponseError {
    fn into_response(self) -> Response {
        self.0
    }
}

/// Anything eyre can hold becomes a logged 500
impl<E> From<E> for ResponseError
where
    E: Into<color_eyre::eyre::Error>,
{
    fn from(value: E) -> Self {
        let err: color_eyre::eyre::Error = value.into();
        error!("Request failed: {err:#}");
        Self((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response())
    }
}

impl ResponseError {
    pub fn with_status<T>(status_code: StatusCode, data: T) -> Self
    where
        (StatusCode, T): IntoResponse,
    {
        ResponseError((status_code, data).into_response())
    }

    pub fn bad_request<T>(data: T) -> Self
    where
        (StatusCode, T): IntoResponse,
    {
        Self::with_status(StatusCode::BAD_REQUEST, data)
    }

    pub fn not_found<T>(data: T) -> Self
    where
        (StatusCode, T): IntoResponse,
    {
        Self::with_status(StatusCode::NOT_FOUND, data)
    }
}

pub type Result<T, E = ResponseError> = axum::response::Result<T, E>;
