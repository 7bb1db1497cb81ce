//! Handshake rejection responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{infrastructure::dto::http::ErrorDto, usecase::HandshakeError};

fn status_of(error: &HandshakeError) -> StatusCode {
    match error {
        HandshakeError::Unauthenticated | HandshakeError::InvalidCredential(_) => {
            StatusCode::UNAUTHORIZED
        }
        HandshakeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        HandshakeError::Forbidden { .. } => StatusCode::FORBIDDEN,
        HandshakeError::MembershipUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for HandshakeError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        let body = ErrorDto {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
