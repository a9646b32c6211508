use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::usecases::{
    carts::CartError, checkout::CheckoutError, products::ProductError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

fn render(status: StatusCode, message: String) -> Response {
    // Don't leak internal error detail to clients.
    let message = if status.is_server_error() {
        "Internal server error".to_string()
    } else {
        message
    };

    let body = Json(ErrorResponse {
        code: status.as_u16(),
        message,
    });

    (status, body).into_response()
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        render(self.status_code(), self.to_string())
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        render(self.status_code(), self.to_string())
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        render(self.status_code(), self.to_string())
    }
}
