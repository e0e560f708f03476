// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Display;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{Classify, ErrorKind};

/// Detail sent with every throttling response
const SLOW_DOWN: &str = "Please slow down request rate";

/// Detail sent in place of upstream failure messages
const REQUEST_FAILED: &str = "request failed";

/// Error returned from request handlers
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "Code")]
    code: &'static str,
    #[serde(rename = "Message")]
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "BadRequestError"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NotFoundError"),
            ErrorKind::CapacityExceeded => (StatusCode::TOO_MANY_REQUESTS, "TooManyRequestsError"),
            ErrorKind::UnknownContentType => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UnprocessableEntityError",
            ),
            ErrorKind::Upstream => (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError"),
        }
    }
}

impl<E: Classify + Display> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let detail = match self.kind {
            ErrorKind::CapacityExceeded => {
                warn!(error = %self.message, "Store throttled request");
                SLOW_DOWN.to_string()
            }
            ErrorKind::Upstream => {
                error!(error = %self.message, "Request failed");
                REQUEST_FAILED.to_string()
            }
            _ => self.message,
        };

        let body = ErrorBody {
            code,
            message: format!("{code}: {detail}"),
        };
        (status, Json(body)).into_response()
    }
}
