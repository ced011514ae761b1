use serde::Serialize;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use crate::error::{Error, Result};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::DayFull(_) | Error::Overflow { .. } => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Metadata(_) => StatusCode::BAD_GATEWAY,
            Error::Storage(_) | Error::Catalog(_) | Error::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl Reply for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, kind = self.kind(), "request refused");
        }

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        warp::reply::with_status(warp::reply::json(&body), status).into_response()
    }
}

/// JSON for a successful result, the error's status and body otherwise.
pub(crate) fn json<T: Serialize>(result: Result<T>) -> Response {
    with_status(result, StatusCode::OK)
}

pub(crate) fn created<T: Serialize>(result: Result<T>) -> Response {
    with_status(result, StatusCode::CREATED)
}

pub(crate) fn no_content(result: Result<()>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

fn with_status<T: Serialize>(result: Result<T>, status: StatusCode) -> Response {
    match result {
        Ok(value) => warp::reply::with_status(warp::reply::json(&value), status).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Error body for requests warp refused before reaching a handler.
pub(crate) fn refused(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: message.into(),
        kind: "invalid_input",
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}
