//! Success and error bodies of the RPC boundary.

use crate::{Error, ErrorCode};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Successful procedure result, sent as `{"result": {"data": ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResult<T> {
    /// Result wrapper
    pub result: RpcData<T>,
}

/// Payload of an [`RpcResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcData<T> {
    /// Procedure output
    pub data: T,
}

impl<T> RpcResult<T> {
    /// Wrap a procedure output.
    pub fn new(data: T) -> Self {
        Self {
            result: RpcData { data },
        }
    }
}

impl<T: Serialize> IntoResponse for RpcResult<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Failed procedure, sent as `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error wrapper
    pub error: ErrorDetail,
}

/// Code and message of an [`ErrorBody`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = status_for(code);
        if status.is_server_error() {
            tracing::error!(category = self.category(), error = %self, "procedure failed");
        } else {
            tracing::debug!(category = self.category(), error = %self, "procedure rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message: self.public_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, reporting malformed input as a bad request.
pub(crate) fn json_input<T>(input: Result<Json<T>, JsonRejection>) -> crate::Result<T> {
    input
        .map(|Json(value)| value)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}

/// Unwrap query parameters, reporting malformed input as a bad request.
pub(crate) fn query_input<T>(
    input: Result<axum::extract::Query<T>, QueryRejection>,
) -> crate::Result<T> {
    input
        .map(|axum::extract::Query(value)| value)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let cases = [
            (Error::not_found("missing"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (Error::validation("bad"), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (Error::unauthorized("no"), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (
                Error::upstream_with_status("Budget table locked", 503),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
            ),
        ];

        for (error, status, code) in cases {
            let message = error.public_message();
            let response = error.into_response();
            assert_eq!(response.status(), status);
            let body = body_json(response).await;
            assert_eq!(body["error"]["code"], code);
            assert_eq!(body["error"]["message"], message);
        }
    }

    #[tokio::test]
    async fn test_result_envelope() {
        let response = RpcResult::new(vec![1, 2]).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"result": {"data": [1, 2]}}));
    }
}
