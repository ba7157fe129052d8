use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stockpulse_core::errors::Error as CoreError;
use stockpulse_market_data::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e {
                CoreError::NotTracked(_) => StatusCode::NOT_FOUND,
                CoreError::RefreshInProgress => StatusCode::CONFLICT,
                CoreError::InvalidConfigValue(_) => StatusCode::BAD_REQUEST,
                CoreError::MarketData(md) => match md.kind() {
                    ErrorKind::Normalization => StatusCode::BAD_REQUEST,
                    ErrorKind::Unsupported => StatusCode::NOT_IMPLEMENTED,
                    ErrorKind::Transport | ErrorKind::UpstreamFormat => StatusCode::BAD_GATEWAY,
                },
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stockpulse_market_data::MarketDataError;

    #[test]
    fn test_status_mapping() {
        let invalid: ApiError = CoreError::MarketData(MarketDataError::InvalidSymbol {
            symbol: "x".to_string(),
            reason: "not six digits".to_string(),
        })
        .into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = CoreError::NotTracked("sh600519".to_string()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let busy: ApiError = CoreError::RefreshInProgress.into();
        assert_eq!(busy.status(), StatusCode::CONFLICT);

        let upstream: ApiError = CoreError::MarketData(MarketDataError::Timeout {
            provider: "SINA".to_string(),
        })
        .into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }
}
