use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Handler error for failures that are not surfaced as a toast, such as a
/// broken session store. Renders a bare 500.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn renders_internal_server_error() {
        let err: AppError = anyhow::anyhow!("session store offline").into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Internal Server Error");
    }

    #[test]
    fn converts_from_std_errors() {
        let parse = "x".parse::<i64>().unwrap_err();
        let err = AppError::from(parse);
        assert!(err.0.to_string().contains("invalid digit"));
    }
}
