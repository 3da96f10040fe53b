//! 错误类型模块
//!
//! 上传管道、对象存储和配置加载各自的错误类型。

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfigError;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::convert::Infallible;
use thiserror::Error;

/// 对象 ID 解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectIdError {
    #[error("object id must be 24 hex characters, got {0}")]
    InvalidLength(usize),
    #[error("object id is not valid hex: {0:?}")]
    InvalidHex(String),
}

/// 对象存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("CreateMultipartUpload returned no upload id")]
    MissingUploadId,
    #[error("invalid presigning config: {0}")]
    Presigning(#[from] PresigningConfigError),
}

impl StoreError {
    /// 包装一次失败的 SDK 调用，保留完整的错误链文本。
    pub fn request<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Request {
            operation,
            message: DisplayErrorContext(&err).to_string(),
            source: Box::new(err),
        }
    }
}

/// 上传管道错误
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid multipart request: {0}")]
    Rejected(#[from] MultipartRejection),
    #[error("failed to read multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Unexpected field: {0}")]
    UnexpectedField(String),
    #[error(transparent)]
    ObjectId(#[from] ObjectIdError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<Infallible> for UploadError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl UploadError {
    /// 错误对应的 HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rejected(rejection) => rejection.status(),
            Self::Multipart(err) => err.status(),
            Self::UnexpectedField(_) => StatusCode::BAD_REQUEST,
            Self::ObjectId(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "upload failed");
        } else {
            tracing::warn!(error = %self, "upload rejected");
        }
        (status, self.to_string()).into_response()
    }
}

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}
