use crate::file::UploadedFile;
use crate::handlers::constants::NO_FILE_MESSAGE;
use crate::s3::StorageEngine;
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// 预签名URL处理器的状态
#[derive(Clone)]
pub struct SignedUrlState {
    pub engine: Arc<StorageEngine>,
    /// 请求未指定有效期时使用的默认值（秒）
    pub default_expires: u64,
}

/// 预签名URL请求的查询参数
#[derive(Debug, Deserialize)]
pub struct SignedUrlQuery {
    pub key: String,
    pub expires: Option<u64>,
}

/// 上传完成后的下游处理器
///
/// 返回带有对象 ID 的文件描述；请求中没有文件时返回 400。
pub async fn handle_uploaded_file(file: Option<Extension<UploadedFile>>) -> Response {
    match file {
        Some(Extension(file)) => (StatusCode::CREATED, Json(file)).into_response(),
        None => (StatusCode::BAD_REQUEST, NO_FILE_MESSAGE).into_response(),
    }
}

/// 为存储桶中的对象生成预签名URL
///
/// # 请求方法
///
/// GET /signed-url?key=<存储键>&expires=<秒>
///
/// # 返回值
///
/// * `Ok(Json)` - `{"url": "..."}`
/// * `Err((StatusCode, String))` - 签名失败时返回 502
pub async fn handle_signed_url(
    State(state): State<SignedUrlState>,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let expires = query.expires.unwrap_or(state.default_expires);

    match state.engine.signed_url(expires, &query.key).await {
        Ok(url) => Ok(Json(json!({ "url": url }))),
        Err(e) => Err((StatusCode::BAD_GATEWAY, format!("S3 Error: {}", e))),
    }
}
