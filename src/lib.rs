//! S3 上传路由库
//!
//! 这是一个基于Axum和S3的上传组件，主要功能包括：
//! - 接收单个 multipart 文件并流式写入S3存储桶
//! - 从存储键还原对象 ID 并写回请求中的文件描述
//! - 为已存储的对象生成限时的预签名URL

pub mod config;
pub mod error;
pub mod file;
pub mod handlers;
pub mod s3;
pub mod utils;

pub use config::{S3Config, Settings};
pub use error::{ObjectIdError, StoreError, UploadError};
pub use file::{FormFields, UploadedFile};
pub use handlers::{assign_object_id, stream_upload, upload_router};
pub use s3::{StorageEngine, get_signed_url};

use axum::routing::get;
use handlers::constants::SIGNED_URL_PATH;
use handlers::files::SignedUrlState;
use http::Method;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;

/// 创建并配置Axum应用程序
///
/// 此函数根据配置连接S3，然后调用 [`router`] 组装路由。
///
/// # Returns
///
/// 返回配置好的Axum Router实例
pub async fn app(settings: &Settings) -> axum::Router {
    let engine = StorageEngine::connect(&settings.s3, settings.bucket.clone())
        .await
        .with_part_size(settings.part_size);

    router(Arc::new(engine), settings.signed_url_expires)
}

/// 使用给定的存储引擎组装路由
///
/// - `GET /signed-url` 生成预签名URL
/// - 其余路径的 POST 请求进入上传管道
/// - 请求追踪与 CORS 中间件
pub fn router(engine: Arc<StorageEngine>, signed_url_expires: u64) -> axum::Router {
    // 配置 CORS
    let cors = CorsLayer::permissive()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::any());

    let state = SignedUrlState {
        engine: engine.clone(),
        default_expires: signed_url_expires,
    };

    axum::Router::new()
        .route(SIGNED_URL_PATH, get(handlers::handle_signed_url))
        .with_state(state)
        .merge(upload_router(engine, handlers::handle_uploaded_file))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
