//! S3预签名URL模块
//!
//! 该模块负责生成S3对象的预签名URL。

use crate::config::S3Config;
use crate::error::StoreError;
use crate::s3::store::{ObjectStore, S3ObjectStore};
use std::time::Duration;

/// 为存储桶中的对象生成限时的预签名 GET URL。
///
/// 每次调用都会新建客户端并重新签名，不做缓存。
///
/// # 参数
///
/// * `config` - 访问密钥和秘密密钥（以及可选的区域、端点）。
/// * `bucket` - 存储桶名称。
/// * `expires_in` - URL 有效期（秒），最长 7 天。
/// * `key` - 对象的存储键。
///
/// # 返回值
///
/// 预签名 URL 的字符串表示。
///
/// # Errors
///
/// 有效期超出限制或 SDK 拒绝请求时返回错误，不会重试。
pub async fn get_signed_url(
    config: &S3Config,
    bucket: &str,
    expires_in: u64,
    key: &str,
) -> Result<String, StoreError> {
    let store = S3ObjectStore::connect(config).await;
    store
        .presign_get(bucket, key, Duration::from_secs(expires_in))
        .await
}
