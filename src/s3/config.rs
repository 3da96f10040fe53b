//! S3配置模块
//!
//! 该模块负责S3客户端的配置和初始化。

use crate::config::S3Config;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;

/// 凭据提供者名称
const PROVIDER_NAME: &str = "upload-router";

/// 使用给定的配置创建 S3 客户端。
///
/// 凭据与区域都显式指定，不会再去环境变量或实例元数据中查找。
///
/// # 参数
///
/// * `config` - S3 连接配置。
///
/// # 返回值
///
/// 配置好的 `aws_sdk_s3::Client`。
pub async fn create_s3_client(config: &S3Config) -> Client {
    let credentials = Credentials::new(
        &config.access_key_id,
        &config.secret_access_key,
        None,
        None,
        PROVIDER_NAME,
    );

    let region_provider = RegionProviderChain::first_try(Some(Region::new(config.region.clone())));

    let mut config_builder = aws_config::defaults(BehaviorVersion::latest())
        .credentials_provider(credentials)
        .region(region_provider);

    if let Some(endpoint) = &config.endpoint {
        config_builder = config_builder.endpoint_url(endpoint);
    }

    let sdk_config = config_builder.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.force_path_style)
        .build();

    Client::from_conf(s3_config)
}
