//! 配置模块。
//!
//! 该模块负责从环境变量加载和管理配置。

use crate::error::ConfigError;
use std::env;

/// 未设置 `S3_REGION` 时使用的区域
pub const DEFAULT_REGION: &str = "us-east-1";

/// 默认监听地址
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// 预签名 URL 的默认有效期（秒）
pub const DEFAULT_SIGNED_URL_EXPIRES: u64 = 3600;

/// S3 要求除最后一片外每个分片至少 5 MiB
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// 分片上传的默认分片大小
pub const DEFAULT_PART_SIZE: usize = MIN_PART_SIZE;

/// S3 连接配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// S3 兼容服务的端点 URL
    pub endpoint: Option<String>,
    pub force_path_style: bool,
}

impl S3Config {
    /// 使用访问密钥创建配置，区域默认为 `us-east-1`。
    ///
    /// # 参数
    ///
    /// * `access_key_id` - 访问密钥 ID
    /// * `secret_access_key` - 秘密访问密钥
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            force_path_style: false,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// 指定自定义端点，同时启用路径风格寻址（MinIO 等兼容服务需要）
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self.force_path_style = true;
        self
    }
}

/// 服务配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub s3: S3Config,
    pub bucket: String,
    pub listen_addr: String,
    pub signed_url_expires: u64,
    pub part_size: usize,
}

impl Settings {
    /// 从环境变量加载配置。
    ///
    /// # 环境变量
    ///
    /// * `S3_ACCESS_KEY_ID` - 访问密钥 ID（必填）
    /// * `S3_SECRET_ACCESS_KEY` - 秘密访问密钥（必填）
    /// * `S3_BUCKET` - 存储桶名称（必填）
    /// * `S3_REGION` - 区域（默认：us-east-1）
    /// * `S3_ENDPOINT` - S3 兼容服务的端点 URL（可选）
    /// * `LISTEN_ADDR` - 监听地址（默认：0.0.0.0:3000）
    /// * `SIGNED_URL_EXPIRES` - 预签名 URL 有效期，单位秒（默认：3600）
    /// * `UPLOAD_PART_SIZE` - 分片大小，单位字节（默认：5 MiB）
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 通过给定的查找函数加载配置，便于测试时不修改进程环境。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let mut s3 = S3Config::new(required("S3_ACCESS_KEY_ID")?, required("S3_SECRET_ACCESS_KEY")?);
        if let Some(region) = lookup("S3_REGION").filter(|value| !value.is_empty()) {
            s3 = s3.with_region(region);
        }
        if let Some(endpoint) = lookup("S3_ENDPOINT").filter(|value| !value.is_empty()) {
            s3 = s3.with_endpoint(endpoint);
        }

        Ok(Self {
            s3,
            bucket: required("S3_BUCKET")?,
            listen_addr: lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            signed_url_expires: parse_or(&lookup, "SIGNED_URL_EXPIRES", DEFAULT_SIGNED_URL_EXPIRES)?,
            part_size: part_size(&lookup)?,
        })
    }
}

/// 读取 `UPLOAD_PART_SIZE`，小于 [`MIN_PART_SIZE`] 的值会被拒绝
fn part_size<F>(lookup: &F) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let name = "UPLOAD_PART_SIZE";
    let part_size = parse_or(lookup, name, DEFAULT_PART_SIZE)?;
    if part_size < MIN_PART_SIZE {
        return Err(ConfigError::Invalid {
            name,
            value: part_size.to_string(),
        });
    }
    Ok(part_size)
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
