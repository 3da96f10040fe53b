//! 对象存储模块
//!
//! `ObjectStore` 是上传流程与对象存储之间的接缝，`S3ObjectStore` 是基于
//! `aws-sdk-s3` 的实现。

use crate::config::S3Config;
use crate::error::StoreError;
use crate::s3::config::create_s3_client;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use bytes::Bytes;
use mockall::automock;
use std::time::Duration;

/// 一次写入的目标对象及其属性
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTarget {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub acl: ObjectCannedAcl,
}

/// 存储服务确认写入后返回的对象信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    pub etag: Option<String>,
    pub version_id: Option<String>,
    pub location: Option<String>,
}

/// 已上传的分片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub etag: Option<String>,
}

/// 对象存储操作
#[automock]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 单次请求写入整个对象
    async fn put_object(&self, target: &ObjectTarget, body: Bytes)
    -> Result<StoredObject, StoreError>;

    /// 开始分片上传，返回上传 ID
    async fn create_multipart_upload(&self, target: &ObjectTarget) -> Result<String, StoreError>;

    async fn upload_part(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<UploadedPart, StoreError>;

    async fn complete_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<StoredObject, StoreError>;

    async fn abort_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
    ) -> Result<(), StoreError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// 生成对象的预签名 GET URL
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError>;
}

/// 对象访问地址的拼接规则
///
/// 配置了端点时使用路径风格 `{endpoint}/{bucket}/{key}`，
/// 否则使用 AWS 的虚拟主机风格 `https://{bucket}.s3.{region}.amazonaws.com/{key}`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    endpoint: Option<String>,
    region: String,
    force_path_style: bool,
}

impl ObjectLocation {
    pub fn from_config(config: &S3Config) -> Self {
        Self {
            endpoint: config
                .endpoint
                .as_deref()
                .map(|endpoint| endpoint.trim_end_matches('/').to_owned()),
            region: config.region.clone(),
            force_path_style: config.force_path_style,
        }
    }

    /// 对象的访问地址，键按路径段编码
    pub fn url(&self, bucket: &str, key: &str) -> String {
        let key = key
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");

        match &self.endpoint {
            Some(endpoint) => format!("{endpoint}/{bucket}/{key}"),
            None if self.force_path_style => {
                format!("https://s3.{}.amazonaws.com/{bucket}/{key}", self.region)
            }
            None => format!("https://{bucket}.s3.{}.amazonaws.com/{key}", self.region),
        }
    }
}

/// 基于 `aws-sdk-s3` 的对象存储
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    location: ObjectLocation,
}

impl S3ObjectStore {
    pub fn new(client: Client, location: ObjectLocation) -> Self {
        Self { client, location }
    }

    /// 按配置创建客户端
    pub async fn connect(config: &S3Config) -> Self {
        Self::new(
            create_s3_client(config).await,
            ObjectLocation::from_config(config),
        )
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        target: &ObjectTarget,
        body: Bytes,
    ) -> Result<StoredObject, StoreError> {
        let output = self
            .client
            .put_object()
            .bucket(&target.bucket)
            .key(&target.key)
            .acl(target.acl.clone())
            .content_type(&target.content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StoreError::request("PutObject", e))?;

        Ok(StoredObject {
            etag: output.e_tag().map(str::to_owned),
            version_id: output.version_id().map(str::to_owned),
            location: Some(self.location.url(&target.bucket, &target.key)),
        })
    }

    async fn create_multipart_upload(&self, target: &ObjectTarget) -> Result<String, StoreError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .acl(target.acl.clone())
            .content_type(&target.content_type)
            .send()
            .await
            .map_err(|e| StoreError::request("CreateMultipartUpload", e))?;

        output
            .upload_id()
            .map(str::to_owned)
            .ok_or(StoreError::MissingUploadId)
    }

    async fn upload_part(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<UploadedPart, StoreError> {
        let output = self
            .client
            .upload_part()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StoreError::request("UploadPart", e))?;

        Ok(UploadedPart {
            part_number,
            etag: output.e_tag().map(str::to_owned),
        })
    }

    async fn complete_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<StoredObject, StoreError> {
        let completed_parts = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .set_e_tag(part.etag)
                    .build()
            })
            .collect();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| StoreError::request("CompleteMultipartUpload", e))?;

        Ok(StoredObject {
            etag: output.e_tag().map(str::to_owned),
            version_id: output.version_id().map(str::to_owned),
            location: output
                .location()
                .map(str::to_owned)
                .or_else(|| Some(self.location.url(&target.bucket, &target.key))),
        })
    }

    async fn abort_multipart_upload(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
    ) -> Result<(), StoreError> {
        self.client
            .abort_multipart_upload()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StoreError::request("AbortMultipartUpload", e))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::request("DeleteObject", e))?;
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        // 超过 7 天的有效期会在这里被拒绝
        let presigning_config = PresigningConfig::expires_in(expires_in)?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StoreError::request("GetObject", e))?;

        Ok(presigned_request.uri().to_string())
    }
}
