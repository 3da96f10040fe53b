//! 存储引擎模块
//!
//! 将上传的文件以流的方式写入绑定的存储桶。小文件一次 `PutObject`，
//! 超过一个分片大小的文件改用分片上传，内存中最多缓存一个分片。

use crate::config::{DEFAULT_PART_SIZE, MIN_PART_SIZE, S3Config};
use crate::error::{StoreError, UploadError};
use crate::file::UploadedFile;
use crate::s3::store::{ObjectStore, ObjectTarget, S3ObjectStore, StoredObject, UploadedPart};
use crate::utils::headers::guess_mime_type;
use crate::utils::key::storage_key;
use crate::utils::object_id::{IdGenerator, ObjectIdGenerator};
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 既没有上报类型、也无法从文件名猜测时使用的内容类型
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// 待写入的文件部分，字段均由 multipart 解析器提供
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePart {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: Option<String>,
}

/// 进行中的分片上传
struct PartUpload {
    upload_id: String,
    parts: Vec<UploadedPart>,
}

/// 绑定到一组凭据和一个存储桶的上传后端
///
/// 所有对象都以 `private` 权限创建，键由 [`storage_key`] 派生。
#[derive(Clone)]
pub struct StorageEngine {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    acl: ObjectCannedAcl,
    ids: Arc<dyn IdGenerator>,
    part_size: usize,
}

impl StorageEngine {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            acl: ObjectCannedAcl::Private,
            ids: Arc::new(ObjectIdGenerator::new()),
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// 创建连接到 S3 的存储引擎。
    ///
    /// # 参数
    ///
    /// * `config` - 访问密钥、秘密密钥以及可选的区域和端点。
    /// * `bucket` - 存储桶名称。
    pub async fn connect(config: &S3Config, bucket: impl Into<String>) -> Self {
        let store = S3ObjectStore::connect(config).await;
        Self::new(Arc::new(store), bucket)
    }

    /// 替换对象 ID 生成器
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// 设置分片大小，小于 [`MIN_PART_SIZE`] 时按最小值处理
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(MIN_PART_SIZE);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// 为原始文件名派生一个新的存储键
    pub fn key_for(&self, original_name: &str) -> String {
        storage_key(self.ids.as_ref(), original_name)
    }

    /// 将文件内容流式写入存储桶。
    ///
    /// 任意一个分片失败时会中止分片上传，然后返回原始错误。
    ///
    /// # 参数
    ///
    /// * `part` - 文件的字段名、原始文件名与 MIME 类型。
    /// * `body` - 文件内容的字节流。
    ///
    /// # 返回值
    ///
    /// 描述已写入对象的 [`UploadedFile`]，此时尚未设置 `object_id`。
    pub async fn store<S, E>(&self, part: FilePart, body: S) -> Result<UploadedFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        UploadError: From<E>,
    {
        let target = ObjectTarget {
            bucket: self.bucket.clone(),
            key: self.key_for(&part.original_name),
            content_type: content_type_for(&part),
            acl: self.acl.clone(),
        };

        let mut multipart = None;
        let (stored, size) = match self.transfer(&target, body, &mut multipart).await {
            Ok(done) => done,
            Err(err) => {
                if let Some(upload) = multipart {
                    self.abort(&target, &upload.upload_id).await;
                }
                return Err(err);
            }
        };

        info!(bucket = %target.bucket, key = %target.key, size, "file uploaded");

        Ok(UploadedFile {
            field_name: part.field_name,
            original_name: part.original_name,
            mime_type: part.mime_type,
            size,
            bucket: target.bucket,
            key: target.key,
            acl: target.acl.as_str().to_owned(),
            content_type: target.content_type,
            location: stored.location,
            etag: stored.etag,
            version_id: stored.version_id,
            object_id: None,
        })
    }

    /// 删除已写入的对象，失败时只记录警告
    pub async fn remove(&self, file: &UploadedFile) {
        match self.store.delete_object(&file.bucket, &file.key).await {
            Ok(()) => debug!(bucket = %file.bucket, key = %file.key, "file removed"),
            Err(e) => warn!(bucket = %file.bucket, key = %file.key, error = %e, "failed to remove file"),
        }
    }

    /// 为存储桶中的对象生成预签名 GET URL，每次调用都会重新签名。
    pub async fn signed_url(&self, expires_in: u64, key: &str) -> Result<String, StoreError> {
        self.store
            .presign_get(&self.bucket, key, Duration::from_secs(expires_in))
            .await
    }

    async fn transfer<S, E>(
        &self,
        target: &ObjectTarget,
        body: S,
        multipart: &mut Option<PartUpload>,
    ) -> Result<(StoredObject, u64), UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        UploadError: From<E>,
    {
        let mut body = pin!(body);
        let mut buffer = BytesMut::new();
        let mut size = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            buffer.extend_from_slice(&chunk);

            // 严格大于才发出整片，保证最后一片非空
            while buffer.len() > self.part_size {
                let chunk = buffer.split_to(self.part_size).freeze();
                if multipart.is_none() {
                    *multipart = Some(self.begin(target).await?);
                }
                if let Some(upload) = multipart.as_mut() {
                    self.send_part(target, upload, chunk).await?;
                }
            }
        }

        let Some(upload) = multipart.as_mut() else {
            let stored = self.store.put_object(target, buffer.freeze()).await?;
            return Ok((stored, size));
        };

        self.send_part(target, upload, buffer.freeze()).await?;
        let parts = std::mem::take(&mut upload.parts);
        let stored = self
            .store
            .complete_multipart_upload(target, &upload.upload_id, parts)
            .await?;
        Ok((stored, size))
    }

    async fn begin(&self, target: &ObjectTarget) -> Result<PartUpload, StoreError> {
        let upload_id = self.store.create_multipart_upload(target).await?;
        debug!(key = %target.key, upload_id = %upload_id, "multipart upload started");
        Ok(PartUpload {
            upload_id,
            parts: Vec::new(),
        })
    }

    async fn send_part(
        &self,
        target: &ObjectTarget,
        upload: &mut PartUpload,
        body: Bytes,
    ) -> Result<(), StoreError> {
        let part_number = upload.parts.len() as i32 + 1;
        debug!(key = %target.key, part_number, bytes = body.len(), "uploading part");

        let part = self
            .store
            .upload_part(target, &upload.upload_id, part_number, body)
            .await?;
        upload.parts.push(part);
        Ok(())
    }

    async fn abort(&self, target: &ObjectTarget, upload_id: &str) {
        if let Err(e) = self.store.abort_multipart_upload(target, upload_id).await {
            warn!(key = %target.key, upload_id, error = %e, "failed to abort multipart upload");
        }
    }
}

/// 对象的内容类型：优先使用解析器上报的 MIME 类型，其次按文件名猜测
fn content_type_for(part: &FilePart) -> String {
    part.mime_type
        .clone()
        .or_else(|| guess_mime_type(&part.original_name))
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned())
}
