//! 上传文件描述模块

use crate::utils::object_id::ObjectId;
use serde::Serialize;
use std::collections::HashMap;

/// 一次请求中上传的文件
///
/// 由上传中间件写入请求扩展，下游处理器通过 `Extension<UploadedFile>` 读取。
/// `original_name` 与 `mime_type` 来自客户端，不可信。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub size: u64,
    pub bucket: String,
    pub key: String,
    pub acl: String,
    pub content_type: String,
    pub location: Option<String>,
    pub etag: Option<String>,
    pub version_id: Option<String>,
    /// 上传完成后由存储键还原得到
    pub object_id: Option<ObjectId>,
}

/// 表单中的非文件字段，同名字段以最后一个值为准
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(pub HashMap<String, String>);

impl FormFields {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }
}
