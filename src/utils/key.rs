use crate::error::ObjectIdError;
use crate::utils::object_id::{IdGenerator, ObjectId};

/// 存储键中对象 ID 与文件名之间的分隔符
pub const KEY_SEPARATOR: char = '/';

/// 为上传的文件派生存储键：`<新对象 ID>/<原始文件名>`。
///
/// 每次调用都会从 `ids` 生成一个新的 ID。文件名原样拼接，不做校验，
/// 空文件名得到的是 `<id>/`。
///
/// # 参数
///
/// * `ids` - 对象 ID 生成器。
/// * `original_name` - 客户端提供的原始文件名。
///
/// # 示例
///
/// ```
/// use s3_upload::utils::key::{object_id_from_key, storage_key};
/// use s3_upload::utils::object_id::ObjectIdGenerator;
///
/// let key = storage_key(&ObjectIdGenerator::new(), "photo.png");
/// assert!(key.ends_with("/photo.png"));
/// assert!(object_id_from_key(&key).is_ok());
/// ```
pub fn storage_key(ids: &dyn IdGenerator, original_name: &str) -> String {
    format!("{}{}{}", ids.next_id(), KEY_SEPARATOR, original_name)
}

/// 从存储键还原对象 ID
///
/// 取第一个 `/` 之前的部分并解析为对象 ID，这是上传完成后获取 ID 的唯一途径。
///
/// # 返回值
///
/// 解析得到的对象 ID；第一段不是合法 ID 时返回错误。
pub fn object_id_from_key(key: &str) -> Result<ObjectId, ObjectIdError> {
    key.split(KEY_SEPARATOR).next().unwrap_or_default().parse()
}
