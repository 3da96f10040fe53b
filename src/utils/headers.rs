use http::{HeaderMap, header};
use mime_guess::mime;

/// 判断请求体是否为 multipart 编码
///
/// # 参数
///
/// * `headers` - 请求头部映射
///
/// # 返回值
///
/// `Content-Type` 的主类型为 `multipart` 时返回 `true`
pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|content_type| content_type.type_() == mime::MULTIPART)
}

/// 根据文件名猜测 MIME 类型
///
/// # 参数
///
/// * `file_name` - 文件名或路径
///
/// # 返回值
///
/// 猜测得到的 MIME 类型，无法识别扩展名时返回 `None`
pub fn guess_mime_type(file_name: &str) -> Option<String> {
    mime_guess::from_path(file_name)
        .first()
        .map(|guessed| guessed.essence_str().to_owned())
}
