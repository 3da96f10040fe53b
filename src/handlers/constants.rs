/// 接收上传文件的表单字段名
pub const FILE_FIELD: &str = "file";

/// 预签名URL接口的路径
pub const SIGNED_URL_PATH: &str = "/signed-url";

/// 请求中没有文件时的响应内容
pub const NO_FILE_MESSAGE: &str = "No file uploaded";
