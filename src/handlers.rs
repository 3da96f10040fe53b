//! HTTP请求处理模块
//!
//! 此模块包含了上传管道以及示例服务使用的处理器：
//! - 上传中间件与上传路由工厂
//! - 上传结果与预签名URL处理器

pub mod constants;
pub mod files;
pub mod upload;

// 重新导出主要的公共接口
pub use files::{handle_signed_url, handle_uploaded_file};
pub use upload::{assign_object_id, stream_upload, upload_router};
