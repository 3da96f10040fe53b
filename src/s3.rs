//! S3模块
//!
//! 该模块负责处理与S3存储桶的交互，包括客户端配置、对象写入、流式上传和预签名URL生成。

// 声明子模块
pub mod config;
pub mod engine;
pub mod presign;
pub mod store;

// 重新导出常用的类型和函数
pub use engine::StorageEngine;
pub use presign::get_signed_url;
pub use store::{ObjectLocation, ObjectStore, S3ObjectStore};
