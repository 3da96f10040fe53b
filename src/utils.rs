//! 工具函数模块
//!
//! 此模块包含了项目中使用的各种工具函数：
//! - 对象 ID 的生成与解析
//! - 存储键的派生与 ID 还原
//! - HTTP头部处理工具（包含MIME类型检测）

pub mod headers;
pub mod key;
pub mod object_id;
