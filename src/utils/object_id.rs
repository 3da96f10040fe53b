use crate::error::ObjectIdError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 对象 ID 的字节长度
pub const OBJECT_ID_LEN: usize = 12;

/// 计数器只占 3 个字节
const COUNTER_MASK: u32 = 0x00ff_ffff;

/// 12 字节的对象 ID，与 MongoDB ObjectId 的布局一致：
///
/// - 4 字节：大端序的 Unix 秒级时间戳
/// - 5 字节：生成器的随机值
/// - 3 字节：大端序的自增计数器
///
/// 文本形式为 24 个小写十六进制字符，因此不会包含 `/`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// 嵌入在 ID 中的创建时间（Unix 秒）
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    /// 只接受恰好 24 个十六进制字符（大小写均可）。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OBJECT_ID_LEN * 2 {
            return Err(ObjectIdError::InvalidLength(s.len()));
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ObjectIdError::InvalidHex(s.to_owned()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 对象 ID 生成器
///
/// 生成器作为能力显式传入，而不是依赖进程级的全局状态。
pub trait IdGenerator: Send + Sync {
    /// 生成一个新的对象 ID
    fn next_id(&self) -> ObjectId;
}

/// 默认的对象 ID 生成器
///
/// 每个实例在创建时随机选取 5 字节的随机值和计数器初值，
/// 之后每次生成时计数器自增（按 3 字节回绕）。
#[derive(Debug)]
pub struct ObjectIdGenerator {
    random: [u8; 5],
    counter: AtomicU32,
}

impl ObjectIdGenerator {
    pub fn new() -> Self {
        Self::with_seed(rand::random(), rand::random())
    }

    /// 使用固定的随机值和计数器初值创建生成器
    pub fn with_seed(random: [u8; 5], counter: u32) -> Self {
        Self {
            random,
            counter: AtomicU32::new(counter & COUNTER_MASK),
        }
    }

    /// 用给定的时间戳生成 ID
    pub fn next_id_at(&self, timestamp: u32) -> ObjectId {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.random);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        ObjectId(bytes)
    }
}

impl Default for ObjectIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for ObjectIdGenerator {
    fn next_id(&self) -> ObjectId {
        // 时间戳超出 u32 时按 4 字节截断
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or_default();
        self.next_id_at(timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_accepts_24_hex_characters() {
        let id: ObjectId = "507f1f77bcf86cd799439011".parse().unwrap();
        assert_eq!(id.to_hex(), "507f1f77bcf86cd799439011");
        assert_eq!(id.timestamp(), 0x507f1f77);

        // 大写同样合法，输出统一为小写
        let upper: ObjectId = "507F1F77BCF86CD799439011".parse().unwrap();
        assert_eq!(upper, id);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert_eq!(
            "not-an-id".parse::<ObjectId>(),
            Err(ObjectIdError::InvalidLength(9))
        );
        assert_eq!("".parse::<ObjectId>(), Err(ObjectIdError::InvalidLength(0)));
        assert!(matches!(
            "zzzzzzzzzzzzzzzzzzzzzzzz".parse::<ObjectId>(),
            Err(ObjectIdError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_generator_layout() {
        let generator = ObjectIdGenerator::with_seed([1, 2, 3, 4, 5], 0x00ab_cdef);
        let id = generator.next_id_at(0x6000_0000);
        assert_eq!(id.to_hex(), "600000000102030405abcdef");

        let next = generator.next_id_at(0x6000_0000);
        assert_eq!(next.to_hex(), "600000000102030405abcdf0");
    }

    #[test]
    fn test_counter_wraps_at_three_bytes() {
        let generator = ObjectIdGenerator::with_seed([0; 5], COUNTER_MASK);
        assert!(generator.next_id_at(1).to_hex().ends_with("ffffff"));
        assert!(generator.next_id_at(1).to_hex().ends_with("000000"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let generator = ObjectIdGenerator::new();
        let ids: HashSet<_> = (0..1000).map(|_| generator.next_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_serializes_as_hex_string() {
        let id: ObjectId = "507f1f77bcf86cd799439011".parse().unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"507f1f77bcf86cd799439011\""
        );
    }
}
