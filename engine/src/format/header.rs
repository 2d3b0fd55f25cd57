//! crypt15 Header 解析
//!
//! 文件布局：
//!
//! ```text
//! byte 0      header 长度 L
//! byte 1      若等于 1：feature flag，占 1 字节；否则 header 从 byte 1 开始
//! [start, start+L)      header（protobuf 编码）
//! [start+L, len-32)     密文
//! [len-32, len-16)      未使用
//! [len-16, len)         GCM 认证标签
//! ```
//!
//! header 中 field 3 为嵌套消息，其 field 1（长度恰为 16）即 IV。
//! 解析时逐字段遍历，未知字段一律跳过。
//!
//! 注意：`len-32..len-16` 这 16 字节的来源未经权威格式文档确认，
//! 这里保持偏移计算不变，不对其做任何校验。

use std::ops::Range;

use tracing::{debug, warn};

use crate::error::CryptError;
use crate::format::layout::IV_LEN;
use crate::format::wire::{self, WireError};

/// byte 1 取此值时表示存在 feature flag
pub const FEATURE_FLAG: u8 = 1;

/// 包含 IV 的嵌套消息所在字段号
pub const IV_CONTAINER_FIELD: u64 = 3;

/// 嵌套消息中 IV 的字段号
pub const IV_FIELD: u64 = 1;

/// GCM 认证标签长度
pub const TAG_LEN: usize = 16;

/// 密文之后的尾部长度（16 字节未使用 + 16 字节标签）
pub const TRAILER_LEN: usize = 32;

/// 结构化解析找不到 IV 时的兜底偏移
pub const RECOVERY_IV_OFFSET: usize = 8;

/// IV 的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvSource {
    /// 从 header 的 field 3 / field 1 中取得
    Header,
    /// header 中未找到，从固定偏移兜底读取
    RecoveryOffset,
}

/// 解析后的 crypt15 Header 几何信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModernHeader {
    pub header_len: usize,
    pub feature_flag: bool,
    /// header body 在文件中的区间
    pub body: Range<usize>,
    pub iv: [u8; IV_LEN],
    pub iv_source: IvSource,
}

impl ModernHeader {
    /// 从完整容器字节中读取并解析 Header
    pub fn read(data: &[u8]) -> Result<Self, CryptError> {
        let header_len = *data.first().ok_or(CryptError::TruncatedContainer {
            needed: 2,
            actual: data.len(),
        })? as usize;

        let flag_byte = *data.get(1).ok_or(CryptError::TruncatedContainer {
            needed: 2,
            actual: data.len(),
        })?;

        let feature_flag = flag_byte == FEATURE_FLAG;
        let body_start = if feature_flag { 2 } else { 1 };
        let body = body_start..body_start + header_len;

        if body.end > data.len() {
            return Err(CryptError::TruncatedContainer {
                needed: body.end,
                actual: data.len(),
            });
        }

        let (iv, iv_source) = match find_iv(&data[body.clone()]) {
            Ok(Some(iv)) => (iv, IvSource::Header),
            Ok(None) => {
                warn!(
                    offset = RECOVERY_IV_OFFSET,
                    "IV not found in crypt15 header, using recovery offset"
                );
                (read_recovery_iv(data)?, IvSource::RecoveryOffset)
            }
            Err(e) => return Err(CryptError::MalformedHeader(e.describe())),
        };

        debug!(header_len, feature_flag, ?iv_source, "parsed crypt15 header");

        Ok(Self {
            header_len,
            feature_flag,
            body,
            iv,
            iv_source,
        })
    }

    /// 密文起始偏移（header 之后）
    pub fn payload_start(&self) -> usize {
        self.body.end
    }
}

/// 在 header body 中定位 IV
///
/// 只关心 field 3 -> field 1；其他字段、长度不为 16 的候选都跳过。
pub fn find_iv(body: &[u8]) -> Result<Option<[u8; IV_LEN]>, WireError> {
    let mut cursor = wire::WireCursor::new(body);

    while !cursor.is_empty() {
        let key = cursor.read_key()?;

        if key.number == IV_CONTAINER_FIELD && key.wire_type == wire::WireType::LengthDelimited {
            let nested = cursor.read_bytes()?;
            if let Some(iv) = wire::find_bytes_field(nested, IV_FIELD, |v| v.len() == IV_LEN)? {
                let mut out = [0u8; IV_LEN];
                out.copy_from_slice(iv);
                return Ok(Some(out));
            }
            continue;
        }

        cursor.skip(key.wire_type)?;
    }

    Ok(None)
}

fn read_recovery_iv(data: &[u8]) -> Result<[u8; IV_LEN], CryptError> {
    let end = RECOVERY_IV_OFFSET + IV_LEN;
    let bytes = data
        .get(RECOVERY_IV_OFFSET..end)
        .ok_or(CryptError::TruncatedContainer {
            needed: end,
            actual: data.len(),
        })?;

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(bytes);
    Ok(iv)
}
