//! 密钥材料规范化
//!
//! 用户提供的 key 文件形态不固定，这里把它统一还原为 32 字节原始密钥。
//! 依次尝试以下形态，首个命中即返回：
//!
//! 1. 恰好 32 字节：原样使用
//! 2. 恰好 158 字节：keystore 导出格式，密钥位于偏移 126
//! 3. 文本形式的 64 位十六进制串
//! 4. Java 序列化对象（魔数 `AC ED 00 05`）：
//!    - 恰好 59 字节：密钥位于偏移 27
//!    - 否则查找长度前缀 `00 00 00 20`，取其后 32 字节
//!    - 仍找不到则取最后 32 字节
//!
//! 后面的规则默认前面的规则都未命中，顺序不可调整。
//!
//! 第 3、4 类是启发式判断，可能把少见的输入识别错；
//! 此时得到的是一把错误的密钥，会在后续认证/解压阶段失败，而不会 panic。

use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::CryptError;

/// 原始对称密钥长度
pub const KEY_LEN: usize = 32;

/// keystore 导出文件长度与密钥偏移
pub const KEYSTORE_EXPORT_LEN: usize = 158;
pub const KEYSTORE_KEY_OFFSET: usize = 126;

/// 十六进制文本长度
pub const HEX_KEY_LEN: usize = KEY_LEN * 2;

/// Java 序列化流魔数
pub const SERIALIZED_MAGIC: [u8; 4] = [0xac, 0xed, 0x00, 0x05];

/// 常见的紧凑序列化布局
pub const SERIALIZED_COMPACT_LEN: usize = 59;
pub const SERIALIZED_COMPACT_KEY_OFFSET: usize = 27;

/// 32 字节字段的长度前缀（大端 u32 = 32）
const LENGTH_PREFIX_MARKER: [u8; 4] = [0, 0, 0, KEY_LEN as u8];

/// 命中的密钥材料形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    Raw,
    KeystoreExport,
    Hex,
    SerializedCompact,
    SerializedLengthPrefixed,
    SerializedTail,
}

/// 规范化后的 32 字节根密钥
///
/// 离开作用域时自动清零。
pub struct KeyMaterial {
    bytes: Zeroizing<[u8; KEY_LEN]>,
    encoding: KeyEncoding,
}

impl KeyMaterial {
    /// 从任意形态的密钥材料中还原根密钥
    pub fn normalize(material: &[u8]) -> Result<Self, CryptError> {
        for matcher in MATCHERS {
            if let Some(key) = matcher(material) {
                debug!(encoding = ?key.encoding, input_len = material.len(), "normalized key material");
                return Ok(key);
            }
        }

        if material.len() < KEY_LEN {
            return Err(CryptError::KeyTooShort {
                len: material.len(),
            });
        }

        Err(CryptError::UnrecognizedKeyFormat)
    }

    /// 从 64 位十六进制字符串还原根密钥（大小写不敏感）
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptError> {
        Self::normalize(hex_key.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// 十六进制（小写）表示，仅供调试与测试
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.bytes[..]))
    }

    fn from_slice(bytes: &[u8], encoding: KeyEncoding) -> Option<Self> {
        let bytes: &[u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(Self {
            bytes: Zeroizing::new(*bytes),
            encoding,
        })
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

type Matcher = fn(&[u8]) -> Option<KeyMaterial>;

/// 匹配顺序即优先级
const MATCHERS: [Matcher; 4] = [
    match_raw,
    match_keystore_export,
    match_hex,
    match_serialized,
];

fn match_raw(material: &[u8]) -> Option<KeyMaterial> {
    if material.len() != KEY_LEN {
        return None;
    }

    KeyMaterial::from_slice(material, KeyEncoding::Raw)
}

fn match_keystore_export(material: &[u8]) -> Option<KeyMaterial> {
    if material.len() != KEYSTORE_EXPORT_LEN {
        return None;
    }

    KeyMaterial::from_slice(
        &material[KEYSTORE_KEY_OFFSET..KEYSTORE_KEY_OFFSET + KEY_LEN],
        KeyEncoding::KeystoreExport,
    )
}

fn match_hex(material: &[u8]) -> Option<KeyMaterial> {
    let text = std::str::from_utf8(material).ok()?.trim();
    if text.len() != HEX_KEY_LEN || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    hex::decode_to_slice(text, &mut bytes[..]).ok()?;

    Some(KeyMaterial {
        bytes,
        encoding: KeyEncoding::Hex,
    })
}

fn match_serialized(material: &[u8]) -> Option<KeyMaterial> {
    if !material.starts_with(&SERIALIZED_MAGIC) {
        return None;
    }

    if material.len() == SERIALIZED_COMPACT_LEN {
        return KeyMaterial::from_slice(
            &material[SERIALIZED_COMPACT_KEY_OFFSET..SERIALIZED_COMPACT_KEY_OFFSET + KEY_LEN],
            KeyEncoding::SerializedCompact,
        );
    }

    let prefixed = material
        .windows(LENGTH_PREFIX_MARKER.len())
        .position(|w| w == LENGTH_PREFIX_MARKER)
        .map(|pos| pos + LENGTH_PREFIX_MARKER.len())
        .and_then(|start| material.get(start..start + KEY_LEN));

    if let Some(bytes) = prefixed {
        return KeyMaterial::from_slice(bytes, KeyEncoding::SerializedLengthPrefixed);
    }

    debug!("no length prefix in serialized key, taking trailing 32 bytes");
    let start = material.len().checked_sub(KEY_LEN)?;
    KeyMaterial::from_slice(&material[start..], KeyEncoding::SerializedTail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, b) in key.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(7).wrapping_add(3);
        }
        key
    }

    #[test]
    fn raw_key_is_identity() {
        for seed in [0u8, 0x5a, 0xff] {
            let key = [seed; 32];
            let normalized = KeyMaterial::normalize(&key).expect("normalize");
            assert_eq!(normalized.as_bytes(), &key);
            assert_eq!(normalized.encoding(), KeyEncoding::Raw);
        }
    }

    #[test]
    fn keystore_export_uses_fixed_offset() {
        let mut blob = vec![0xee; KEYSTORE_EXPORT_LEN];
        blob[..4].copy_from_slice(&SERIALIZED_MAGIC);
        blob[126..].copy_from_slice(&sample_key());

        let normalized = KeyMaterial::normalize(&blob).expect("normalize");
        assert_eq!(normalized.as_bytes(), &sample_key());
        assert_eq!(normalized.encoding(), KeyEncoding::KeystoreExport);
    }

    #[test]
    fn hex_key_round_trips_case_insensitively() {
        let upper = hex::encode_upper(sample_key());
        let normalized = KeyMaterial::from_hex(&upper).expect("normalize");

        assert_eq!(normalized.as_bytes(), &sample_key());
        assert_eq!(normalized.to_hex().as_str(), upper.to_ascii_lowercase());
    }

    #[test]
    fn hex_key_tolerates_trailing_newline() {
        let text = format!("{}\n", hex::encode(sample_key()));
        let normalized = KeyMaterial::normalize(text.as_bytes()).expect("normalize");
        assert_eq!(normalized.encoding(), KeyEncoding::Hex);
    }

    #[test]
    fn non_hex_text_of_hex_length_is_rejected() {
        let text = "zz".repeat(32);
        assert!(matches!(
            KeyMaterial::normalize(text.as_bytes()),
            Err(CryptError::UnrecognizedKeyFormat)
        ));
    }

    #[test]
    fn compact_serialized_object() {
        let mut blob = vec![0u8; SERIALIZED_COMPACT_LEN];
        blob[..4].copy_from_slice(&SERIALIZED_MAGIC);
        blob[27..].copy_from_slice(&sample_key());

        let normalized = KeyMaterial::normalize(&blob).expect("normalize");
        assert_eq!(normalized.as_bytes(), &sample_key());
        assert_eq!(normalized.encoding(), KeyEncoding::SerializedCompact);
    }

    #[test]
    fn serialized_object_with_length_prefix() {
        let mut blob = SERIALIZED_MAGIC.to_vec();
        blob.extend_from_slice(&[0x75, 0x72, 0x00, 0x02, 0x5b, 0x42]);
        blob.extend_from_slice(&[0, 0, 0, 32]);
        blob.extend_from_slice(&sample_key());
        blob.extend_from_slice(&[0x78; 9]);

        let normalized = KeyMaterial::normalize(&blob).expect("normalize");
        assert_eq!(normalized.as_bytes(), &sample_key());
        assert_eq!(normalized.encoding(), KeyEncoding::SerializedLengthPrefixed);
    }

    #[test]
    fn serialized_object_falls_back_to_tail() {
        let mut blob = SERIALIZED_MAGIC.to_vec();
        blob.extend_from_slice(&[0x11; 40]);
        blob.extend_from_slice(&sample_key());

        let normalized = KeyMaterial::normalize(&blob).expect("normalize");
        assert_eq!(normalized.as_bytes(), &sample_key());
        assert_eq!(normalized.encoding(), KeyEncoding::SerializedTail);
    }

    #[test]
    fn short_input_is_too_short() {
        assert!(matches!(
            KeyMaterial::normalize(&[1u8; 16]),
            Err(CryptError::KeyTooShort { len: 16 })
        ));

        // 序列化魔数但不足 32 字节
        let mut blob = SERIALIZED_MAGIC.to_vec();
        blob.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            KeyMaterial::normalize(&blob),
            Err(CryptError::KeyTooShort { len: 14 })
        ));
    }

    #[test]
    fn unknown_shape_is_unrecognized() {
        assert!(matches!(
            KeyMaterial::normalize(&[0x42u8; 100]),
            Err(CryptError::UnrecognizedKeyFormat)
        ));
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let normalized = KeyMaterial::normalize(&[0xab; 32]).expect("normalize");
        let printed = format!("{normalized:?}");
        assert!(!printed.contains("171"));
        assert!(printed.contains("Raw"));
    }
}
