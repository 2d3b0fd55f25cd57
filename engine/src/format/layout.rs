//! 旧格式（crypt12 / crypt14）的固定偏移布局
//!
//! crypt12:
//!
//! ```text
//! 0        51        67                      len-20     len
//! | header | IV (16) | ciphertext ...        | footer   |
//! ```
//!
//! crypt14:
//!
//! ```text
//! 0        67        83         191                     len
//! | header | IV (16) | header   | ciphertext ...        |
//! ```
//!
//! footer 中的 MAC 不参与本实现的解密调用。

use std::ops::Range;

use crate::error::CryptError;
use crate::format::ContainerFormat;

/// IV 长度，所有格式一致
pub const IV_LEN: usize = 16;

/// 旧格式的固定几何参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatLayout {
    pub iv_offset: usize,
    pub iv_length: usize,
    pub ciphertext_start: usize,
    /// 密文之后不参与解密的尾部字节数
    pub trailer_len: usize,
}

pub const CRYPT12_LAYOUT: FormatLayout = FormatLayout {
    iv_offset: 51,
    iv_length: IV_LEN,
    ciphertext_start: 67,
    trailer_len: 20,
};

pub const CRYPT14_LAYOUT: FormatLayout = FormatLayout {
    iv_offset: 67,
    iv_length: IV_LEN,
    ciphertext_start: 191,
    trailer_len: 0,
};

impl FormatLayout {
    /// 旧格式对应的布局；crypt15 没有固定布局
    pub fn for_format(format: ContainerFormat) -> Option<&'static FormatLayout> {
        match format {
            ContainerFormat::Crypt12 => Some(&CRYPT12_LAYOUT),
            ContainerFormat::Crypt14 => Some(&CRYPT14_LAYOUT),
            ContainerFormat::Crypt15 => None,
        }
    }

    /// 合法容器的最小长度
    pub fn min_len(&self) -> usize {
        (self.iv_offset + self.iv_length).max(self.ciphertext_start + self.trailer_len)
    }

    /// 切出 IV 与密文区间
    pub fn locate(&self, data: &[u8]) -> Result<([u8; IV_LEN], Range<usize>), CryptError> {
        let needed = self.min_len();
        if data.len() < needed {
            return Err(CryptError::TruncatedContainer {
                needed,
                actual: data.len(),
            });
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&data[self.iv_offset..self.iv_offset + self.iv_length]);

        let ciphertext = self.ciphertext_start..data.len() - self.trailer_len;

        Ok((iv, ciphertext))
    }
}
