//! 容器几何解析：IV、密文区间、认证标签
//!
//! 只计算偏移，不复制密文；解密阶段按区间从原缓冲区中取数据。

use std::ops::Range;

use crate::error::CryptError;
use crate::format::ContainerFormat;
use crate::format::header::{ModernHeader, TAG_LEN, TRAILER_LEN};
use crate::format::layout::{FormatLayout, IV_LEN};

/// 某个具体容器文件的几何信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContainer {
    pub format: ContainerFormat,
    pub iv: [u8; IV_LEN],
    pub ciphertext: Range<usize>,
    /// 仅 crypt15 存在
    pub tag: Option<[u8; TAG_LEN]>,
    /// 仅 crypt15 存在
    pub header: Option<ModernHeader>,
}

impl ParsedContainer {
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// 按已识别的格式解析容器
pub fn parse(data: &[u8], format: ContainerFormat) -> Result<ParsedContainer, CryptError> {
    if let Some(layout) = FormatLayout::for_format(format) {
        let (iv, ciphertext) = layout.locate(data)?;
        return Ok(ParsedContainer {
            format,
            iv,
            ciphertext,
            tag: None,
            header: None,
        });
    }

    parse_modern(data)
}

fn parse_modern(data: &[u8]) -> Result<ParsedContainer, CryptError> {
    let header = ModernHeader::read(data)?;

    let start = header.payload_start();
    let needed = start + TRAILER_LEN;
    if data.len() < needed {
        return Err(CryptError::TruncatedContainer {
            needed,
            actual: data.len(),
        });
    }

    let end = data.len() - TRAILER_LEN;

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&data[data.len() - TAG_LEN..]);

    Ok(ParsedContainer {
        format: ContainerFormat::Crypt15,
        iv: header.iv,
        ciphertext: start..end,
        tag: Some(tag),
        header: Some(header),
    })
}
