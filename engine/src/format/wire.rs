//! crypt15 Header 使用的长度前缀二进制编码（protobuf wire format）最小读取器
//!
//! 只实现定位 IV 所需的部分：
//! - 读取 tag（field_number << 3 | wire_type）与 varint
//! - 按 wire type 跳过不关心的字段
//! - 取出 length-delimited 字段的原始字节
//!
//! 每一次读取都做边界检查，越界一律返回 [`WireError`]，不会 panic。

use std::fmt;

/// varint 最多 10 字节（64 bit）
const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// 读取越过了缓冲区末尾
    UnexpectedEnd,
    /// varint 超过 10 字节
    VarintOverflow,
    /// group（3/4）或保留的 wire type
    UnsupportedWireType(u8),
    /// field number 为 0
    InvalidFieldNumber,
}

impl WireError {
    pub fn describe(self) -> &'static str {
        match self {
            Self::UnexpectedEnd => "field runs past end of header",
            Self::VarintOverflow => "varint longer than 10 bytes",
            Self::UnsupportedWireType(_) => "unsupported wire type",
            Self::InvalidFieldNumber => "field number 0",
        }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// 字段头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey {
    pub number: u64,
    pub wire_type: WireType,
}

/// 字节切片上的只读游标
#[derive(Debug, Clone)]
pub struct WireCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let mut value: u64 = 0;

        for i in 0..MAX_VARINT_LEN {
            let byte = *self.buf.get(self.pos).ok_or(WireError::UnexpectedEnd)?;
            self.pos += 1;

            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(WireError::VarintOverflow)
    }

    pub fn read_key(&mut self) -> Result<FieldKey, WireError> {
        let raw = self.read_varint()?;
        let wire_type = WireType::from_u64(raw & 0x07)
            .ok_or(WireError::UnsupportedWireType((raw & 0x07) as u8))?;
        let number = raw >> 3;
        if number == 0 {
            return Err(WireError::InvalidFieldNumber);
        }

        Ok(FieldKey { number, wire_type })
    }

    /// 读取 length-delimited 字段的内容（长度前缀之后的字节）
    pub fn read_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| WireError::UnexpectedEnd)?;
        self.take(len)
    }

    /// 跳过一个值（字段头已读取）
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), WireError> {
        match wire_type {
            WireType::Varint => self.read_varint().map(|_| ()),
            WireType::Fixed64 => self.take(8).map(|_| ()),
            WireType::Fixed32 => self.take(4).map(|_| ()),
            WireType::LengthDelimited => self.read_bytes().map(|_| ()),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(len).ok_or(WireError::UnexpectedEnd)?;
        let bytes = self.buf.get(self.pos..end).ok_or(WireError::UnexpectedEnd)?;
        self.pos = end;
        Ok(bytes)
    }
}

/// 在一层消息中查找第一个 `number` 号、length-delimited 且满足 `accept` 的字段
///
/// 其余字段（包括同号但类型不符的）一律跳过。
pub fn find_bytes_field<'a>(
    message: &'a [u8],
    number: u64,
    mut accept: impl FnMut(&'a [u8]) -> bool,
) -> Result<Option<&'a [u8]>, WireError> {
    let mut cursor = WireCursor::new(message);

    while !cursor.is_empty() {
        let key = cursor.read_key()?;

        if key.number == number && key.wire_type == WireType::LengthDelimited {
            let value = cursor.read_bytes()?;
            if accept(value) {
                return Ok(Some(value));
            }
            continue;
        }

        cursor.skip(key.wire_type)?;
    }

    Ok(None)
}
