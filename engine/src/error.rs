//! 解码流水线的统一错误类型
//!
//! 每个阶段失败即返回，不做重试；编排层原样转发第一个错误。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("unrecognized container format")]
    UnrecognizedContainerFormat,

    #[error("unrecognized key format")]
    UnrecognizedKeyFormat,

    #[error("key material too short ({len} bytes, need 32)")]
    KeyTooShort { len: usize },

    #[error("container truncated: need at least {needed} bytes, got {actual}")]
    TruncatedContainer { needed: usize, actual: usize },

    #[error("malformed container header: {0}")]
    MalformedHeader(&'static str),

    #[error("authentication failed: wrong key or corrupted container")]
    AuthenticationFailed,

    #[error("decompression failed")]
    DecompressionFailed,

    #[error("internal error")]
    Internal,
}

impl CryptError {
    /// 是否可能由错误的密钥导致
    ///
    /// 调用方据此决定是否提示用户重新输入密钥，而不是重新选择文件。
    pub fn is_key_related(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedKeyFormat
                | Self::KeyTooShort { .. }
                | Self::AuthenticationFailed
                | Self::DecompressionFailed
        )
    }
}
