//! AES-256-GCM 解密（16 字节 IV，128 bit 标签）
//!
//! - crypt15：标签单独给出，必须校验；校验失败不输出任何明文
//! - crypt12 / crypt14：标签混在密文尾部或 footer 中，这里不做校验，
//!   直接还原密文部分。旧格式只能得到这种较弱的保证，
//!   错误密钥会在解压阶段或上层打开数据库时才暴露

use aes_gcm::{
    AesGcm, Nonce, Tag,
    aead::{AeadInPlace, KeyInit, consts::U16},
    aes::Aes256,
};
use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::key::KEY_LEN;
use crate::error::CryptError;
use crate::format::header::TAG_LEN;
use crate::format::layout::IV_LEN;

/// 使用 16 字节 nonce 的 AES-256-GCM
type Aes256Gcm16 = AesGcm<Aes256, U16>;

fn cipher(key: &[u8; KEY_LEN]) -> Result<Aes256Gcm16, CryptError> {
    Aes256Gcm16::new_from_slice(key).map_err(|_| CryptError::Internal)
}

/// crypt15：带认证的解密
///
/// `buffer` 输入为密文，成功时原地变为明文。
/// 失败时缓冲区中可能已写入未经认证的明文，这里先清零再丢弃。
pub fn decrypt_authenticated(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    tag: &[u8; TAG_LEN],
    mut buffer: Vec<u8>,
) -> Result<Vec<u8>, CryptError> {
    let cipher = cipher(key)?;

    match cipher.decrypt_in_place_detached(
        Nonce::<U16>::from_slice(iv),
        b"",
        &mut buffer,
        Tag::from_slice(tag),
    ) {
        Ok(()) => Ok(buffer),
        Err(_) => {
            buffer.zeroize();
            Err(CryptError::AuthenticationFailed)
        }
    }
}

/// crypt12 / crypt14：不校验标签的解密
///
/// GCM 的数据部分就是从 inc32(J0) 开始的 CTR 模式，加密与解密是同一个异或操作；
/// 因此对密文做一次 GCM 加密即得到明文，附带算出的标签直接丢弃。
pub fn decrypt_unverified(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    mut buffer: Vec<u8>,
) -> Result<Vec<u8>, CryptError> {
    let cipher = cipher(key)?;

    cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(iv), b"", &mut buffer)
        .map_err(|_| {
            debug!(len = buffer.len(), "legacy ciphertext exceeds GCM length limit");
            CryptError::Internal
        })?;

    Ok(buffer)
}
