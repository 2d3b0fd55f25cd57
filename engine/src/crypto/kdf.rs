//! crypt15 密钥派生
//!
//! 根密钥不直接用于加密，而是经过两次 HMAC-SHA256：
//!
//! ```text
//! intermediate = HMAC(key = 32 个 0x00, msg = root_key)
//! derived      = HMAC(key = intermediate, msg = "backup encryption" || 0x01)
//! ```
//!
//! 即以全零为 salt、label 为 info、只取第一块输出的 HKDF 展开。
//! 这里按字面实现两步 HMAC，必须逐位一致。

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::key::{KEY_LEN, KeyMaterial};

type HmacSha256 = Hmac<Sha256>;

/// 第二步 HMAC 的消息前缀
pub const BACKUP_ENCRYPTION_LABEL: &[u8] = b"backup encryption";

/// 派生出的 AES-256 密钥
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// 从根密钥派生 crypt15 的解密密钥
pub fn derive_backup_key(root: &KeyMaterial) -> DerivedKey {
    let intermediate = hmac_sha256(&[0u8; KEY_LEN], &[&root.as_bytes()[..]]);
    let derived = hmac_sha256(&intermediate[..], &[BACKUP_ENCRYPTION_LABEL, &[0x01u8][..]]);

    DerivedKey(derived)
}

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Zeroizing<[u8; KEY_LEN]> {
    // HMAC 接受任意长度的密钥，这里不会失败
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC 接受任意长度密钥");
    for part in parts {
        mac.update(part);
    }

    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}
