//! 密码学相关：密钥规范化、密钥派生、AES-256-GCM 解密

pub mod aead;
pub mod kdf;
pub mod key;

pub use kdf::{DerivedKey, derive_backup_key};
pub use key::{KEY_LEN, KeyEncoding, KeyMaterial};
