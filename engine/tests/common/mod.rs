//! 测试用容器构造：用 aes-gcm 加密、flate2 压缩，按各格式布局拼装

#![allow(dead_code)]

use std::io::Write;

use aes_gcm::{
    AesGcm, Nonce,
    aead::{AeadInPlace, KeyInit, consts::U16},
    aes::Aes256,
};
use backupcrypt::crypto::{KeyMaterial, derive_backup_key};
use flate2::Compression;
use flate2::write::ZlibEncoder;

pub const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";

pub const ROOT_KEY: [u8; 32] = [
    0x3c, 0x91, 0x5e, 0x07, 0xa2, 0x44, 0x19, 0xd8, 0x6f, 0x10, 0xbb, 0x2e, 0x73, 0xc5, 0x08, 0x9a,
    0x51, 0xe4, 0x27, 0x6d, 0x90, 0x1f, 0xca, 0x36, 0x82, 0x4b, 0xf0, 0x15, 0x6a, 0xd3, 0x29, 0x7e,
];

pub const IV: [u8; 16] = [
    0xa0, 0xa1, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xab, 0xac, 0xad, 0xae, 0xaf,
];

/// 一个形似 SQLite 文件的明文
pub fn sample_database() -> Vec<u8> {
    let mut db = SQLITE_MAGIC.to_vec();
    db.extend_from_slice(&[0x10, 0x00, 0x01, 0x01, 0x00, 0x40, 0x20, 0x20]);
    for i in 0..4096u32 {
        db.extend_from_slice(format!("message {i} hello world;").as_bytes());
    }
    db
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("compress");
    encoder.finish().expect("finish")
}

/// AES-256-GCM（16 字节 IV），返回 (密文, 标签)
pub fn seal(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> (Vec<u8>, [u8; 16]) {
    let cipher = AesGcm::<Aes256, U16>::new_from_slice(key).expect("cipher");
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(iv), b"", &mut buffer)
        .expect("encrypt");

    let mut tag_bytes = [0u8; 16];
    tag_bytes.copy_from_slice(&tag);
    (buffer, tag_bytes)
}

/// crypt12：IV 位于 51，密文从 67 开始，尾部 20 字节 footer（标签 + 4 字节）
pub fn build_crypt12(key: &[u8; 32], iv: &[u8; 16], payload: &[u8]) -> Vec<u8> {
    let (ciphertext, tag) = seal(key, iv, payload);

    let mut data = vec![0x5a; 51];
    data.extend_from_slice(iv);
    data.extend_from_slice(&ciphertext);
    data.extend_from_slice(&tag);
    data.extend_from_slice(&[0xf0, 0x0d, 0xca, 0xfe]);
    data
}

/// crypt14：IV 位于 67，密文从 191 开始直到末尾（标签附在末尾）
pub fn build_crypt14(key: &[u8; 32], iv: &[u8; 16], payload: &[u8]) -> Vec<u8> {
    let (ciphertext, tag) = seal(key, iv, payload);

    let mut data = vec![0x6b; 67];
    data.extend_from_slice(iv);
    data.resize(191, 0x00);
    data.extend_from_slice(&ciphertext);
    data.extend_from_slice(&tag);
    data
}

/// crypt15 header body：可选的未知字段 + field 3 { field 1: IV }
pub fn crypt15_header(iv: &[u8; 16], with_unknown_fields: bool) -> Vec<u8> {
    let mut body = Vec::new();
    if with_unknown_fields {
        body.extend_from_slice(&[0x08, 0x02]); // field 1 varint
        body.extend_from_slice(&[0x12, 0x04, b'2', b'.', b'2', b'3']); // field 2 bytes
        body.extend_from_slice(&[0x25, 0x01, 0x02, 0x03, 0x04]); // field 4 fixed32
    }
    body.extend_from_slice(&[0x1a, 18, 0x0a, 16]);
    body.extend_from_slice(iv);
    body
}

/// crypt15：[L][flag?][header][密文][16 字节未用][标签]
pub fn build_crypt15(
    root_key: &[u8; 32],
    iv: &[u8; 16],
    payload: &[u8],
    feature_flag: bool,
    with_unknown_fields: bool,
) -> Vec<u8> {
    let root = KeyMaterial::normalize(root_key).expect("root key");
    let derived = derive_backup_key(&root);
    let (ciphertext, tag) = seal(derived.as_bytes(), iv, payload);

    let header = crypt15_header(iv, with_unknown_fields);

    let mut data = vec![header.len() as u8];
    if feature_flag {
        data.push(0x01);
    }
    data.extend_from_slice(&header);
    data.extend_from_slice(&ciphertext);
    data.extend_from_slice(&[0x00; 16]);
    data.extend_from_slice(&tag);
    data
}
