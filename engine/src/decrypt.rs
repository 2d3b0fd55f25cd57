//! 备份解密流程实现
//!
//! 解密流程（严格顺序）：
//! 1. 识别容器格式
//! 2. 规范化密钥材料；crypt15 再派生实际密钥
//! 3. 解析容器几何（IV / 密文区间 / 标签）
//! 4. AES-256-GCM 解密
//! 5. zlib 解压
//!
//! 注意：
//! - 任一阶段失败立即返回，不重试，不输出部分结果
//! - 各阶段依次消费上一阶段的完整输出，没有流式重叠
//! - 本模块不感知线程；后台执行见 [`crate::task`]

use std::fmt;
use std::path::Path;

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{DerivedKey, KEY_LEN, KeyMaterial, aead, derive_backup_key};
use crate::error::CryptError;
use crate::format::container::parse as parse_container;
use crate::format::{self, ContainerFormat};
use crate::fs::atomic::write_atomic;
use crate::inflate::inflate_payload;

/// 阶段进度通知
///
/// 仅用于展示，丢失不影响结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    DerivingKey,
    HeaderParsed,
    Decrypting,
    Decompressing,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DerivingKey => "Deriving key...",
            Self::HeaderParsed => "Header parsed",
            Self::Decrypting => "Decrypting...",
            Self::Decompressing => "Decompressing...",
        })
    }
}

/// 一次解码请求，持有全部输入缓冲区
#[derive(Clone, Default)]
pub struct DecodeRequest {
    pub container: Vec<u8>,
    pub filename: Option<String>,
    pub key_material: Vec<u8>,
    /// 指定后忽略文件名识别
    pub format_override: Option<ContainerFormat>,
}

impl DecodeRequest {
    pub fn new(container: Vec<u8>, key_material: Vec<u8>) -> Self {
        Self {
            container,
            key_material,
            ..Self::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_format(mut self, format: ContainerFormat) -> Self {
        self.format_override = Some(format);
        self
    }

    /// 最终采用的容器格式；无法识别返回 `None`
    pub fn resolve_format(&self) -> Option<ContainerFormat> {
        self.format_override.or_else(|| {
            format::classify(self.filename.as_deref(), Some(self.container.as_slice()))
        })
    }
}

impl fmt::Debug for DecodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeRequest")
            .field("container_len", &self.container.len())
            .field("filename", &self.filename)
            .field("key_material_len", &self.key_material.len())
            .field("format_override", &self.format_override)
            .finish()
    }
}

/// 实际用于 AES 的密钥：旧格式直接用根密钥，crypt15 用派生密钥
enum CipherKey {
    Root(KeyMaterial),
    Derived(DerivedKey),
}

impl CipherKey {
    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        match self {
            Self::Root(key) => key.as_bytes(),
            Self::Derived(key) => key.as_bytes(),
        }
    }
}

/// 执行完整解码流程
///
/// 请求按值传入：密文在原缓冲区上就地截取，不额外复制整个容器。
pub fn decode<P>(request: DecodeRequest, mut progress: P) -> Result<Vec<u8>, CryptError>
where
    P: FnMut(Progress),
{
    let format = request
        .resolve_format()
        .ok_or(CryptError::UnrecognizedContainerFormat)?;

    let DecodeRequest {
        mut container,
        key_material,
        ..
    } = request;

    let key_material = Zeroizing::new(key_material);

    info!(%format, len = container.len(), "decoding container");

    // ---------- 密钥 ----------
    progress(Progress::DerivingKey);
    let root_key = KeyMaterial::normalize(&key_material)?;
    drop(key_material);

    let key = if format.is_modern() {
        CipherKey::Derived(derive_backup_key(&root_key))
    } else {
        CipherKey::Root(root_key)
    };

    // ---------- 解析容器 ----------
    let parsed = parse_container(&container, format)?;
    progress(Progress::HeaderParsed);
    debug!(
        ciphertext = ?parsed.ciphertext,
        has_tag = parsed.tag.is_some(),
        "container geometry"
    );

    // 原地截出密文区间
    container.truncate(parsed.ciphertext.end);
    container.drain(..parsed.ciphertext.start);
    let ciphertext = container;

    // ---------- 解密 ----------
    progress(Progress::Decrypting);
    let plaintext = match parsed.tag {
        Some(tag) => aead::decrypt_authenticated(key.as_bytes(), &parsed.iv, &tag, ciphertext)?,
        None => aead::decrypt_unverified(key.as_bytes(), &parsed.iv, ciphertext)?,
    };
    drop(key);

    // ---------- 解压 ----------
    progress(Progress::Decompressing);
    let output = inflate_payload(plaintext, format)?;

    info!(%format, len = output.len(), "container decoded");
    Ok(output)
}

/// 解密单个容器文件并原子写出结果
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    key_material: &[u8],
    format_override: Option<ContainerFormat>,
) -> Result<(), CryptError> {
    // ---------- 读取输入 ----------
    let container = std::fs::read(input_path)?;

    let mut request = DecodeRequest::new(container, key_material.to_vec());
    request.filename = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned);
    request.format_override = format_override;

    // ---------- 解码 ----------
    let output = decode(request, |p| debug!(path = %input_path.display(), "{p}"))?;

    // ---------- 原子写出 ----------
    write_atomic(output_path, &output)?;

    Ok(())
}
