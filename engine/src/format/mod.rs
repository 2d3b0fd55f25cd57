//! 容器格式识别
//!
//! 三种已知格式：
//! - crypt12：旧格式，固定偏移，密文尾部带 20 字节 footer
//! - crypt14：旧格式，固定偏移，密文直到文件末尾
//! - crypt15：新格式，长度前缀的结构化 Header + 派生密钥 + 强制认证
//!
//! 识别以文件名后缀为准；内容嗅探目前不启用（见 [`sniff_content`]）。

pub mod container;
pub mod header;
pub mod layout;
pub mod wire;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// 已知的容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    Crypt12,
    Crypt14,
    Crypt15,
}

impl ContainerFormat {
    pub const ALL: [ContainerFormat; 3] = [Self::Crypt12, Self::Crypt14, Self::Crypt15];

    /// 文件后缀（不含点）
    pub fn extension(self) -> &'static str {
        match self {
            Self::Crypt12 => "crypt12",
            Self::Crypt14 => "crypt14",
            Self::Crypt15 => "crypt15",
        }
    }

    /// 是否为需要派生密钥、强制认证的新格式
    pub fn is_modern(self) -> bool {
        matches!(self, Self::Crypt15)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ContainerFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('.');
        Self::from_extension(s)
            .ok_or_else(|| format!("unknown container format `{s}` (expected crypt12, crypt14 or crypt15)"))
    }
}

/// 根据文件名与（可选的）文件头部字节识别容器格式
///
/// 返回 `None` 表示“无法识别”，这是正常结果而非错误：
/// 调用方不应继续解密（例如该文件本身未加密）。
pub fn classify(filename: Option<&str>, leading: Option<&[u8]>) -> Option<ContainerFormat> {
    if let Some(format) = filename.and_then(classify_filename) {
        return Some(format);
    }

    leading.and_then(sniff_content)
}

/// 仅按后缀识别，大小写不敏感
pub fn classify_filename(filename: &str) -> Option<ContainerFormat> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ContainerFormat::from_extension)
}

/// 内容嗅探策略：始终返回 `None`
///
/// 三种格式都没有可靠的魔数，按字节猜测只会把未加密文件误判为密文。
/// 在没有确定性判据之前，识别完全依赖文件名。
pub fn sniff_content(_leading: &[u8]) -> Option<ContainerFormat> {
    None
}
