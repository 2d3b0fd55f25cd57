//! 目录批量解密
//!
//! 设计要点：
//! - 递归遍历目录，保持相对路径结构。
//! - 只处理后缀可识别的容器（.crypt12 / .crypt14 / .crypt15），其余文件跳过。
//! - 输出文件名去掉加密后缀，例如 `msgstore.db.crypt15` -> `msgstore.db`。
//! - 严格校验相对路径组件，防止路径穿越写出到目标目录之外。
//! - 任一文件失败即中止，返回该文件的错误。

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::decrypt::decrypt_file;
use crate::error::CryptError;
use crate::format::classify_filename;

/// 批量解密结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FolderReport {
    /// (输入文件, 输出文件)
    pub decoded: Vec<(PathBuf, PathBuf)>,
    /// 无法识别格式而跳过的文件
    pub skipped: Vec<PathBuf>,
}

/// 将目录中的备份容器逐个解密到目标目录。
pub fn decrypt_folder(
    input_path: &Path,
    output_path: &Path,
    key_material: &[u8],
) -> Result<FolderReport, CryptError> {
    if !input_path.is_dir() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "input path is not a directory").into());
    }

    std::fs::create_dir_all(output_path)?;

    let mut report = FolderReport::default();

    for entry in WalkDir::new(input_path).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(walkdir_to_io)?;
        let source_path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        let rel = source_path.strip_prefix(input_path).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("cannot compute relative path: {e}"))
        })?;
        let safe_rel = validate_relative_path(rel)?;

        let name = source_path.file_name().and_then(|n| n.to_str());
        if name.and_then(classify_filename).is_none() {
            debug!(path = %source_path.display(), "skipping non-container file");
            report.skipped.push(source_path.to_path_buf());
            continue;
        }

        let target_rel = strip_container_extension(&safe_rel)?;
        let target_path = safe_join(output_path, &target_rel)?;

        decrypt_file(source_path, &target_path, key_material, None)?;

        info!(from = %source_path.display(), to = %target_path.display(), "decrypted");
        report.decoded.push((source_path.to_path_buf(), target_path));
    }

    Ok(report)
}

/// 去掉 `.cryptNN` 后缀
fn strip_container_extension(rel_path: &Path) -> io::Result<PathBuf> {
    let origin_name = rel_path
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "empty file name after removing extension")
        })?;

    let mut out = rel_path.to_path_buf();
    out.set_file_name(origin_name);
    Ok(out)
}

/// 校验相对路径仅包含安全组件，防止 `..`、绝对路径、盘符路径等穿越问题。
fn validate_relative_path(rel: &Path) -> io::Result<PathBuf> {
    let mut safe = PathBuf::new();
    for comp in rel.components() {
        match comp {
            Component::CurDir => {}
            Component::Normal(v) => safe.push(v),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unsafe path component in {rel:?}"),
                ));
            }
        }
    }
    Ok(safe)
}

/// 在目标根目录下拼接已校验的相对路径，并再次校验结果不越界。
fn safe_join(root: &Path, rel: &Path) -> io::Result<PathBuf> {
    let joined = root.join(rel);
    if !joined.starts_with(root) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("target path escapes output directory: {joined:?}"),
        ));
    }
    Ok(joined)
}

fn walkdir_to_io(err: walkdir::Error) -> io::Error {
    io::Error::other(err.to_string())
}
