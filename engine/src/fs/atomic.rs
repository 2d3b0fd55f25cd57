//! 原子写出解密结果。
//!
//! 先写入同目录下的临时文件，完整写入并落盘后再 rename 到目标路径；
//! 解码或写入中途失败时，目标路径上不会留下被截断的数据库文件。

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 原子写文件。
///
/// 目标已存在时会被替换。
pub fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(parent, target);

    let result = File::create(&partial).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });

    if let Err(err) = result {
        let _ = fs::remove_file(&partial);
        return Err(err);
    }

    if let Err(err) = fs::rename(&partial, target) {
        let _ = fs::remove_file(&partial);
        return Err(err);
    }

    Ok(())
}

fn partial_path(parent: &Path, target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("backup");

    let counter = PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed);

    parent.join(format!(".{name}.partial-{}-{counter}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_replaces_target() {
        let dir = tempdir().expect("create temp dir");
        let target = dir.path().join("nested/msgstore.db");

        write_atomic(&target, b"first").expect("first write");
        write_atomic(&target, b"second").expect("second write");

        assert_eq!(fs::read(&target).expect("read"), b"second");

        // 不残留临时文件
        let leftovers: Vec<_> = fs::read_dir(target.parent().expect("parent"))
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".partial-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_write_leaves_no_target() {
        let dir = tempdir().expect("create temp dir");
        // 目标本身是目录，rename 必然失败
        let target = dir.path().join("occupied");
        fs::create_dir_all(target.join("child")).expect("create dir");

        assert!(write_atomic(&target, b"data").is_err());
        assert!(target.is_dir());
    }
}
