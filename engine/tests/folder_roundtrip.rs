//! 目录批量解密测试

mod common;

use std::fs;

use backupcrypt::CryptError;
use common::*;
use tempfile::tempdir;

#[test]
fn decrypt_folder_preserves_structure() {
    let temp = tempdir().expect("create temp dir");
    let input_dir = temp.path().join("backups");
    let output_dir = temp.path().join("decrypted");

    fs::create_dir_all(input_dir.join("Databases/old")).expect("create input dir");

    let db = sample_database();
    fs::write(
        input_dir.join("Databases/msgstore.db.crypt15"),
        build_crypt15(&ROOT_KEY, &IV, &zlib(&db), true, false),
    )
    .expect("write crypt15");
    fs::write(
        input_dir.join("Databases/old/msgstore-2023.db.crypt12"),
        build_crypt12(&ROOT_KEY, &IV, &zlib(b"older backup")),
    )
    .expect("write crypt12");
    fs::write(input_dir.join("Databases/notes.txt"), b"not a backup").expect("write txt");

    let report =
        backupcrypt::decrypt_folder(&input_dir, &output_dir, &ROOT_KEY).expect("decrypt folder");

    assert_eq!(report.decoded.len(), 2);
    assert_eq!(report.skipped.len(), 1);

    assert_eq!(
        fs::read(output_dir.join("Databases/msgstore.db")).expect("read crypt15 output"),
        db
    );
    assert_eq!(
        fs::read(output_dir.join("Databases/old/msgstore-2023.db")).expect("read crypt12 output"),
        b"older backup"
    );
    assert!(!output_dir.join("Databases/notes.txt").exists());
}

#[test]
fn decrypt_folder_with_wrong_key_fails() {
    let temp = tempdir().expect("create temp dir");
    let input_dir = temp.path().join("backups");
    let output_dir = temp.path().join("decrypted");

    fs::create_dir_all(&input_dir).expect("create input dir");
    fs::write(
        input_dir.join("msgstore.db.crypt15"),
        build_crypt15(&ROOT_KEY, &IV, &zlib(b"secret"), true, false),
    )
    .expect("write crypt15");

    let result = backupcrypt::decrypt_folder(&input_dir, &output_dir, &[0x77; 32]);
    assert!(matches!(result, Err(CryptError::AuthenticationFailed)));

    // 失败时不留下输出文件
    assert!(!output_dir.join("msgstore.db").exists());
}

#[test]
fn decrypt_file_reads_key_file_formats() {
    let temp = tempdir().expect("create temp dir");
    let input = temp.path().join("msgstore.db.crypt14");
    let output = temp.path().join("out/msgstore.db");

    fs::write(&input, build_crypt14(&ROOT_KEY, &IV, &zlib(b"from file"))).expect("write input");

    // 158 字节 keystore 导出格式
    let mut key_file = vec![0u8; 158];
    key_file[126..].copy_from_slice(&ROOT_KEY);

    backupcrypt::decrypt_file(&input, &output, &key_file, None).expect("decrypt file");
    assert_eq!(fs::read(&output).expect("read output"), b"from file");
}

#[test]
fn decrypt_folder_rejects_file_input() {
    let temp = tempdir().expect("create temp dir");
    let file = temp.path().join("a.crypt15");
    fs::write(&file, b"x").expect("write");

    let result = backupcrypt::decrypt_folder(&file, &temp.path().join("out"), &ROOT_KEY);
    assert!(matches!(result, Err(CryptError::Io(_))));
}
