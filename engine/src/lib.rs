mod decrypt;
mod folder;
mod inflate;

pub mod crypto;
pub mod error;
pub mod format;
pub mod fs;
pub mod task;

pub use decrypt::{DecodeRequest, Progress};
pub use error::CryptError;
pub use folder::FolderReport;
pub use format::{ContainerFormat, classify};
pub use inflate::inflate_zlib;
pub use task::{DecodeHandle, spawn_decode};

use std::path::Path;

/// 在当前线程上解码内存中的容器
pub fn decrypt_bytes(
    container: Vec<u8>,
    filename: Option<&str>,
    key_material: &[u8],
) -> Result<Vec<u8>, CryptError> {
    let mut request = DecodeRequest::new(container, key_material.to_vec());
    request.filename = filename.map(str::to_owned);
    decrypt::decode(request, |_| {})
}

/// 执行解码请求，并把阶段进度交给回调
pub fn decode<P>(request: DecodeRequest, progress: P) -> Result<Vec<u8>, CryptError>
where
    P: FnMut(Progress),
{
    decrypt::decode(request, progress)
}

pub fn decrypt_file(
    input: &Path,
    output: &Path,
    key_material: &[u8],
    format: Option<ContainerFormat>,
) -> Result<(), CryptError> {
    decrypt::decrypt_file(input, output, key_material, format)
}

pub fn decrypt_folder(
    input: &Path,
    output: &Path,
    key_material: &[u8],
) -> Result<FolderReport, CryptError> {
    folder::decrypt_folder(input, output, key_material)
}
