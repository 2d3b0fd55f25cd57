//! 解压阶段
//!
//! 解密后的明文是 zlib 流。
//! - crypt15：解压失败即致命错误
//! - crypt12 / crypt14：部分备份未压缩，解压失败时原样返回解密结果

use flate2::{Decompress, FlushDecompress, Status};
use tracing::{debug, warn};

use crate::error::CryptError;
use crate::format::ContainerFormat;

/// 输出缓冲区的最小扩容步长
const GROW_STEP: usize = 64 * 1024;

/// 对解密结果执行解压，按格式决定失败时的处理方式
pub fn inflate_payload(plaintext: Vec<u8>, format: ContainerFormat) -> Result<Vec<u8>, CryptError> {
    match inflate_zlib(&plaintext) {
        Ok(out) => {
            debug!(compressed = plaintext.len(), inflated = out.len(), "inflated payload");
            Ok(out)
        }
        Err(reason) if format.is_modern() => {
            debug!(reason, "inflate failed");
            Err(CryptError::DecompressionFailed)
        }
        Err(reason) => {
            warn!(%format, reason, "payload is not zlib, returning decrypted bytes as-is");
            Ok(plaintext)
        }
    }
}

/// 完整解压一个 zlib 流
///
/// 必须读到流结束标记才算成功，截断的流视为失败。
/// 流结束之后的多余字节（例如旧格式中被一并解密的标签）忽略。
pub fn inflate_zlib(input: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(input.len().saturating_mul(2).max(GROW_STEP));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.len().max(GROW_STEP));
        }

        let consumed = decoder.total_in() as usize;
        let produced = decoder.total_out();
        let rest = input.get(consumed..).unwrap_or_default();

        let status = decoder
            .decompress_vec(rest, &mut out, FlushDecompress::None)
            .map_err(|_| "corrupt zlib stream")?;

        if status == Status::StreamEnd {
            return Ok(out);
        }

        if decoder.total_in() as usize == consumed && decoder.total_out() == produced {
            return Err("truncated zlib stream");
        }
    }
}
