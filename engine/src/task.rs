//! 后台解码任务
//!
//! 解码流程整体交给 tokio 的阻塞线程池执行，调用方所在的异步上下文保持响应。
//! - 进度：多次、单向、尽力而为（`mpsc`），接收端关闭后发送失败直接忽略
//! - 结果：恰好一次（`oneshot`），成功为完整输出，失败为第一个出错阶段的错误
//!
//! 请求中的缓冲区按值移入后台任务，不做复制。
//! 丢弃 [`DecodeHandle`] 即取消：后台任务跑完后结果被丢弃，缓冲区随之释放。

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::decrypt::{DecodeRequest, Progress, decode};
use crate::error::CryptError;

/// 正在后台执行的解码任务
#[derive(Debug)]
pub struct DecodeHandle {
    progress: mpsc::UnboundedReceiver<Progress>,
    result: oneshot::Receiver<Result<Vec<u8>, CryptError>>,
}

impl DecodeHandle {
    /// 下一条进度；任务结束后返回 `None`
    pub async fn next_progress(&mut self) -> Option<Progress> {
        self.progress.recv().await
    }

    /// 等待最终结果
    ///
    /// 未读取的进度直接丢弃。
    pub async fn finish(self) -> Result<Vec<u8>, CryptError> {
        self.result.await.unwrap_or_else(|_| {
            warn!("decode worker exited without a result");
            Err(CryptError::Internal)
        })
    }

    /// 依次转发全部进度，再返回最终结果
    pub async fn run_with<F>(mut self, mut on_progress: F) -> Result<Vec<u8>, CryptError>
    where
        F: FnMut(Progress),
    {
        while let Some(step) = self.next_progress().await {
            on_progress(step);
        }

        self.finish().await
    }
}

/// 在后台启动一次解码
///
/// 必须在 tokio runtime 内调用。
pub fn spawn_decode(request: DecodeRequest) -> DecodeHandle {
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = oneshot::channel();

    debug!(?request, "spawning decode worker");

    tokio::task::spawn_blocking(move || {
        let result = decode(request, |step| {
            let _ = progress_tx.send(step);
        });

        if result_tx.send(result).is_err() {
            debug!("decode handle dropped, discarding result");
        }
    });

    DecodeHandle {
        progress: progress_rx,
        result: result_rx,
    }
}
