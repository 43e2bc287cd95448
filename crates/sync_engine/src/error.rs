//! Sync engine 错误类型

use thiserror::Error;

/// Sync worker 错误
#[derive(Debug, Error)]
pub enum SyncEngineError {
    /// 消费任务 panic 或被取消
    #[error("sync worker terminated abnormally: {0}")]
    WorkerJoin(#[from] tokio::task::JoinError),
}
