//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 队列已关闭（所有生产者或消费者已退出）
    #[error("ingest queue closed")]
    QueueClosed,

    /// 同一流 ID 重复注册
    #[error("stream {stream_id} is already registered")]
    AlreadyRegistered {
        /// 流 ID
        stream_id: String,
    },

    /// 流未注册
    #[error("stream {stream_id} is not registered")]
    UnknownStream {
        /// 流 ID
        stream_id: String,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
