//! Sample - Ingestion 输出
//!
//! 单个流上的一条数据（解码后的视频帧或带外元数据记录）。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::StreamId;

/// 未知时间戳哨兵值（任何负数都视为未知）
pub const UNKNOWN_TIMESTAMP: f64 = -1.0;

/// 流上的一条样本
///
/// 创建后不可变：字段只读，克隆只增加载荷引用计数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    stream_id: StreamId,

    /// 流自身的单调时钟 (seconds, f64)，负数表示未知
    raw_timestamp: f64,

    /// 数据载荷 (零拷贝)
    payload: Payload,

    /// 进程内单调递增的到达序号
    arrival_sequence: u64,
}

impl Sample {
    /// 创建样本
    ///
    /// `arrival_sequence` 应来自进程共享的序号生成器，
    /// 以保证跨流的到达先后可比较。
    pub fn new(
        stream_id: impl Into<StreamId>,
        raw_timestamp: f64,
        payload: Payload,
        arrival_sequence: u64,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            raw_timestamp,
            payload,
            arrival_sequence,
        }
    }

    #[inline]
    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    #[inline]
    pub fn raw_timestamp(&self) -> f64 {
        self.raw_timestamp
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[inline]
    pub fn arrival_sequence(&self) -> u64 {
        self.arrival_sequence
    }

    /// 时间戳是否为未知哨兵（负数或非有限值）
    #[inline]
    pub fn has_unknown_timestamp(&self) -> bool {
        !self.raw_timestamp.is_finite() || self.raw_timestamp < 0.0
    }
}

/// 样本载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    /// 解码后的视频帧
    Frame(VideoFrame),

    /// 带外逐帧元数据
    Metadata(MetadataRecord),

    /// 原始字节 (fallback)
    Raw(Bytes),
}

impl Payload {
    /// 载荷字节数
    pub fn len(&self) -> usize {
        match self {
            Payload::Frame(frame) => frame.data.len(),
            Payload::Metadata(record) => record.data.len(),
            Payload::Raw(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 视频帧
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFrame {
    /// 宽度
    pub width: u32,

    /// 高度
    pub height: u32,

    /// 像素格式
    pub format: PixelFormat,

    /// 像素数据 (或压缩后的 JPEG)
    pub data: Bytes,
}

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Gray8,
    Jpeg,
}

/// 元数据记录
///
/// 由外部解析器从元数据流中提取；解析失败的记录不会生成样本。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// 与之对应的源文件名（若载荷中携带）
    pub filename: Option<String>,

    /// 原始记录字节
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_timestamp_sentinel() {
        let s = Sample::new("video", UNKNOWN_TIMESTAMP, Payload::Raw(Bytes::new()), 0);
        assert!(s.has_unknown_timestamp());

        let s = Sample::new("video", f64::NAN, Payload::Raw(Bytes::new()), 1);
        assert!(s.has_unknown_timestamp());

        let s = Sample::new("video", 0.0, Payload::Raw(Bytes::new()), 2);
        assert!(!s.has_unknown_timestamp());
    }

    #[test]
    fn test_payload_len() {
        let frame = Payload::Frame(VideoFrame {
            width: 2,
            height: 2,
            format: PixelFormat::Gray8,
            data: Bytes::from_static(&[0, 1, 2, 3]),
        });
        assert_eq!(frame.len(), 4);

        let meta = Payload::Metadata(MetadataRecord {
            filename: Some("00001.jpg".into()),
            data: Bytes::new(),
        });
        assert!(meta.is_empty());
    }
}
