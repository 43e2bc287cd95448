//! 合成数据源
//!
//! 用于无真实媒体管线环境的测试和 `simulate` 命令。
//! 每个源在自己的线程上按固定帧率产生带抖动的时间戳，
//! 可配置恒定相位、未知时间戳注入以及能力串 (caps) 播报。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    MetadataRecord, Payload, PixelFormat, SourceCallback, SourceEvent, StreamSource, VideoFrame,
    UNKNOWN_TIMESTAMP,
};
use rand::Rng;
use tracing::{debug, trace};

/// 合成载荷类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticKind {
    /// 灰度视频帧
    Video { width: u32, height: u32 },
    /// 逐帧元数据记录
    Metadata,
}

/// 合成源配置
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// 流 ID
    pub stream_id: String,

    /// 载荷类型
    pub kind: SyntheticKind,

    /// 帧率 (Hz)
    pub fps: f64,

    /// 流时钟相对于公共网格的恒定相位 (秒，可为负)
    pub phase_s: f64,

    /// 均匀分布抖动幅度 ±jitter_s (秒)
    pub jitter_s: f64,

    /// 每隔 N 个样本注入一次未知时间戳 (0 = 不注入)
    pub unknown_every: u64,

    /// 最多产生的样本数 (None = 直到 stop)
    pub max_samples: Option<u64>,

    /// 按真实时间节奏发送 (false = 尽快发送)
    pub realtime: bool,

    /// 前 N 个样本之前各播报一次 caps
    pub caps_hints: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            stream_id: "synthetic".to_string(),
            kind: SyntheticKind::Metadata,
            fps: 4.0,
            phase_s: 0.0,
            jitter_s: 0.0,
            unknown_every: 0,
            max_samples: None,
            realtime: true,
            caps_hints: 3,
        }
    }
}

/// 合成数据源
pub struct SyntheticSource {
    config: SyntheticConfig,
    listening: Arc<AtomicBool>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 视频源 (320x240 灰度)
    pub fn video(stream_id: &str, fps: f64) -> Self {
        Self::new(SyntheticConfig {
            stream_id: stream_id.to_string(),
            kind: SyntheticKind::Video {
                width: 320,
                height: 240,
            },
            fps,
            ..Default::default()
        })
    }

    /// 元数据源
    pub fn metadata(stream_id: &str, fps: f64) -> Self {
        Self::new(SyntheticConfig {
            stream_id: stream_id.to_string(),
            kind: SyntheticKind::Metadata,
            fps,
            ..Default::default()
        })
    }

    pub fn with_phase(mut self, phase_s: f64) -> Self {
        self.config.phase_s = phase_s;
        self
    }

    pub fn with_jitter(mut self, jitter_s: f64) -> Self {
        self.config.jitter_s = jitter_s.abs();
        self
    }

    pub fn with_max_samples(mut self, max_samples: u64) -> Self {
        self.config.max_samples = Some(max_samples);
        self
    }

    pub fn with_unknown_every(mut self, every: u64) -> Self {
        self.config.unknown_every = every;
        self
    }

    /// 不按真实时间节奏发送
    pub fn unpaced(mut self) -> Self {
        self.config.realtime = false;
        self
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }
}

/// 生成 `framerate=(fraction)N/D` 形式的能力串
fn caps_string(kind: SyntheticKind, fps: f64) -> String {
    let (num, den) = if fps.fract() == 0.0 {
        (fps as u64, 1)
    } else {
        ((fps * 1000.0).round() as u64, 1000)
    };
    match kind {
        SyntheticKind::Video { width, height } => format!(
            "video/x-raw, format=(string)GRAY8, width=(int){width}, height=(int){height}, \
             framerate=(fraction){num}/{den}"
        ),
        SyntheticKind::Metadata => format!("meta/x-klv, framerate=(fraction){num}/{den}"),
    }
}

fn payload(kind: SyntheticKind, index: u64) -> Payload {
    match kind {
        SyntheticKind::Video { width, height } => Payload::Frame(VideoFrame {
            width,
            height,
            format: PixelFormat::Gray8,
            data: Bytes::from(vec![(index % 256) as u8; (width * height) as usize]),
        }),
        SyntheticKind::Metadata => Payload::Metadata(MetadataRecord {
            filename: Some(format!("{:05}.jpg", index)),
            data: Bytes::copy_from_slice(&index.to_le_bytes()),
        }),
    }
}

impl StreamSource for SyntheticSource {
    fn stream_id(&self) -> &str {
        &self.config.stream_id
    }

    fn listen(&self, callback: SourceCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let listening = self.listening.clone();

        std::thread::spawn(move || {
            let period = 1.0 / config.fps.max(f64::MIN_POSITIVE);
            let mut rng = rand::rng();
            let mut index: u64 = 0;

            debug!(
                stream_id = %config.stream_id,
                fps = config.fps,
                phase_s = config.phase_s,
                "synthetic source started"
            );

            while listening.load(Ordering::Relaxed) {
                if config.max_samples.is_some_and(|max| index >= max) {
                    break;
                }

                if (index as usize) < config.caps_hints {
                    callback(SourceEvent::Caps(caps_string(config.kind, config.fps)));
                }

                let raw_timestamp =
                    if config.unknown_every > 0 && (index + 1) % config.unknown_every == 0 {
                        UNKNOWN_TIMESTAMP
                    } else {
                        let jitter = if config.jitter_s > 0.0 {
                            rng.random_range(-config.jitter_s..=config.jitter_s)
                        } else {
                            0.0
                        };
                        (config.phase_s + index as f64 * period + jitter).max(0.0)
                    };

                trace!(stream_id = %config.stream_id, index, raw_timestamp, "synthetic sample");
                callback(SourceEvent::Sample {
                    raw_timestamp,
                    payload: payload(config.kind, index),
                });
                index += 1;

                if config.realtime {
                    std::thread::sleep(Duration::from_secs_f64(period));
                }
            }

            listening.store(false, Ordering::SeqCst);
            debug!(stream_id = %config.stream_id, samples = index, "synthetic source finished");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
