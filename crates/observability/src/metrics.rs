//! Sync Engine 指标收集模块
//!
//! 基于 SyncedGroup / EngineStats 收集和统计对齐与组装的运行指标。

use contracts::{DiscardReason, EngineStats, EvictedGroup, SyncedGroup};
use metrics::{counter, gauge, histogram};

/// 记录一个已发射的同步组
///
/// 每次 Join Engine 产出 SyncedGroup 时调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_group_emitted;
///
/// if let InsertOutcome::Emitted(group) = engine.push(sample) {
///     record_group_emitted(&group);
///     sink.on_group_ready(group);
/// }
/// ```
pub fn record_group_emitted(group: &SyncedGroup) {
    counter!("stream_sync_groups_emitted_total").increment(1);

    // 组 ID (用于检测跳号)
    gauge!("stream_sync_last_group_id").set(group.group_id as f64);

    // 组内原始时间戳最大差 (秒 -> 毫秒)
    histogram!("stream_sync_group_skew_ms").record(group.skew() * 1000.0);
}

/// 记录因超龄被驱逐的未完成组
pub fn record_group_evicted(evicted: &EvictedGroup) {
    counter!("stream_sync_groups_evicted_total").increment(1);
    histogram!("stream_sync_evicted_group_age_ms").record(evicted.age.as_secs_f64() * 1000.0);
}

/// 记录被丢弃的样本
pub fn record_sample_discarded(stream_id: &str, reason: DiscardReason) {
    counter!(
        "stream_sync_samples_discarded_total",
        "stream_id" => stream_id.to_string(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// 记录同一槽位的重复样本
pub fn record_duplicate(stream_id: &str) {
    counter!(
        "stream_sync_samples_duplicate_total",
        "stream_id" => stream_id.to_string()
    )
    .increment(1);
}

/// 记录迟到样本（槽位已发射或已退役）
pub fn record_late(stream_id: &str) {
    counter!(
        "stream_sync_samples_late_total",
        "stream_id" => stream_id.to_string()
    )
    .increment(1);
}

/// 记录边界修正，`direction` 为 -1 或 +1
pub fn record_boundary_correction(stream_id: &str, direction: i64) {
    let direction = if direction < 0 { "earlier" } else { "later" };
    counter!(
        "stream_sync_boundary_corrections_total",
        "stream_id" => stream_id.to_string(),
        "direction" => direction
    )
    .increment(1);
}

/// 记录入队样本
pub fn record_sample_received(stream_id: &str) {
    counter!(
        "stream_sync_samples_received_total",
        "stream_id" => stream_id.to_string()
    )
    .increment(1);
}

/// 记录入口队列因背压丢弃的样本
pub fn record_ingest_dropped(stream_id: &str, policy: &'static str) {
    counter!(
        "stream_sync_ingest_dropped_total",
        "stream_id" => stream_id.to_string(),
        "policy" => policy
    )
    .increment(1);
}

/// 记录缓冲中的未完成组数量
pub fn record_buffer_groups(pending: usize) {
    gauge!("stream_sync_buffer_groups").set(pending as f64);
}

/// 记录流的相位偏移 (秒 -> 毫秒)
pub fn record_aligner_offset(stream_id: &str, offset_s: f64) {
    gauge!(
        "stream_sync_aligner_offset_ms",
        "stream_id" => stream_id.to_string()
    )
    .set(offset_s * 1000.0);
}

/// 记录检测到的槽宽
pub fn record_precision_detected(stream_id: &str, precision_s: f64) {
    gauge!(
        "stream_sync_precision_seconds",
        "stream_id" => stream_id.to_string()
    )
    .set(precision_s);
}

/// 同步指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    /// 已发射组数
    pub total_groups: u64,

    /// 被驱逐组数
    pub groups_evicted: u64,

    /// 丢弃样本数
    pub samples_discarded: u64,

    /// 重复样本数
    pub duplicates: u64,

    /// 迟到样本数
    pub late: u64,

    /// 边界修正次数
    pub boundary_corrections: u64,

    /// 组内偏差统计 (毫秒)
    pub skew_stats: RunningStats,

    /// 相邻已发射槽位间隔统计 (毫秒)
    pub interval_stats: RunningStats,

    last_slot_seconds: Option<f64>,
}

impl SyncMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 用一个已发射组更新统计
    pub fn update(&mut self, group: &SyncedGroup) {
        self.total_groups += 1;
        self.skew_stats.push(group.skew() * 1000.0);

        let slot_seconds = group.slot_seconds();
        if let Some(last) = self.last_slot_seconds {
            self.interval_stats.push((slot_seconds - last) * 1000.0);
        }
        self.last_slot_seconds = Some(slot_seconds);
    }

    /// 合并引擎计数器（通常在运行结束时调用一次）
    pub fn absorb(&mut self, stats: &EngineStats) {
        self.groups_evicted = stats.groups_evicted;
        self.samples_discarded = stats.total_discarded();
        self.duplicates = stats.duplicates;
        self.late = stats.late;
        self.boundary_corrections = stats.boundary_corrections;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let attempted = self.total_groups + self.groups_evicted;
        MetricsSummary {
            total_groups: self.total_groups,
            groups_evicted: self.groups_evicted,
            samples_discarded: self.samples_discarded,
            duplicates: self.duplicates,
            late: self.late,
            boundary_corrections: self.boundary_corrections,
            completion_rate: if attempted > 0 {
                self.total_groups as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            skew_ms: StatsSummary::from(&self.skew_stats),
            slot_interval_ms: StatsSummary::from(&self.interval_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_groups: u64,
    pub groups_evicted: u64,
    pub samples_discarded: u64,
    pub duplicates: u64,
    pub late: u64,
    pub boundary_corrections: u64,
    pub completion_rate: f64,
    pub skew_ms: StatsSummary,
    pub slot_interval_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(
            f,
            "Groups emitted: {} ({:.2}% complete)",
            self.total_groups, self.completion_rate
        )?;
        writeln!(f, "Groups evicted: {}", self.groups_evicted)?;
        writeln!(f, "Samples discarded: {}", self.samples_discarded)?;
        writeln!(f, "Duplicate samples: {}", self.duplicates)?;
        writeln!(f, "Late samples: {}", self.late)?;
        writeln!(f, "Boundary corrections: {}", self.boundary_corrections)?;
        writeln!(f, "Group skew (ms): {}", self.skew_ms)?;
        writeln!(f, "Slot interval (ms): {}", self.slot_interval_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
