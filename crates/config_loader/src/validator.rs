//! 配置校验模块
//!
//! 校验规则：
//! - required_streams 非空、唯一、无空 id
//! - 时间参数有限且 >= 0
//! - 精度 > 0, 0 < smoothing <= 1
//! - 队列与缓冲容量 >= 1

use std::collections::HashSet;

use contracts::{AlignerConfig, ContractError, SyncEngineConfig};

/// 校验 SyncEngineConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &SyncEngineConfig) -> Result<(), ContractError> {
    validate_streams(config)?;
    validate_engine(config)?;
    validate_aligner(&config.aligner)?;
    validate_capacities(config)?;
    Ok(())
}

/// 校验 required_streams
fn validate_streams(config: &SyncEngineConfig) -> Result<(), ContractError> {
    if config.required_streams.is_empty() {
        return Err(ContractError::config_validation(
            "required_streams",
            "at least one stream is required",
        ));
    }

    let mut seen = HashSet::new();
    for (i, id) in config.required_streams.iter().enumerate() {
        if id.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("required_streams[{i}]"),
                "stream id must not be empty",
            ));
        }
        if !seen.insert(id.as_str()) {
            return Err(ContractError::config_validation(
                format!("required_streams[{i}]"),
                format!("duplicate stream id '{id}'"),
            ));
        }
    }
    Ok(())
}

fn validate_engine(config: &SyncEngineConfig) -> Result<(), ContractError> {
    non_negative("eviction_horizon_s", config.eviction_horizon_s)
}

/// 校验对齐参数
fn validate_aligner(aligner: &AlignerConfig) -> Result<(), ContractError> {
    if let Some(p) = aligner.precision_s {
        positive("aligner.precision_s", p)?;
    }
    positive("aligner.default_precision_s", aligner.default_precision_s)?;
    non_negative("aligner.drift_update_threshold_s", aligner.drift_update_threshold_s)?;
    non_negative("aligner.warmup_s", aligner.warmup_s)?;

    let s = aligner.smoothing;
    if !(s > 0.0 && s <= 1.0) {
        return Err(ContractError::config_validation(
            "aligner.smoothing",
            format!("smoothing must be in (0, 1], got {s}"),
        ));
    }

    if aligner.rate_hint_count == 0 {
        return Err(ContractError::config_validation(
            "aligner.rate_hint_count",
            "rate_hint_count must be >= 1",
        ));
    }
    Ok(())
}

/// 校验队列与缓冲容量
fn validate_capacities(config: &SyncEngineConfig) -> Result<(), ContractError> {
    if config.ingest.capacity == 0 {
        return Err(ContractError::config_validation(
            "ingest.capacity",
            "capacity must be >= 1",
        ));
    }
    if config.buffer.max_pending_groups == 0 {
        return Err(ContractError::config_validation(
            "buffer.max_pending_groups",
            "max_pending_groups must be >= 1",
        ));
    }
    if config.buffer.emitted_history == 0 {
        return Err(ContractError::config_validation(
            "buffer.emitted_history",
            "emitted_history must be >= 1",
        ));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ContractError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ContractError::config_validation(
            field,
            format!("must be a finite value > 0, got {value}"),
        ));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), ContractError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ContractError::config_validation(
            field,
            format!("must be a finite value >= 0, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StreamId;

    fn minimal_config() -> SyncEngineConfig {
        SyncEngineConfig::with_streams(["video", "meta"])
    }

    fn field_of(err: ContractError) -> String {
        match err {
            ContractError::ConfigValidation { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_empty_streams() {
        let cfg = SyncEngineConfig::default();
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "required_streams");
    }

    #[test]
    fn test_duplicate_stream() {
        let mut cfg = minimal_config();
        cfg.required_streams.push(StreamId::from("video"));
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert_eq!(field_of(err), "required_streams[2]");
    }

    #[test]
    fn test_blank_stream_id() {
        let mut cfg = minimal_config();
        cfg.required_streams[1] = StreamId::from("  ");
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "required_streams[1]");
    }

    #[test]
    fn test_negative_horizon() {
        let mut cfg = minimal_config();
        cfg.eviction_horizon_s = -1.0;
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "eviction_horizon_s");
    }

    #[test]
    fn test_precision_must_be_positive() {
        let mut cfg = minimal_config();
        cfg.aligner.precision_s = Some(0.0);
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "aligner.precision_s");

        cfg.aligner.precision_s = Some(f64::NAN);
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "aligner.precision_s");
    }

    #[test]
    fn test_smoothing_range() {
        let mut cfg = minimal_config();
        cfg.aligner.smoothing = 1.0;
        assert!(validate(&cfg).is_ok());

        cfg.aligner.smoothing = 0.0;
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "aligner.smoothing");

        cfg.aligner.smoothing = 1.5;
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "aligner.smoothing");
    }

    #[test]
    fn test_zero_capacity() {
        let mut cfg = minimal_config();
        cfg.ingest.capacity = 0;
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "ingest.capacity");
    }

    #[test]
    fn test_zero_rate_hint_count() {
        let mut cfg = minimal_config();
        cfg.aligner.rate_hint_count = 0;
        assert_eq!(field_of(validate(&cfg).unwrap_err()), "aligner.rate_hint_count");
    }
}
