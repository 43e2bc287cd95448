//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 合成数据源 e2e 测试（source -> queue -> worker -> sink）
//! - 配置文件驱动的引擎测试

#[cfg(test)]
mod contract_tests {
    use contracts::{Slot, SyncEngineConfig};

    #[test]
    fn test_default_config_snapshot() {
        let json = serde_json_snapshot(&SyncEngineConfig::with_streams(["video", "meta"]));
        assert!(json.contains("\"required_streams\":[\"video\",\"meta\"]"));
        assert!(json.contains("\"mode\":\"fixed\""));
        assert!(json.contains("\"rounding\":\"floor\""));
        assert!(json.contains("\"drop_policy\":\"drop_oldest\""));
    }

    #[test]
    fn test_slot_equality_is_exact() {
        // 0.1 + 0.2 != 0.3 in f64, but the slots match
        assert_eq!(Slot::new(3, 0.1 + 0.2), Slot::new(3, 0.3));
    }

    fn serde_json_snapshot(config: &SyncEngineConfig) -> String {
        config_loader::ConfigLoader::to_json(config)
            .unwrap()
            .split_whitespace()
            .collect()
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{AlignerConfig, SyncEngineConfig, SyncedGroup};
    use ingestion::{IngestionPipeline, SyntheticSource};
    use observability::SyncMetricsAggregator;
    use sync_engine::{ChannelSink, SyncEngine, SyncWorker};
    use tokio::sync::mpsc;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn engine_config(streams: &[&str], precision_s: Option<f64>) -> SyncEngineConfig {
        SyncEngineConfig {
            aligner: AlignerConfig {
                precision_s,
                ..Default::default()
            },
            ..SyncEngineConfig::with_streams(streams.iter().copied())
        }
    }

    async fn collect(mut rx: mpsc::Receiver<SyncedGroup>) -> Vec<SyncedGroup> {
        let mut groups = Vec::new();
        while let Some(group) = rx.recv().await {
            groups.push(group);
        }
        groups
    }

    /// End-to-end: SyntheticSource x3 -> IngestionPipeline -> SyncWorker -> ChannelSink
    #[tokio::test]
    async fn test_e2e_synthetic_pipeline() {
        let config = engine_config(&["video", "meta-a", "meta-b"], Some(0.25));

        let mut pipeline = IngestionPipeline::new(&config.ingest);
        pipeline
            .register_source(Box::new(
                SyntheticSource::video("video", 4.0)
                    .with_max_samples(30)
                    .unpaced(),
            ))
            .unwrap();
        pipeline
            .register_source(Box::new(
                SyntheticSource::metadata("meta-a", 4.0)
                    .with_phase(0.013)
                    .with_max_samples(30)
                    .unpaced(),
            ))
            .unwrap();
        pipeline
            .register_source(Box::new(
                SyntheticSource::metadata("meta-b", 4.0)
                    .with_phase(0.026)
                    .with_max_samples(30)
                    .unpaced(),
            ))
            .unwrap();

        let (sink, rx) = ChannelSink::channel(64);
        let handle = SyncWorker::spawn(
            SyncEngine::new(config),
            pipeline.take_receiver().unwrap(),
            sink,
        );
        pipeline.start_all().unwrap();
        pipeline.release_sender();

        let groups = tokio::time::timeout(TIMEOUT, collect(rx)).await.unwrap();
        let stats = handle.join().await.unwrap();

        assert_eq!(stats.groups_emitted, 30);
        assert_eq!(groups.len(), 30);
        for (i, group) in groups.iter().enumerate() {
            assert_eq!(group.group_id, i as u64);
            assert_eq!(group.slot.index(), i as i64);
            assert_eq!(group.entries.len(), 3);
            assert!(group.skew() < 0.03);
        }
        assert_eq!(pipeline.metrics().snapshot().samples_received, 90);
    }

    /// Frame rate comes from caps strings; the grid switches once detected
    #[tokio::test]
    async fn test_e2e_rate_detection() {
        let config = engine_config(&["video", "meta"], None);

        let mut pipeline = IngestionPipeline::new(&config.ingest);
        pipeline
            .register_source(Box::new(
                SyntheticSource::video("video", 10.0)
                    .with_max_samples(20)
                    .unpaced(),
            ))
            .unwrap();
        pipeline
            .register_source(Box::new(
                SyntheticSource::metadata("meta", 10.0)
                    .with_phase(0.013)
                    .with_max_samples(20)
                    .unpaced(),
            ))
            .unwrap();

        let (sink, rx) = ChannelSink::channel(64);
        let engine = SyncEngine::new(config);
        let handle = SyncWorker::spawn(engine, pipeline.take_receiver().unwrap(), sink);
        pipeline.start_all().unwrap();
        pipeline.release_sender();

        let groups = tokio::time::timeout(TIMEOUT, collect(rx)).await.unwrap();
        let stats = handle.join().await.unwrap();

        // The first two samples per stream are aligned on the 0.25s default grid
        // (slot 0 there), the rest on the detected 0.1s grid.
        assert_eq!(stats.groups_emitted, 19);
        assert_eq!(stats.late + stats.duplicates, 2);
        let detected: Vec<&SyncedGroup> = groups
            .iter()
            .filter(|g| g.slot.width_ns() == 100_000_000)
            .collect();
        assert_eq!(detected.len(), 18);
        assert_eq!(detected[0].slot.index(), 2);
        assert_eq!(pipeline.metrics().snapshot().rate_hints, 6);
    }

    /// Unknown timestamps are discarded and their slots never complete
    #[tokio::test]
    async fn test_e2e_unknown_timestamps() {
        let config = engine_config(&["video", "meta"], Some(0.25));

        let mut pipeline = IngestionPipeline::new(&config.ingest);
        pipeline
            .register_source(Box::new(
                SyntheticSource::video("video", 4.0)
                    .with_max_samples(20)
                    .unpaced(),
            ))
            .unwrap();
        pipeline
            .register_source(Box::new(
                SyntheticSource::metadata("meta", 4.0)
                    .with_phase(0.013)
                    .with_unknown_every(5)
                    .with_max_samples(20)
                    .unpaced(),
            ))
            .unwrap();

        let (sink, rx) = ChannelSink::channel(64);
        let handle = SyncWorker::spawn(
            SyncEngine::new(config),
            pipeline.take_receiver().unwrap(),
            sink,
        );
        pipeline.start_all().unwrap();
        pipeline.release_sender();

        let groups = tokio::time::timeout(TIMEOUT, collect(rx)).await.unwrap();
        let stats = handle.join().await.unwrap();

        assert_eq!(stats.discarded_invalid, 4);
        assert_eq!(stats.groups_emitted, 16);
        assert!(groups.iter().all(|g| g.slot.index() % 5 != 4));
        // The four video-only slots were still pending at shutdown
        assert_eq!(stats.pending_groups, 4);

        let mut aggregator = SyncMetricsAggregator::new();
        for group in &groups {
            aggregator.update(group);
        }
        aggregator.absorb(&stats);
        let summary = aggregator.summary();
        assert_eq!(summary.total_groups, 16);
        assert_eq!(summary.samples_discarded, 4);
        assert_eq!(summary.groups_evicted, 0);
        assert_eq!(summary.completion_rate, 100.0);
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use bytes::Bytes;
    use config_loader::ConfigLoader;
    use contracts::{Payload, RoundingPolicy};
    use ingestion::SampleSequencer;
    use sync_engine::{InsertOutcome, SyncEngine};

    const CONFIG: &str = r#"
required_streams = ["video", "meta"]

[aligner]
precision_s = 0.25
rounding = "nearest"
"#;

    /// Config file -> ConfigLoader -> SyncEngine, fed the documented interleaving
    #[test]
    fn test_config_file_drives_engine() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.aligner.rounding, RoundingPolicy::Nearest);

        let mut engine = SyncEngine::new(config);
        let sequencer = SampleSequencer::new();
        let arrivals = [
            ("meta", 3.00),
            ("video", 3.01),
            ("meta", 3.24),
            ("video", 3.26),
            ("video", 3.52),
            ("meta", 3.49),
        ];

        let mut slots = Vec::new();
        for (stream, ts) in arrivals {
            let sample = sequencer.sample(stream, ts, Payload::Raw(Bytes::new()));
            if let InsertOutcome::Emitted(group) = engine.push(sample) {
                slots.push(group.slot_seconds());
            }
        }

        assert_eq!(slots, vec![3.0, 3.25, 3.5]);
        assert_eq!(engine.stats().groups_emitted, 3);
        assert_eq!(engine.pending_groups(), 0);
    }

    #[test]
    fn test_invalid_config_file_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{ "required_streams": ["video"], "ingest": { "capacity": 0 } }"#)
            .unwrap();

        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("ingest.capacity"));
    }
}
