//! 多文件并行处理模块
//!
//! 使用rayon实现文件级并行处理，保证输出顺序一致性

use rayon::prelude::*;
use std::path::PathBuf;
use tracing::info;

use super::batch_state::{BatchStatsSnapshot, ParallelBatchStats};
use super::processor::{FileOutcome, Validator, analyze_file};
use super::utils;
use crate::error::{AnalysisError, AnalysisResult, ErrorCategory};
use crate::processing::ComplianceAnalyzer;

/// 多文件并行处理
///
/// - 自定义rayon线程池精确控制并发度
/// - 线程安全的统计信息收集
/// - 结果按输入顺序返回
pub fn process_batch_parallel(
    audio_files: &[PathBuf],
    analyzer: &ComplianceAnalyzer,
    validator: Option<Validator>,
    parallel_degree: usize,
    verbose: bool,
) -> AnalysisResult<(Vec<FileOutcome>, BatchStatsSnapshot)> {
    eprintln!("⚡ 启用多文件并行处理 / Parallel analysis: {parallel_degree} 并发度");

    let stats = ParallelBatchStats::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_degree)
        .thread_name(|i| format!("acx-worker-{i}"))
        .build()
        .map_err(|e| {
            AnalysisError::InvalidInput(format!("线程池创建失败 / failed to build thread pool: {e}"))
        })?;

    // par_iter().collect() 保持输入顺序
    let outcomes: Vec<FileOutcome> = pool.install(|| {
        audio_files
            .par_iter()
            .map(|audio_file| {
                let result = analyze_file(analyzer, validator, audio_file);
                let filename = utils::extract_filename_lossy(audio_file);

                match &result {
                    Ok(details) => {
                        let count = stats.inc_analyzed(details.report.overall_pass);
                        if verbose {
                            eprintln!(
                                "✅ [{count}/{}] {filename} - {}",
                                audio_files.len(),
                                details.report.summary
                            );
                        }
                    }
                    Err(e) => {
                        let category = ErrorCategory::from_analysis_error(e);
                        eprintln!("❌ {filename} - [{}] {e}", category.display_name());
                        stats.inc_failed(category, filename);
                    }
                }

                FileOutcome {
                    path: audio_file.clone(),
                    result,
                }
            })
            .collect()
    });

    let snapshot = stats.snapshot();
    info!(
        analyzed = snapshot.analyzed,
        compliant = snapshot.compliant,
        failed = snapshot.failed,
        "parallel batch finished"
    );
    Ok((outcomes, snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioMetadata, LoudnessMeter, MediaProber, PcmDecoder, RawPcm};
    use crate::core::ComplianceSpec;
    use crate::error::decode_failure;
    use std::path::Path;

    struct Probe;
    impl MediaProber for Probe {
        fn probe(&self, _path: &Path) -> AnalysisResult<AudioMetadata> {
            Ok(AudioMetadata {
                codec: "mp3".to_string(),
                sample_rate: 44100,
                channels: 2,
                channel_layout: "stereo".to_string(),
                bit_rate: 192_000,
                duration: 1.0,
                container_format: "mp3".to_string(),
                stream_bit_rate: None,
                container_bit_rate: None,
            })
        }
    }

    struct Meter;
    impl LoudnessMeter for Meter {
        fn integrated_loudness(&self, _path: &Path) -> AnalysisResult<f64> {
            Ok(-19.5)
        }
    }

    /// 文件名含 "bad" 时解码失败
    struct Decoder;
    impl PcmDecoder for Decoder {
        fn name(&self) -> &'static str {
            "test"
        }
        fn decode(&self, path: &Path) -> AnalysisResult<RawPcm> {
            if path.to_string_lossy().contains("bad") {
                Err(decode_failure(path, "corrupt"))
            } else {
                Ok(RawPcm::new(vec![100, -100], 44100, 16, 2))
            }
        }
    }

    #[test]
    fn test_parallel_results_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..12)
            .map(|i| {
                let name = if i % 4 == 3 {
                    format!("{i:02}_bad.mp3")
                } else {
                    format!("{i:02}.mp3")
                };
                let path = dir.path().join(name);
                std::fs::write(&path, b"x").unwrap();
                path
            })
            .collect();

        let analyzer = ComplianceAnalyzer::new(
            ComplianceSpec::acx(),
            Box::new(Probe),
            Box::new(Meter),
            Box::new(Decoder),
        );
        let (outcomes, stats) =
            process_batch_parallel(&files, &analyzer, None, 4, false).unwrap();

        let paths: Vec<_> = outcomes.iter().map(|o| o.path.clone()).collect();
        assert_eq!(paths, files);
        assert_eq!(stats.analyzed, 9);
        assert_eq!(stats.compliant, 9);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.error_stats[&ErrorCategory::Decoding].len(), 3);
    }
}
