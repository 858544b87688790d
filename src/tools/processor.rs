//! 音频处理模块
//!
//! 负责单个文件的校验与分析，以及批量模式的串行处理。

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::batch_state::{BatchStatsSnapshot, SerialBatchStats};
use super::utils;
use crate::error::{AnalysisError, AnalysisResult, ErrorCategory};
use crate::processing::{AnalysisDetails, ComplianceAnalyzer};

/// 文件预校验：返回 `false` 表示文件中没有可用音频流
pub type Validator<'a> = &'a (dyn Fn(&Path) -> bool + Sync);

/// 单个文件的处理结果（批量输出按输入顺序保存）
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: AnalysisResult<AnalysisDetails>,
}

impl FileOutcome {
    pub fn passed(&self) -> bool {
        matches!(&self.result, Ok(details) if details.report.overall_pass)
    }
}

/// 分析单个文件；提供校验器时先做快速音频流检查
pub fn analyze_file(
    analyzer: &ComplianceAnalyzer,
    validator: Option<Validator>,
    path: &Path,
) -> AnalysisResult<AnalysisDetails> {
    if let Some(has_audio) = validator
        && path.is_file()
        && !has_audio(path)
    {
        warn!(path = %path.display(), "quick validation found no audio stream");
        return Err(AnalysisError::NoAudioStream {
            path: path.to_path_buf(),
        });
    }
    analyzer.analyze_detailed(path)
}

/// 串行批量处理
pub fn process_batch_serial(
    audio_files: &[PathBuf],
    analyzer: &ComplianceAnalyzer,
    validator: Option<Validator>,
    verbose: bool,
) -> (Vec<FileOutcome>, BatchStatsSnapshot) {
    let mut stats = SerialBatchStats::new();
    let mut outcomes = Vec::with_capacity(audio_files.len());

    for (index, audio_file) in audio_files.iter().enumerate() {
        let filename = utils::extract_filename_lossy(audio_file);
        if verbose {
            eprintln!(
                "[PROCESSING] [{}/{}] 处理 / Processing: {filename}",
                index + 1,
                audio_files.len()
            );
        }

        let result = analyze_file(analyzer, validator, audio_file);
        match &result {
            Ok(details) => {
                stats.inc_analyzed(details.report.overall_pass);
                if verbose {
                    eprintln!("   [OK] {}", details.report.summary);
                }
            }
            Err(e) => {
                let category = ErrorCategory::from_analysis_error(e);
                eprintln!(
                    "[FAIL] [{}/{}] {filename} - [{}] {e}",
                    index + 1,
                    audio_files.len(),
                    category.display_name()
                );
                stats.inc_failed(category, filename);
            }
        }

        outcomes.push(FileOutcome {
            path: audio_file.clone(),
            result,
        });
    }

    let snapshot = stats.snapshot();
    info!(
        analyzed = snapshot.analyzed,
        compliant = snapshot.compliant,
        failed = snapshot.failed,
        "serial batch finished"
    );
    (outcomes, snapshot)
}
