//! 合规分析流水线
//!
//! 三条互不依赖的分支并发执行，汇合后交给判定器：
//! - 探测 → CBR判定
//! - 积分响度测量
//! - 解码 → 归一化 → 峰值 + 静音
//!
//! 多个分支同时失败时按 探测 > 响度 > 解码 的顺序报告。

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::audio::{
    AudioMetadata, DecoderBackend, Ebur128Meter, FfprobeProber, LoudnessMeter, MediaProber,
    PcmDecoder, ToolPaths, UniversalDecoder,
};
use crate::core::{
    CbrVerdict, ComplianceReport, ComplianceSpec, Measurements, SilenceBounds, calculate_peak,
    classify_metadata, detect_silence, evaluate, normalize,
};
use crate::error::{AnalysisError, AnalysisResult};
use crate::tools::constants::{analysis, timeouts};

/// 各外部调用的等待上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolTimeouts {
    pub probe: Duration,
    pub loudness: Duration,
    pub decode: Duration,
    pub validation: Duration,
    pub tool_check: Duration,
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self {
            probe: timeouts::PROBE,
            loudness: timeouts::LOUDNESS,
            decode: timeouts::DECODE,
            validation: timeouts::VALIDATION,
            tool_check: timeouts::TOOL_CHECK,
        }
    }
}

/// 分析器配置
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub tools: ToolPaths,
    pub timeouts: ToolTimeouts,
    /// 静音阈值（dB）
    pub silence_threshold_db: f64,
    pub decoder: DecoderBackend,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            timeouts: ToolTimeouts::default(),
            silence_threshold_db: analysis::SILENCE_THRESHOLD_DB,
            decoder: DecoderBackend::default(),
        }
    }
}

/// 解码分支的产出（样本缓冲在分支内释放）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSummary {
    pub peak_db: f64,
    pub silence: SilenceBounds,
    pub bit_depth: u16,
    pub frame_rate: u32,
    pub sample_count: usize,
}

/// 带中间测量值的完整分析结果
#[derive(Debug, Clone)]
pub struct AnalysisDetails {
    pub path: PathBuf,
    pub report: ComplianceReport,
    pub measurements: Measurements,
    pub signal: SignalSummary,
    pub elapsed: Duration,
}

/// 合规分析器
///
/// 只持有只读的标准与三个能力对象，可在多线程间共享。
pub struct ComplianceAnalyzer {
    spec: ComplianceSpec,
    prober: Box<dyn MediaProber>,
    meter: Box<dyn LoudnessMeter>,
    decoder: Box<dyn PcmDecoder>,
    silence_threshold_db: f64,
}

impl ComplianceAnalyzer {
    /// 使用给定能力构建（测试可注入假实现）
    pub fn new(
        spec: ComplianceSpec,
        prober: Box<dyn MediaProber>,
        meter: Box<dyn LoudnessMeter>,
        decoder: Box<dyn PcmDecoder>,
    ) -> Self {
        Self {
            spec,
            prober,
            meter,
            decoder,
            silence_threshold_db: analysis::SILENCE_THRESHOLD_DB,
        }
    }

    pub fn with_silence_threshold(mut self, threshold_db: f64) -> Self {
        self.silence_threshold_db = threshold_db;
        self
    }

    /// 按配置装配 ffprobe / ebur128 / 解码链
    pub fn from_config(config: &AnalyzerConfig, spec: ComplianceSpec) -> AnalysisResult<Self> {
        spec.validate()?;
        if !config.silence_threshold_db.is_finite() || config.silence_threshold_db > 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "静音阈值必须为非正有限dB值 / silence threshold must be a finite dB value ≤ 0: {}",
                config.silence_threshold_db
            )));
        }

        let t = &config.timeouts;
        let prober = FfprobeProber::new(&config.tools).with_timeouts(t.probe, t.validation);
        let meter = Ebur128Meter::new(&config.tools).with_timeout(t.loudness);
        let decoder = UniversalDecoder::for_backend(config.decoder, &config.tools, t.probe, t.decode);

        debug!(
            decoders = ?decoder.backend_names(),
            spec = %spec.name,
            "analyzer configured"
        );

        Ok(Self::new(spec, Box::new(prober), Box::new(meter), Box::new(decoder))
            .with_silence_threshold(config.silence_threshold_db))
    }

    pub fn spec(&self) -> &ComplianceSpec {
        &self.spec
    }

    /// 分析单个文件，返回合规报告
    pub fn analyze(&self, path: &Path) -> AnalysisResult<ComplianceReport> {
        self.analyze_detailed(path).map(|details| details.report)
    }

    /// 分析单个文件，同时返回中间测量值
    pub fn analyze_detailed(&self, path: &Path) -> AnalysisResult<AnalysisDetails> {
        if !path.is_file() {
            return Err(AnalysisError::InvalidInput(format!(
                "文件不存在或不是普通文件 / not a readable file: {}",
                path.display()
            )));
        }

        info!(path = %path.display(), spec = %self.spec.name, "analyzing");
        let start = Instant::now();

        let (probe_result, (loudness_result, signal_result)) = rayon::join(
            || self.probe_stage(path),
            || {
                rayon::join(
                    || self.meter.integrated_loudness(path),
                    || self.signal_stage(path),
                )
            },
        );

        let (metadata, cbr) = probe_result?;
        let integrated_loudness = loudness_result?;
        let signal = signal_result?;

        let measurements = Measurements {
            metadata,
            cbr,
            integrated_loudness,
            peak_db: signal.peak_db,
            silence: signal.silence,
        };
        let report = evaluate(&self.spec, &measurements);
        let elapsed = start.elapsed();

        info!(
            path = %path.display(),
            pass = report.overall_pass,
            loudness_lufs = integrated_loudness,
            peak_db = signal.peak_db,
            elapsed_ms = elapsed.as_millis() as u64,
            "analysis complete"
        );

        Ok(AnalysisDetails {
            path: path.to_path_buf(),
            report,
            measurements,
            signal,
            elapsed,
        })
    }

    fn probe_stage(&self, path: &Path) -> AnalysisResult<(AudioMetadata, CbrVerdict)> {
        let metadata = self.prober.probe(path)?;
        let cbr = classify_metadata(&metadata);
        debug!(
            codec = %metadata.codec,
            container = %metadata.container_format,
            bit_rate = metadata.bit_rate,
            cbr = cbr.is_cbr,
            cbr_assumed = cbr.is_assumed(),
            "probe finished"
        );
        Ok((metadata, cbr))
    }

    fn signal_stage(&self, path: &Path) -> AnalysisResult<SignalSummary> {
        let raw = self.decoder.decode(path)?;
        let buffer = normalize(raw);

        let summary = SignalSummary {
            peak_db: calculate_peak(&buffer.samples),
            silence: detect_silence(
                &buffer.samples,
                buffer.frame_rate,
                self.silence_threshold_db,
            ),
            bit_depth: buffer.bit_depth,
            frame_rate: buffer.frame_rate,
            sample_count: buffer.len(),
        };
        debug!(
            bit_depth = summary.bit_depth,
            samples = summary.sample_count,
            peak_db = summary.peak_db,
            "signal analysis finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.silence_threshold_db, -40.0);
        assert_eq!(config.timeouts.probe, Duration::from_secs(30));
        assert_eq!(config.timeouts.loudness, Duration::from_secs(120));
        assert_eq!(config.decoder, DecoderBackend::Auto);
    }

    #[test]
    fn test_from_config_rejects_bad_threshold() {
        let config = AnalyzerConfig {
            silence_threshold_db: 6.0,
            ..AnalyzerConfig::default()
        };
        assert!(ComplianceAnalyzer::from_config(&config, ComplianceSpec::acx()).is_err());

        let config = AnalyzerConfig {
            silence_threshold_db: f64::NAN,
            ..AnalyzerConfig::default()
        };
        assert!(ComplianceAnalyzer::from_config(&config, ComplianceSpec::acx()).is_err());
    }

    #[test]
    fn test_from_config_rejects_invalid_spec() {
        let mut spec = ComplianceSpec::acx();
        spec.loudness_max = spec.loudness_min;
        assert!(matches!(
            ComplianceAnalyzer::from_config(&AnalyzerConfig::default(), spec),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_file_is_invalid_input() {
        let analyzer =
            ComplianceAnalyzer::from_config(&AnalyzerConfig::default(), ComplianceSpec::acx())
                .unwrap();
        let err = analyzer
            .analyze(Path::new("/nonexistent/chapter01.mp3"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }
}
