//! 合规判定
//!
//! 纯聚合，不做I/O：把探测、CBR、响度、峰值、静音的测量值与
//! [`ComplianceSpec`] 比较，生成带逐项说明的 [`ComplianceReport`]。
//!
//! 门控项：格式（MP3 + 比特率 + CBR）、采样率、响度、峰值。
//! 静音只做信息展示，不影响总判定。

use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;

use super::cbr::CbrVerdict;
use super::silence::SilenceBounds;
use crate::audio::AudioMetadata;
use crate::error::{AnalysisError, AnalysisResult};

/// 合规标准（只读配置，随请求传入判定器）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceSpec {
    /// 标准名称（用于摘要文案）
    pub name: String,
    /// 要求的采样率（Hz，精确相等）
    pub sample_rate_required: u32,
    /// 最低比特率（bit/s，含）
    pub bitrate_minimum: u64,
    /// 积分响度下限（LUFS，含）
    pub loudness_min: f64,
    /// 积分响度上限（LUFS，含）
    pub loudness_max: f64,
    /// 峰值上限（dB，含）
    pub peak_max: f64,
}

impl Default for ComplianceSpec {
    fn default() -> Self {
        Self::acx()
    }
}

impl ComplianceSpec {
    /// ACX 有声书标准
    pub fn acx() -> Self {
        Self {
            name: "ACX".to_string(),
            sample_rate_required: 44100,
            bitrate_minimum: 192_000,
            loudness_min: -23.0,
            loudness_max: -18.0,
            peak_max: -3.0,
        }
    }

    /// 从JSON文件加载（缺省字段取ACX默认值）
    pub fn from_json_file(path: &Path) -> AnalysisResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let spec: Self = serde_json::from_str(&text).map_err(|e| {
            AnalysisError::InvalidInput(format!(
                "标准文件解析失败 / invalid spec file {}: {e}",
                path.display()
            ))
        })?;
        spec.validate()?;
        Ok(spec)
    }

    /// 校验标准自身的一致性
    pub fn validate(&self) -> AnalysisResult<()> {
        let bounds = [self.loudness_min, self.loudness_max, self.peak_max];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(AnalysisError::InvalidInput(
                "标准阈值必须为有限数 / spec bounds must be finite".to_string(),
            ));
        }
        if self.loudness_min >= self.loudness_max {
            return Err(AnalysisError::InvalidInput(format!(
                "响度下限必须小于上限 / loudness_min ({}) must be below loudness_max ({})",
                self.loudness_min, self.loudness_max
            )));
        }
        if self.sample_rate_required == 0 {
            return Err(AnalysisError::InvalidInput(
                "要求的采样率不能为0 / required sample rate must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn format_ok(&self, is_mp3: bool, bit_rate: u64, is_cbr: bool) -> bool {
        is_mp3 && bit_rate >= self.bitrate_minimum && is_cbr
    }

    pub fn sample_rate_ok(&self, sample_rate: u32) -> bool {
        sample_rate == self.sample_rate_required
    }

    pub fn loudness_ok(&self, lufs: f64) -> bool {
        self.loudness_min <= lufs && lufs <= self.loudness_max
    }

    pub fn peak_ok(&self, peak_db: f64) -> bool {
        peak_db <= self.peak_max
    }

    fn bitrate_minimum_kbps(&self) -> u64 {
        (self.bitrate_minimum as f64 / 1000.0).round() as u64
    }
}

/// 判定所需的全部测量值
#[derive(Debug, Clone)]
pub struct Measurements {
    pub metadata: AudioMetadata,
    pub cbr: CbrVerdict,
    /// 积分响度（LUFS）
    pub integrated_loudness: f64,
    /// 峰值（dB，静音文件为负无穷）
    pub peak_db: f64,
    pub silence: SilenceBounds,
}

/// 单项判定的公共视图
pub trait Criterion {
    /// 显示名称
    fn label(&self) -> &'static str;

    /// 门控结果；信息项返回 `None`
    fn passed(&self) -> Option<bool>;

    fn message(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatCriterion {
    /// 容器格式名
    pub value: String,
    pub codec: String,
    pub bitrate: u64,
    #[serde(serialize_with = "round1")]
    pub bitrate_kbps: f64,
    pub cbr: bool,
    pub ok: bool,
    pub is_mp3: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRateCriterion {
    pub value: u32,
    pub ok: bool,
    pub required: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoudnessCriterion {
    #[serde(serialize_with = "round2")]
    pub value: f64,
    pub ok: bool,
    pub range: [f64; 2],
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakCriterion {
    #[serde(serialize_with = "round2")]
    pub value: f64,
    pub ok: bool,
    pub max: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SilenceCriterion {
    #[serde(serialize_with = "round2")]
    pub lead: f64,
    #[serde(serialize_with = "round2")]
    pub trail: f64,
    pub message: String,
}

impl Criterion for FormatCriterion {
    fn label(&self) -> &'static str {
        "格式 / Format"
    }
    fn passed(&self) -> Option<bool> {
        Some(self.ok)
    }
    fn message(&self) -> &str {
        &self.message
    }
}

impl Criterion for SampleRateCriterion {
    fn label(&self) -> &'static str {
        "采样率 / Sample rate"
    }
    fn passed(&self) -> Option<bool> {
        Some(self.ok)
    }
    fn message(&self) -> &str {
        &self.message
    }
}

impl Criterion for LoudnessCriterion {
    fn label(&self) -> &'static str {
        "响度 / Loudness"
    }
    fn passed(&self) -> Option<bool> {
        Some(self.ok)
    }
    fn message(&self) -> &str {
        &self.message
    }
}

impl Criterion for PeakCriterion {
    fn label(&self) -> &'static str {
        "峰值 / Peak"
    }
    fn passed(&self) -> Option<bool> {
        Some(self.ok)
    }
    fn message(&self) -> &str {
        &self.message
    }
}

impl Criterion for SilenceCriterion {
    fn label(&self) -> &'static str {
        "静音 / Silence"
    }
    fn passed(&self) -> Option<bool> {
        None
    }
    fn message(&self) -> &str {
        &self.message
    }
}

/// 合规报告（JSON字段名与既有消费方保持一致）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub format: FormatCriterion,
    #[serde(rename = "sampleRate")]
    pub sample_rate: SampleRateCriterion,
    /// 积分响度项，历史上以 `rms` 为键
    #[serde(rename = "rms")]
    pub loudness: LoudnessCriterion,
    pub peak: PeakCriterion,
    pub silence: SilenceCriterion,
    #[serde(serialize_with = "round2")]
    pub duration: f64,
    pub channels: String,
    #[serde(rename = "overallPass")]
    pub overall_pass: bool,
    pub summary: String,
}

impl ComplianceReport {
    /// 按展示顺序列出各项
    pub fn criteria(&self) -> [&dyn Criterion; 5] {
        [
            &self.format,
            &self.sample_rate,
            &self.loudness,
            &self.peak,
            &self.silence,
        ]
    }

    /// 未通过的门控项
    pub fn failed_criteria(&self) -> Vec<&'static str> {
        self.criteria()
            .into_iter()
            .filter(|c| c.passed() == Some(false))
            .map(|c| c.label())
            .collect()
    }
}

/// 执行判定
pub fn evaluate(spec: &ComplianceSpec, m: &Measurements) -> ComplianceReport {
    let meta = &m.metadata;

    let format = evaluate_format(spec, meta, &m.cbr);
    let sample_rate = evaluate_sample_rate(spec, meta.sample_rate);
    let loudness = evaluate_loudness(spec, m.integrated_loudness);
    let peak = evaluate_peak(spec, m.peak_db);
    let silence = SilenceCriterion {
        lead: m.silence.lead,
        trail: m.silence.trail,
        message: format!("{:.2}s lead, {:.2}s trail", m.silence.lead, m.silence.trail),
    };

    let overall_pass = format.ok && sample_rate.ok && loudness.ok && peak.ok;
    let summary = if overall_pass {
        format!("{} Compliant ✓", spec.name)
    } else {
        format!("Not {} Compliant ✗", spec.name)
    };

    ComplianceReport {
        format,
        sample_rate,
        loudness,
        peak,
        silence,
        duration: meta.duration,
        channels: meta.channel_label(),
        overall_pass,
        summary,
    }
}

fn evaluate_format(spec: &ComplianceSpec, meta: &AudioMetadata, cbr: &CbrVerdict) -> FormatCriterion {
    let is_mp3 = meta.is_mp3();
    let ok = spec.format_ok(is_mp3, meta.bit_rate, cbr.is_cbr);
    let kbps = meta.bit_rate as f64 / 1000.0;

    let mut message = if is_mp3 {
        format!(
            "MP3 @ {}kbps {}",
            kbps.round() as u64,
            if cbr.is_cbr { "CBR" } else { "VBR" }
        )
    } else {
        meta.container_format.clone()
    };
    if !ok {
        message.push_str(&format!(
            " (required: MP3 ≥ {}kbps CBR)",
            spec.bitrate_minimum_kbps()
        ));
    }

    FormatCriterion {
        value: meta.container_format.clone(),
        codec: meta.codec.clone(),
        bitrate: meta.bit_rate,
        bitrate_kbps: kbps,
        cbr: cbr.is_cbr,
        ok,
        is_mp3,
        message,
    }
}

fn evaluate_sample_rate(spec: &ComplianceSpec, sample_rate: u32) -> SampleRateCriterion {
    let ok = spec.sample_rate_ok(sample_rate);
    let message = if ok {
        format!("{sample_rate} Hz ✓")
    } else {
        format!(
            "{sample_rate} Hz (required: {} Hz)",
            spec.sample_rate_required
        )
    };
    SampleRateCriterion {
        value: sample_rate,
        ok,
        required: spec.sample_rate_required,
        message,
    }
}

fn evaluate_loudness(spec: &ComplianceSpec, lufs: f64) -> LoudnessCriterion {
    let ok = spec.loudness_ok(lufs);
    let message = if ok {
        format!("{lufs:.2} LUFS ✓")
    } else {
        format!(
            "{lufs:.2} LUFS (must be between {:.1} and {:.1} LUFS)",
            spec.loudness_min, spec.loudness_max
        )
    };
    LoudnessCriterion {
        value: lufs,
        ok,
        range: [spec.loudness_min, spec.loudness_max],
        message,
    }
}

fn evaluate_peak(spec: &ComplianceSpec, peak_db: f64) -> PeakCriterion {
    let ok = spec.peak_ok(peak_db);
    let message = if ok {
        format!("{peak_db:.2} dB ✓")
    } else {
        format!("{peak_db:.2} dB (must be ≤ {:.1} dB)", spec.peak_max)
    };
    PeakCriterion {
        value: peak_db,
        ok,
        max: spec.peak_max,
        message,
    }
}

/// 保留 `places` 位小数
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// 非有限值（静音文件的峰值）输出为 null
fn round2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(round_to(*value, 2))
    } else {
        serializer.serialize_none()
    }
}

fn round1<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 1))
}
