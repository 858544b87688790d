//! 恒定比特率（CBR）判定
//!
//! 启发式：比较流级与容器级比特率的相对偏差。
//! 这不是真正的编码模式检测，证据不完整时一律乐观地判为CBR（fail-open）。

use serde::Serialize;
use tracing::warn;

use crate::audio::AudioMetadata;
use crate::tools::constants::analysis::CBR_MAX_VARIATION;

/// 判定所用的比特率证据（bit/s）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitrateEvidence {
    pub stream: Option<u64>,
    pub container: Option<u64>,
}

impl BitrateEvidence {
    pub fn new(stream: Option<u64>, container: Option<u64>) -> Self {
        Self { stream, container }
    }

    /// 复用一次探测得到的证据
    pub fn from_metadata(meta: &AudioMetadata) -> Self {
        Self::new(meta.stream_bit_rate, meta.container_bit_rate)
    }
}

/// 判定依据
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum CbrBasis {
    /// 由偏差计算得出
    Measured { variation: f64 },
    /// 只有流级比特率，乐观默认
    StreamOnly,
    /// 证据缺失或不可用，fail-open 默认
    Unavailable,
    /// 非MP3文件不做判定
    NotApplicable,
}

/// CBR判定结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CbrVerdict {
    pub is_cbr: bool,
    #[serde(flatten)]
    pub basis: CbrBasis,
}

impl CbrVerdict {
    pub fn not_applicable() -> Self {
        Self {
            is_cbr: true,
            basis: CbrBasis::NotApplicable,
        }
    }

    /// 判定是否依赖了默认值而非实测
    pub fn is_assumed(&self) -> bool {
        !matches!(self.basis, CbrBasis::Measured { .. })
    }
}

/// 相对偏差 `|stream − container| / stream`，要求两者已知且流级 > 0
pub fn bitrate_variation(evidence: &BitrateEvidence) -> Option<f64> {
    match (evidence.stream, evidence.container) {
        (Some(stream), Some(container)) if stream > 0 => {
            Some((stream as f64 - container as f64).abs() / stream as f64)
        }
        _ => None,
    }
}

/// 按 5% 偏差规则分类
///
/// 只有实测偏差 ≥ 5% 才会判为VBR，其余情况均为CBR。
pub fn classify(evidence: &BitrateEvidence) -> CbrVerdict {
    if let Some(variation) = bitrate_variation(evidence) {
        return CbrVerdict {
            is_cbr: variation < CBR_MAX_VARIATION,
            basis: CbrBasis::Measured { variation },
        };
    }

    match evidence.stream {
        Some(stream) if stream > 0 => CbrVerdict {
            is_cbr: true,
            basis: CbrBasis::StreamOnly,
        },
        _ => {
            warn!(
                stream = ?evidence.stream,
                container = ?evidence.container,
                "bitrate evidence unavailable, assuming constant bitrate"
            );
            CbrVerdict {
                is_cbr: true,
                basis: CbrBasis::Unavailable,
            }
        }
    }
}

/// 对探测结果执行判定；非MP3直接视为CBR
pub fn classify_metadata(meta: &AudioMetadata) -> CbrVerdict {
    if !meta.is_mp3() {
        return CbrVerdict::not_applicable();
    }
    classify(&BitrateEvidence::from_metadata(meta))
}
