//! 核心算法模块
//!
//! 包含CBR判定、样本归一化、峰值/静音分析与合规判定。
//! 本层全部为纯函数，不调用外部工具。

pub mod cbr;
pub mod compliance;
pub mod normalize;
pub mod peak;
pub mod silence;

// 重新导出公共接口
pub use cbr::{BitrateEvidence, CbrBasis, CbrVerdict, classify, classify_metadata};
pub use compliance::{
    ComplianceReport, ComplianceSpec, Criterion, FormatCriterion, LoudnessCriterion,
    Measurements, PeakCriterion, SampleRateCriterion, SilenceCriterion, evaluate,
};
pub use normalize::{normalization_divisor, normalize, normalize_sample};
pub use peak::calculate_peak;
pub use silence::{SilenceBounds, detect_silence};
