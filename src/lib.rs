//! ACX Compliance Checker
//!
//! 按有声书出版标准（ACX）检查音频文件，输出逐项判定的结构化报告。
//!
//! ## 检查项
//! - 格式：MP3、比特率 ≥ 192kbps、恒定比特率（CBR）
//! - 采样率：精确等于 44100 Hz
//! - 积分响度（ITU-R BS.1770）：−23 ~ −18 LUFS（闭区间）
//! - 峰值：≤ −3 dB
//! - 首尾静音：仅供参考，不参与总判定
//!
//! 外部能力（ffprobe探测、ffmpeg ebur128响度、PCM解码）以trait注入，
//! 三条分析分支由rayon并发执行。

pub mod audio;
pub mod core;
pub mod error;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use audio::{AudioMetadata, LoudnessMeter, MediaProber, PcmDecoder, RawPcm, SampleBuffer};
pub use core::{ComplianceReport, ComplianceSpec, evaluate};
pub use error::{AnalysisError, AnalysisResult, ErrorCategory, Stage};
pub use processing::{AnalysisDetails, AnalyzerConfig, ComplianceAnalyzer};
