//! 统一错误处理框架
//!
//! 每个终止性错误都携带被分析文件的路径与失败阶段，便于运维定位。
//! 外部工具的原始输出不会进入错误消息（最多在debug日志中预览）。

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 分析流水线的阶段
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Stage {
    /// 输入校验（路径、参数、标准配置）
    Input,
    /// 元数据探测（ffprobe）
    Probe,
    /// 积分响度测量（ebur128）
    Loudness,
    /// PCM解码
    Decode,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Probe => "probe",
            Self::Loudness => "loudness",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 合规分析的统一错误类型
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 输入验证错误
    #[error("输入验证失败 / Invalid input: {0}")]
    InvalidInput(String),

    /// 文件I/O错误
    #[error("文件I/O错误 / I/O error: {0}")]
    Io(#[from] io::Error),

    /// 元数据探测超时
    #[error("元数据探测超时 / Probe timed out after {}s: {}", .timeout.as_secs(), .path.display())]
    ProbeTimeout { path: PathBuf, timeout: Duration },

    /// 探测工具失败或输出无法解析
    #[error("元数据探测失败 / Probe failed for {}: {reason}", .path.display())]
    ProbeFailure { path: PathBuf, reason: String },

    /// 文件中没有音频流
    #[error("未找到音频流 / No audio stream found in {}", .path.display())]
    NoAudioStream { path: PathBuf },

    /// 响度测量超时
    #[error("响度测量超时 / Loudness measurement timed out after {}s: {}", .timeout.as_secs(), .path.display())]
    LoudnessTimeout { path: PathBuf, timeout: Duration },

    /// 响度报告中找不到积分响度
    #[error("无法解析积分响度 / Could not extract integrated loudness for {}: {reason}", .path.display())]
    LoudnessParseError { path: PathBuf, reason: String },

    /// 解码失败
    #[error("音频解码失败 / Decode failed for {}: {reason}", .path.display())]
    DecodeFailure { path: PathBuf, reason: String },
}

impl AnalysisError {
    /// 失败所在的流水线阶段
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidInput(_) | Self::Io(_) => Stage::Input,
            Self::ProbeTimeout { .. } | Self::ProbeFailure { .. } | Self::NoAudioStream { .. } => {
                Stage::Probe
            }
            Self::LoudnessTimeout { .. } | Self::LoudnessParseError { .. } => Stage::Loudness,
            Self::DecodeFailure { .. } => Stage::Decode,
        }
    }

    /// 是否为超时类错误
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ProbeTimeout { .. } | Self::LoudnessTimeout { .. }
        )
    }
}

/// 合规分析操作的标准Result类型
pub type AnalysisResult<T> = Result<T, AnalysisError>;

// ==================== 错误构造Helper函数 ====================

/// 创建探测失败错误
#[inline]
pub fn probe_failure<E: fmt::Display>(path: impl Into<PathBuf>, err: E) -> AnalysisError {
    AnalysisError::ProbeFailure {
        path: path.into(),
        reason: err.to_string(),
    }
}

/// 创建解码失败错误
#[inline]
pub fn decode_failure<E: fmt::Display>(path: impl Into<PathBuf>, err: E) -> AnalysisError {
    AnalysisError::DecodeFailure {
        path: path.into(),
        reason: err.to_string(),
    }
}

/// 创建响度解析错误
#[inline]
pub fn loudness_parse_error<E: fmt::Display>(path: impl Into<PathBuf>, err: E) -> AnalysisError {
    AnalysisError::LoudnessParseError {
        path: path.into(),
        reason: err.to_string(),
    }
}

// ==================== 错误分类系统 ====================
// 用于批量处理中的错误统计和退出码映射

/// 错误类别枚举
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 外部工具超时
    Timeout,
    /// 探测/格式相关错误（无音频流、ffprobe失败）
    Format,
    /// 响度测量相关错误
    Loudness,
    /// 解码相关错误
    Decoding,
    /// I/O相关错误
    Io,
    /// 其他未分类错误（参数、配置）
    Other,
}

impl ErrorCategory {
    /// 从AnalysisError提取错误类别
    pub fn from_analysis_error(e: &AnalysisError) -> Self {
        match e {
            AnalysisError::ProbeTimeout { .. } | AnalysisError::LoudnessTimeout { .. } => {
                Self::Timeout
            }
            AnalysisError::ProbeFailure { .. } | AnalysisError::NoAudioStream { .. } => {
                Self::Format
            }
            AnalysisError::LoudnessParseError { .. } => Self::Loudness,
            AnalysisError::DecodeFailure { .. } => Self::Decoding,
            AnalysisError::Io(_) => Self::Io,
            AnalysisError::InvalidInput(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Timeout => "超时 / Timeout",
            Self::Format => "格式错误 / Format",
            Self::Loudness => "响度错误 / Loudness",
            Self::Decoding => "解码错误 / Decoding",
            Self::Io => "I/O错误 / I/O",
            Self::Other => "其他错误 / Other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        let path = PathBuf::from("book.mp3");
        let err = AnalysisError::NoAudioStream { path: path.clone() };
        assert_eq!(err.stage(), Stage::Probe);

        let err = AnalysisError::LoudnessTimeout {
            path: path.clone(),
            timeout: Duration::from_secs(120),
        };
        assert_eq!(err.stage(), Stage::Loudness);
        assert!(err.is_timeout());

        let err = decode_failure(&path, "truncated frame");
        assert_eq!(err.stage(), Stage::Decode);
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_message_carries_path() {
        let err = AnalysisError::ProbeTimeout {
            path: PathBuf::from("/uploads/chapter01.mp3"),
            timeout: Duration::from_secs(30),
        };
        let msg = err.to_string();
        assert!(msg.contains("chapter01.mp3"));
        assert!(msg.contains("30s"));
    }

    #[test]
    fn test_category_mapping() {
        let err = loudness_parse_error("a.mp3", "no summary");
        assert_eq!(
            ErrorCategory::from_analysis_error(&err),
            ErrorCategory::Loudness
        );

        let err = AnalysisError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(ErrorCategory::from_analysis_error(&err), ErrorCategory::Io);
        assert_eq!(err.stage(), Stage::Input);
    }
}
