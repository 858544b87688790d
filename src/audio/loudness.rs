//! 积分响度测量（ITU-R BS.1770）
//!
//! 调用 ffmpeg 的 ebur128 滤镜扫描整个文件，从其文本报告中提取
//! Summary 段的积分响度 `I: <value> LUFS`。逐帧行中的 M/S/I 读数不会被匹配。

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use super::external::{ToolError, ToolPaths, run_tool};
use crate::error::{AnalysisError, AnalysisResult, loudness_parse_error};
use crate::tools::constants::timeouts;

/// 积分响度摘要行：整行只有 `I: <数值> LUFS`
static SUMMARY_I_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*I:\s*(\S+?)\s*LUFS\s*$").expect("static regex")
});

/// 响度测量能力
pub trait LoudnessMeter: Send + Sync {
    /// 整个文件的积分响度（LUFS）
    fn integrated_loudness(&self, path: &Path) -> AnalysisResult<f64>;
}

/// 基于 ffmpeg ebur128 滤镜的响度计
#[derive(Debug, Clone)]
pub struct Ebur128Meter {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl Ebur128Meter {
    pub fn new(paths: &ToolPaths) -> Self {
        Self {
            ffmpeg: paths.ffmpeg.clone(),
            timeout: timeouts::LOUDNESS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl LoudnessMeter for Ebur128Meter {
    fn integrated_loudness(&self, path: &Path) -> AnalysisResult<f64> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-nostats", "-hide_banner", "-i"])
            .arg(path)
            .args(["-af", "ebur128=framelog=verbose", "-f", "null", "-"]);

        let output = run_tool(command, self.timeout).map_err(|e| match e {
            ToolError::Timeout { timeout, .. } => AnalysisError::LoudnessTimeout {
                path: path.to_path_buf(),
                timeout,
            },
            other => loudness_parse_error(path, other),
        })?;

        // ebur128 报告写在 stderr
        let report = output.stderr_lossy();
        match parse_integrated_loudness(&report) {
            Some(Ok(lufs)) => Ok(lufs),
            Some(Err(token)) => Err(loudness_parse_error(
                path,
                format!("malformed integrated loudness value '{token}'"),
            )),
            None => {
                debug!(stderr = %output.stderr_preview(), "ebur128 report without summary");
                let reason = if output.success {
                    "no integrated loudness figure in meter output".to_string()
                } else {
                    format!("loudness meter exited with {}", output.status_text)
                };
                Err(loudness_parse_error(path, reason))
            }
        }
    }
}

/// 从 ebur128 报告中提取积分响度
///
/// - `None`：报告里没有积分响度行
/// - `Some(Err(token))`：找到了但数值无法解析（不做静默默认）
/// - 出现多个摘要时以最后一个为准
pub fn parse_integrated_loudness(report: &str) -> Option<Result<f64, String>> {
    let token = SUMMARY_I_REGEX
        .captures_iter(report)
        .filter_map(|caps| caps.get(1))
        .last()?
        .as_str();

    Some(parse_lufs_token(token).ok_or_else(|| token.to_string()))
}

fn parse_lufs_token(token: &str) -> Option<f64> {
    let value = token.trim().parse::<f64>().ok()?;
    if value.is_nan() { None } else { Some(value) }
}
