//! 元数据探测
//!
//! 通过 ffprobe 的 JSON 输出获取容器/编解码器/流信息。

use serde_json::Value;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, warn};

use super::external::{ToolError, ToolPaths, run_tool};
use super::format::AudioMetadata;
use crate::error::{AnalysisError, AnalysisResult, probe_failure};
use crate::tools::constants::timeouts;

/// 元数据探测能力
pub trait MediaProber: Send + Sync {
    /// 探测文件，返回第一个音频流的元数据
    fn probe(&self, path: &Path) -> AnalysisResult<AudioMetadata>;
}

/// 基于 ffprobe 的探测器
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe: std::path::PathBuf,
    timeout: Duration,
    validation_timeout: Duration,
}

impl FfprobeProber {
    pub fn new(paths: &ToolPaths) -> Self {
        Self {
            ffprobe: paths.ffprobe.clone(),
            timeout: timeouts::PROBE,
            validation_timeout: timeouts::VALIDATION,
        }
    }

    pub fn with_timeouts(mut self, probe: Duration, validation: Duration) -> Self {
        self.timeout = probe;
        self.validation_timeout = validation;
        self
    }

    /// 快速校验文件是否包含音频流
    ///
    /// 任何失败（超时、工具错误、输出损坏）都视为"无效"，不抛错。
    pub fn has_audio_stream(&self, path: &Path) -> bool {
        let mut command = Command::new(&self.ffprobe);
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path);

        match run_tool(command, self.validation_timeout) {
            Ok(output) => serde_json::from_slice::<Value>(&output.stdout)
                .map(|value| find_audio_stream(&value).is_some())
                .unwrap_or(false),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "audio validation probe failed");
                false
            }
        }
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> AnalysisResult<AudioMetadata> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path);

        let output = run_tool(command, self.timeout).map_err(|e| match e {
            ToolError::Timeout { timeout, .. } => AnalysisError::ProbeTimeout {
                path: path.to_path_buf(),
                timeout,
            },
            other => probe_failure(path, other),
        })?;

        if !output.success {
            debug!(stderr = %output.stderr_preview(), "ffprobe stderr");
            return Err(probe_failure(
                path,
                format!("ffprobe exited with {}", output.status_text),
            ));
        }

        parse_probe_json(path, &output.stdout)
    }
}

/// 解析 `ffprobe -show_format -show_streams -print_format json` 的输出
pub fn parse_probe_json(path: &Path, json: &[u8]) -> AnalysisResult<AudioMetadata> {
    let value: Value = serde_json::from_slice(json)
        .map_err(|e| probe_failure(path, format!("unparseable ffprobe JSON: {e}")))?;

    if !value.is_object() {
        return Err(probe_failure(path, "ffprobe JSON is not an object"));
    }

    let stream = find_audio_stream(&value).ok_or_else(|| AnalysisError::NoAudioStream {
        path: path.to_path_buf(),
    })?;
    let format = value.get("format").unwrap_or(&Value::Null);

    let sample_rate = match stream.get("sample_rate") {
        None | Some(Value::Null) => 0,
        Some(raw) => parse_u64(Some(raw))
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| probe_failure(path, format!("invalid sample_rate: {raw}")))?,
    };

    let stream_bit_rate = parse_u64(stream.get("bit_rate"));
    let container_bit_rate = parse_u64(format.get("bit_rate"));
    let bit_rate = match stream_bit_rate {
        Some(v) if v > 0 => v,
        _ => container_bit_rate.unwrap_or(0),
    };

    Ok(AudioMetadata {
        codec: parse_string(stream.get("codec_name")).unwrap_or_else(|| "unknown".to_string()),
        sample_rate,
        channels: parse_u64(stream.get("channels"))
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(0),
        channel_layout: parse_string(stream.get("channel_layout"))
            .unwrap_or_else(|| "unknown".to_string()),
        bit_rate,
        duration: parse_f64(format.get("duration"))
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(0.0),
        container_format: parse_string(format.get("format_name"))
            .unwrap_or_else(|| "unknown".to_string()),
        stream_bit_rate,
        container_bit_rate,
    })
}

fn find_audio_stream(value: &Value) -> Option<&Value> {
    value
        .get("streams")
        .and_then(|v| v.as_array())?
        .iter()
        .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"))
}

// ffprobe 把大部分数值输出为字符串
fn parse_u64(value: Option<&Value>) -> Option<u64> {
    match value {
        Some(Value::Number(num)) => num.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn parse_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(num)) => num.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_string(value: Option<&Value>) -> Option<String> {
    value.and_then(|v| v.as_str()).map(ToOwned::to_owned)
}
