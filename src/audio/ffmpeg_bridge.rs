//! FFmpeg桥接解码器
//!
//! 为symphonia不支持的格式（WMA、部分AAC封装等）提供ffmpeg回退：
//! 先用ffprobe取得采样率/声道数，再让ffmpeg把音频转为 s16le 输出到stdout。

use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::debug;

use super::external::{ToolPaths, run_tool};
use super::format::RawPcm;
use super::probe::{FfprobeProber, MediaProber};
use super::universal_decoder::PcmDecoder;
use crate::error::{AnalysisResult, decode_failure};
use crate::tools::constants::timeouts;

/// FFmpeg安装指南（跨平台）
pub const FFMPEG_INSTALL_GUIDE: &str = r#"
FFmpeg/ffprobe is required for probing and loudness measurement / 需要安装FFmpeg（含ffprobe）

Installation / 安装方法:
  macOS:   brew install ffmpeg
  Windows: winget install Gyan.FFmpeg
  Linux:
    - Ubuntu/Debian: sudo apt install ffmpeg
    - Fedora/RHEL:   sudo dnf install ffmpeg
    - Arch:          sudo pacman -S ffmpeg

Official site / 官方网站: https://ffmpeg.org/download.html
"#;

/// ffmpeg 子进程解码器，输出固定为16位
#[derive(Debug, Clone)]
pub struct FfmpegPcmDecoder {
    ffmpeg: std::path::PathBuf,
    prober: FfprobeProber,
    timeout: Duration,
}

impl FfmpegPcmDecoder {
    pub fn new(paths: &ToolPaths) -> Self {
        Self {
            ffmpeg: paths.ffmpeg.clone(),
            prober: FfprobeProber::new(paths),
            timeout: timeouts::DECODE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 解码前的采样率/声道探测等待上限
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.prober = self.prober.with_timeouts(timeout, timeout);
        self
    }

    /// S16LE字节转整数样本（小端序），末尾不完整的字节被丢弃
    fn convert_s16le(bytes: &[u8]) -> Vec<i32> {
        bytes
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as i32)
            .collect()
    }
}

impl PcmDecoder for FfmpegPcmDecoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn decode(&self, path: &Path) -> AnalysisResult<RawPcm> {
        // 任何探测错误在解码阶段都归为解码失败
        let meta = self
            .prober
            .probe(path)
            .map_err(|e| decode_failure(path, e))?;
        if meta.sample_rate == 0 || meta.channels == 0 {
            return Err(decode_failure(
                path,
                "无法确定采样率或声道数 / unknown rate or channels",
            ));
        }

        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "s16le", "-acodec", "pcm_s16le", "-"]);

        let output = run_tool(command, self.timeout).map_err(|e| decode_failure(path, e))?;
        if !output.success {
            debug!(stderr = %output.stderr_preview(), "ffmpeg decode stderr");
            return Err(decode_failure(
                path,
                format!("ffmpeg exited with {}", output.status_text),
            ));
        }

        let samples = Self::convert_s16le(&output.stdout);
        if samples.is_empty() {
            return Err(decode_failure(path, "ffmpeg produced no audio / 无音频输出"));
        }

        Ok(RawPcm::new(samples, meta.sample_rate, 16, meta.channels))
    }
}
