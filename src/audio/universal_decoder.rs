//! 统一音频解码器
//!
//! 定义PCM解码能力，并提供按优先级依次尝试多个后端的解码链。

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use super::external::ToolPaths;
use super::ffmpeg_bridge::FfmpegPcmDecoder;
use super::format::RawPcm;
use super::pcm_engine::SymphoniaPcmDecoder;
use crate::error::{AnalysisResult, decode_failure};

/// PCM解码能力
pub trait PcmDecoder: Send + Sync {
    /// 后端名称（用于日志）
    fn name(&self) -> &'static str;

    /// 完整解码文件为交错整数PCM
    fn decode(&self, path: &Path) -> AnalysisResult<RawPcm>;
}

/// 解码后端选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderBackend {
    /// symphonia优先，失败后回退ffmpeg
    #[default]
    Auto,
    /// 仅进程内解码
    Symphonia,
    /// 仅ffmpeg子进程
    Ffmpeg,
}

impl DecoderBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Symphonia => "symphonia",
            Self::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for DecoderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DecoderBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "symphonia" => Ok(Self::Symphonia),
            "ffmpeg" => Ok(Self::Ffmpeg),
            other => Err(format!(
                "未知解码后端 / unknown decoder backend '{other}' (auto|symphonia|ffmpeg)"
            )),
        }
    }
}

/// 统一解码器：按注册顺序尝试各后端，第一个成功者胜出
pub struct UniversalDecoder {
    decoders: Vec<Box<dyn PcmDecoder>>,
}

impl UniversalDecoder {
    /// 根据后端选择构建解码链
    ///
    /// `probe_timeout` 用于ffmpeg回退解码前的ffprobe调用。
    pub fn for_backend(
        backend: DecoderBackend,
        paths: &ToolPaths,
        probe_timeout: Duration,
        decode_timeout: Duration,
    ) -> Self {
        let ffmpeg = || -> Box<dyn PcmDecoder> {
            Box::new(
                FfmpegPcmDecoder::new(paths)
                    .with_probe_timeout(probe_timeout)
                    .with_timeout(decode_timeout),
            )
        };

        let decoders: Vec<Box<dyn PcmDecoder>> = match backend {
            DecoderBackend::Auto => vec![Box::new(SymphoniaPcmDecoder::new()), ffmpeg()],
            DecoderBackend::Symphonia => vec![Box::new(SymphoniaPcmDecoder::new())],
            DecoderBackend::Ffmpeg => vec![ffmpeg()],
        };

        Self { decoders }
    }

    /// 添加自定义解码器（追加到链尾）
    pub fn add_decoder(&mut self, decoder: Box<dyn PcmDecoder>) {
        self.decoders.push(decoder);
    }

    /// 已注册的后端名称（按尝试顺序）
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }
}

impl PcmDecoder for UniversalDecoder {
    fn name(&self) -> &'static str {
        "universal"
    }

    fn decode(&self, path: &Path) -> AnalysisResult<RawPcm> {
        let mut last_error = None;

        for decoder in &self.decoders {
            match decoder.decode(path) {
                Ok(raw) => {
                    debug!(
                        backend = decoder.name(),
                        bit_depth = raw.bit_depth,
                        frames = raw.frame_count(),
                        "decoded"
                    );
                    return Ok(raw);
                }
                Err(e) => {
                    warn!(backend = decoder.name(), error = %e, "decoder backend failed");
                    last_error = Some(e);
                }
            }
        }

        // 所有后端失败时报告最后一个错误
        Err(last_error.unwrap_or_else(|| decode_failure(path, "未注册解码器 / no decoder registered")))
    }
}
