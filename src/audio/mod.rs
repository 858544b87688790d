//! 音频能力模块
//!
//! 外部能力（元数据探测、响度测量、PCM解码）均以单操作trait暴露，
//! 分析流水线只依赖trait，测试可替换为假实现。

mod external;
mod ffmpeg_bridge;
mod format;
mod loudness;
mod pcm_engine;
mod probe;

pub mod universal_decoder;

pub use external::{ToolError, ToolOutput, ToolPaths, ToolStatus, run_tool};
pub use ffmpeg_bridge::{FFMPEG_INSTALL_GUIDE, FfmpegPcmDecoder};
pub use format::{AudioMetadata, RawPcm, SampleBuffer};
pub use loudness::{Ebur128Meter, LoudnessMeter, parse_integrated_loudness};
pub use pcm_engine::SymphoniaPcmDecoder;
pub use probe::{FfprobeProber, MediaProber, parse_probe_json};
pub use universal_decoder::{DecoderBackend, PcmDecoder, UniversalDecoder};
