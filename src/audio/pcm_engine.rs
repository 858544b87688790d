//! PCM处理引擎模块
//!
//! 进程内解码：整数WAV走hound快速路径，其余格式交给symphonia。
//! 输出统一为交错的原始整数样本 + 位深度，归一化在core层完成。

use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::format::RawPcm;
use super::universal_decoder::PcmDecoder;
use crate::error::{AnalysisResult, decode_failure};
use crate::tools::constants::analysis::DEFAULT_FLOAT_QUANTIZE_BITS;

/// symphonia/hound 进程内解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaPcmDecoder;

impl SymphoniaPcmDecoder {
    pub fn new() -> Self {
        Self
    }

    /// hound 快速路径：仅处理整数PCM的WAV
    ///
    /// 返回 `None` 表示应交给symphonia（非WAV、浮点WAV或hound无法打开）。
    fn decode_with_hound(&self, path: &Path) -> Option<AnalysisResult<RawPcm>> {
        let is_wav = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if !is_wav {
            return None;
        }

        let reader = hound::WavReader::open(path).ok()?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int {
            return None;
        }

        // hound 已把8位无符号样本转换为有符号
        let samples: Result<Vec<i32>, _> = reader.into_samples::<i32>().collect();
        Some(
            samples
                .map(|samples| {
                    RawPcm::new(samples, spec.sample_rate, spec.bits_per_sample, spec.channels)
                })
                .map_err(|e| decode_failure(path, format!("WAV解码错误 / WAV decode error: {e}"))),
        )
    }

    fn decode_with_symphonia(&self, path: &Path) -> AnalysisResult<RawPcm> {
        let file = std::fs::File::open(path).map_err(|e| decode_failure(path, e))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension() {
            hint.with_extension(&extension.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_failure(path, format!("格式探测失败 / format probe failed: {e}")))?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| decode_failure(path, "未找到音频轨道 / no audio track"))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let quantize_bits = codec_params
            .bits_per_sample
            .map(|b| b as u16)
            .filter(|b| (8..=32).contains(b))
            .unwrap_or(DEFAULT_FLOAT_QUANTIZE_BITS);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| decode_failure(path, format!("创建解码器失败 / no decoder: {e}")))?;

        let mut samples: Vec<i32> = Vec::new();
        let mut bit_depth: Option<u16> = None;
        let mut frame_rate = codec_params.sample_rate.unwrap_or(0);
        let mut channels = codec_params
            .channels
            .map(|ch| ch.count() as u16)
            .unwrap_or(0);
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(decode_failure(path, format!("symphonia错误: {e}"))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(audio_buf) => {
                    let spec = audio_buf.spec();
                    frame_rate = spec.rate;
                    channels = spec.channels.count() as u16;
                    let depth = append_interleaved(&audio_buf, quantize_bits, &mut samples);
                    bit_depth.get_or_insert(depth);
                }
                Err(SymphoniaError::DecodeError(_)) => {
                    // 损坏的包跳过，继续解码
                    skipped_packets += 1;
                }
                Err(SymphoniaError::ResetRequired) => decoder.reset(),
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(decode_failure(path, format!("symphonia错误: {e}"))),
            }
        }

        if skipped_packets > 0 {
            debug!(path = %path.display(), skipped_packets, "skipped undecodable packets");
        }

        let bit_depth = bit_depth
            .ok_or_else(|| decode_failure(path, "没有可解码的音频数据 / no decodable audio"))?;
        if frame_rate == 0 || channels == 0 {
            return Err(decode_failure(path, "无法确定采样率或声道数 / unknown rate or channels"));
        }

        Ok(RawPcm::new(samples, frame_rate, bit_depth, channels))
    }
}

impl PcmDecoder for SymphoniaPcmDecoder {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn decode(&self, path: &Path) -> AnalysisResult<RawPcm> {
        if let Some(result) = self.decode_with_hound(path) {
            return result;
        }
        self.decode_with_symphonia(path)
    }
}

/// 将浮点样本量化为 `bits` 位有符号整数
#[inline]
fn quantize(sample: f64, bits: u16) -> i32 {
    let scale = (1i64 << (bits - 1)) as f64;
    (sample * scale).round().clamp(-scale, scale - 1.0) as i32
}

/// 转换symphonia缓冲区为交错整数格式，返回该缓冲区的位深度
///
/// 无符号格式减去中点偏置；浮点格式按 `quantize_bits` 量化。
fn append_interleaved(audio_buf: &AudioBufferRef, quantize_bits: u16, out: &mut Vec<i32>) -> u16 {
    macro_rules! interleave {
        ($buf:expr, $converter:expr) => {{
            let channel_count = $buf.spec().channels.count();
            let frame_count = $buf.frames();
            out.reserve(channel_count * frame_count);
            for frame in 0..frame_count {
                for ch in 0..channel_count {
                    out.push($converter($buf.chan(ch)[frame]));
                }
            }
        }};
    }

    match audio_buf {
        AudioBufferRef::S8(buf) => {
            interleave!(buf, |s: i8| s as i32);
            8
        }
        AudioBufferRef::U8(buf) => {
            interleave!(buf, |s: u8| s as i32 - 128);
            8
        }
        AudioBufferRef::S16(buf) => {
            interleave!(buf, |s: i16| s as i32);
            16
        }
        AudioBufferRef::U16(buf) => {
            interleave!(buf, |s: u16| s as i32 - 32768);
            16
        }
        AudioBufferRef::S24(buf) => {
            interleave!(buf, |s: symphonia::core::sample::i24| s.inner());
            24
        }
        AudioBufferRef::U24(buf) => {
            interleave!(buf, |s: symphonia::core::sample::u24| s.inner() as i32
                - 8_388_608);
            24
        }
        AudioBufferRef::S32(buf) => {
            interleave!(buf, |s: i32| s);
            32
        }
        AudioBufferRef::U32(buf) => {
            interleave!(buf, |s: u32| (s as i64 - 2_147_483_648) as i32);
            32
        }
        AudioBufferRef::F32(buf) => {
            interleave!(buf, |s: f32| quantize(s as f64, quantize_bits));
            quantize_bits
        }
        AudioBufferRef::F64(buf) => {
            interleave!(buf, |s: f64| quantize(s, quantize_bits));
            quantize_bits
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_full_scale() {
        assert_eq!(quantize(0.0, 16), 0);
        assert_eq!(quantize(-1.0, 16), -32768);
        // 正满幅被钳制到最大可表示值
        assert_eq!(quantize(1.0, 16), 32767);
        assert_eq!(quantize(0.5, 16), 16384);
        assert_eq!(quantize(1.5, 24), 8_388_607);
        assert_eq!(quantize(-1.0, 32), i32::MIN);
        assert_eq!(quantize(1.0, 32), i32::MAX);
    }

    #[test]
    fn test_missing_file_is_decode_failure() {
        let err = SymphoniaPcmDecoder::new()
            .decode(Path::new("/nonexistent/chapter01.flac"))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::AnalysisError::DecodeFailure { .. }
        ));
    }
}
