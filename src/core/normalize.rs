//! 位深感知的样本归一化
//!
//! 原始整数除以 `2^(bit_depth−1)`：正满幅映射到略小于1.0，负满幅映射到−1.0。
//! 8位及未识别的位深不做缩放（原样透传）。

use crate::audio::{RawPcm, SampleBuffer};

/// 给定位深的归一化除数；不缩放的位深返回 `None`
#[inline]
pub fn normalization_divisor(bit_depth: u16) -> Option<f64> {
    match bit_depth {
        16 => Some((1u64 << 15) as f64),
        24 => Some((1u64 << 23) as f64),
        32 => Some((1u64 << 31) as f64),
        _ => None,
    }
}

/// 归一化单个样本（f64 精度，32位满幅仍严格小于1.0）
#[inline]
pub fn normalize_sample(raw: i32, bit_depth: u16) -> f64 {
    match normalization_divisor(bit_depth) {
        Some(divisor) => raw as f64 / divisor,
        None => raw as f64,
    }
}

/// 消耗原始PCM，生成归一化缓冲区
///
/// 原始缓冲在此处释放，峰值/静音分析只持有浮点副本。
pub fn normalize(raw: RawPcm) -> SampleBuffer {
    let RawPcm {
        samples,
        frame_rate,
        bit_depth,
        channels,
    } = raw;

    let samples = samples
        .into_iter()
        .map(|s| normalize_sample(s, bit_depth))
        .collect();

    SampleBuffer {
        samples,
        frame_rate,
        bit_depth,
        channel_count: channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_per_depth() {
        for (bits, max, min) in [
            (16u16, i16::MAX as i32, i16::MIN as i32),
            (24, 8_388_607, -8_388_608),
            (32, i32::MAX, i32::MIN),
        ] {
            let pos = normalize_sample(max, bits);
            assert!(pos < 1.0, "{bits}-bit full scale must stay below 1.0");
            assert!(pos > 1.0 - 2.0 * 2f64.powi(-(bits as i32 - 1)));
            assert_eq!(normalize_sample(min, bits), -1.0);
            assert_eq!(normalize_sample(0, bits), 0.0);
        }
    }

    #[test]
    fn test_eight_bit_and_unknown_pass_through() {
        assert_eq!(normalization_divisor(8), None);
        assert_eq!(normalization_divisor(12), None);
        assert_eq!(normalize_sample(-100, 8), -100.0);
        assert_eq!(normalize_sample(5, 20), 5.0);
    }

    #[test]
    fn test_normalize_buffer() {
        let raw = RawPcm::new(vec![0, 16384, -32768, 32767], 44100, 16, 2);
        let buffer = normalize(raw);
        assert_eq!(buffer.samples, vec![0.0, 0.5, -1.0, 32767.0 / 32768.0]);
        assert_eq!(buffer.frame_rate, 44100);
        assert_eq!(buffer.bit_depth, 16);
        assert_eq!(buffer.channel_count, 2);
    }

    #[test]
    fn test_32bit_full_scale_buffer_stays_below_one() {
        let raw = RawPcm::new(vec![i32::MAX, 8_388_607 << 8, i32::MIN], 44100, 32, 1);
        let buffer = normalize(raw);

        assert!(buffer.samples[0] < 1.0, "{}", buffer.samples[0]);
        assert!(buffer.samples[1] < buffer.samples[0]);
        assert_eq!(buffer.samples[2], -1.0);
    }
}
