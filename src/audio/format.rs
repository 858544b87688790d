//! 音频格式信息模块
//!
//! 定义探测元数据、原始PCM与归一化样本缓冲区

use serde::Serialize;

/// 探测得到的音频元数据（每次分析产生一次，之后只读）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioMetadata {
    /// 编解码器名称（ffprobe `codec_name`）
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub channel_layout: String,
    /// 有效比特率（bit/s）：流级优先，缺失或为0时回退到容器级，未知为0
    pub bit_rate: u64,
    /// 时长（秒，≥0）
    pub duration: f64,
    /// 容器格式名（ffprobe `format_name`，可能是逗号分隔的列表）
    pub container_format: String,
    /// 流级比特率原始值（CBR判定证据）
    pub stream_bit_rate: Option<u64>,
    /// 容器级比特率原始值（CBR判定证据）
    pub container_bit_rate: Option<u64>,
}

impl AudioMetadata {
    /// 是否为MP3（容器名包含mp3，或编解码器为mp3）
    pub fn is_mp3(&self) -> bool {
        self.container_format.to_lowercase().contains("mp3") || self.codec == "mp3"
    }

    /// 声道配置的可读标签
    pub fn channel_label(&self) -> String {
        match self.channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            n => format!("{n} channels"),
        }
    }
}

/// 解码得到的交错整数PCM
///
/// 8位无符号PCM已在解码层减去128偏置，其余为原始有符号整数值。
#[derive(Debug, Clone, PartialEq)]
pub struct RawPcm {
    pub samples: Vec<i32>,
    pub frame_rate: u32,
    /// 源音频的位深度（8/16/24/32，其他值按"未识别"处理）
    pub bit_depth: u16,
    pub channels: u16,
}

impl RawPcm {
    pub fn new(samples: Vec<i32>, frame_rate: u32, bit_depth: u16, channels: u16) -> Self {
        Self {
            samples,
            frame_rate,
            bit_depth,
            channels,
        }
    }

    /// 每声道帧数
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// 归一化到 [-1.0, 1.0] 的交错浮点样本
///
/// 仅在单次分析中存在，分析结束即释放。
/// 使用 f64：f32 会把32位正满幅（`i32::MAX / 2^31`）舍入为1.0。
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f64>,
    pub frame_rate: u32,
    pub bit_depth: u16,
    pub channel_count: u16,
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(codec: &str, container: &str, channels: u16) -> AudioMetadata {
        AudioMetadata {
            codec: codec.to_string(),
            sample_rate: 44100,
            channels,
            channel_layout: "stereo".to_string(),
            bit_rate: 192_000,
            duration: 60.0,
            container_format: container.to_string(),
            stream_bit_rate: Some(192_000),
            container_bit_rate: Some(192_000),
        }
    }

    #[test]
    fn test_is_mp3() {
        assert!(metadata("mp3", "mp3", 2).is_mp3());
        // 容器名大小写不敏感
        assert!(metadata("mp3float", "MP3", 2).is_mp3());
        // 仅编解码器为mp3（例如封装在其他容器中）
        assert!(metadata("mp3", "matroska,webm", 2).is_mp3());
        assert!(!metadata("pcm_s16le", "wav", 2).is_mp3());
        assert!(!metadata("aac", "mov,mp4,m4a,3gp,3g2,mj2", 2).is_mp3());
    }

    #[test]
    fn test_channel_label() {
        assert_eq!(metadata("mp3", "mp3", 1).channel_label(), "mono");
        assert_eq!(metadata("mp3", "mp3", 2).channel_label(), "stereo");
        assert_eq!(metadata("mp3", "mp3", 6).channel_label(), "6 channels");
    }

    #[test]
    fn test_raw_frame_count() {
        let raw = RawPcm::new(vec![0; 10], 44100, 16, 2);
        assert_eq!(raw.frame_count(), 5);
        let raw = RawPcm::new(vec![0; 10], 44100, 16, 0);
        assert_eq!(raw.frame_count(), 0);
    }
}
