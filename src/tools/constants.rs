//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

use std::time::Duration;

/// 外部工具等待上限
pub mod timeouts {
    use super::Duration;

    /// 元数据探测（ffprobe）
    pub const PROBE: Duration = Duration::from_secs(30);

    /// 积分响度测量（ffmpeg ebur128，需要完整读一遍文件）
    pub const LOUDNESS: Duration = Duration::from_secs(120);

    /// ffmpeg PCM 解码
    pub const DECODE: Duration = Duration::from_secs(120);

    /// 快速有效性校验（是否存在音频流）
    pub const VALIDATION: Duration = Duration::from_secs(10);

    /// 工具可用性检查（`-version`）
    pub const TOOL_CHECK: Duration = Duration::from_secs(5);
}

/// 子进程管理
pub mod process {
    use super::Duration;

    /// `try_wait` 轮询间隔
    pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

    /// 超时后等待 `kill(1)` 结束进程组的上限
    pub const GROUP_KILL_WAIT: Duration = Duration::from_secs(1);

    /// debug日志中 stderr 预览的最大字符数
    pub const STDERR_PREVIEW_CHARS: usize = 300;
}

/// 分析算法常量
pub mod analysis {
    /// 默认静音阈值（dB）
    pub const SILENCE_THRESHOLD_DB: f64 = -40.0;

    /// CBR判定：流级与容器级比特率相对偏差上限（严格小于）
    pub const CBR_MAX_VARIATION: f64 = 0.05;

    /// 浮点解码器未声明位深时的量化位深
    pub const DEFAULT_FLOAT_QUANTIZE_BITS: u16 = 16;
}

/// 默认配置值
pub mod defaults {
    /// 默认多文件并行并发度
    ///
    /// 每个文件本身会并发启动3个阶段（探测、响度、解码），
    /// 4并发度在多数场景下提供良好的性能/资源平衡
    pub const PARALLEL_FILES_DEGREE: usize = 4;

    /// 可接受的音频文件扩展名
    pub const SUPPORTED_EXTENSIONS: &[&str] =
        &["wav", "mp3", "ogg", "flac", "m4a", "aiff", "wma", "aac"];
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 每个文件会同时占用多个外部进程，限制上限避免进程数失控
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}
