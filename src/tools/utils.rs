//! 工具函数模块
//!
//! 提供文件路径处理、时长格式化、并发度计算等通用工具函数。

use super::constants::parallel_limits::{MAX_PARALLEL_DEGREE, MIN_PARALLEL_DEGREE};

/// 文件路径处理工具函数
pub mod path {
    use std::path::Path;

    /// 提取文件名（统一处理路径提取逻辑）
    #[inline]
    pub fn extract_filename(path: &Path) -> &str {
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
    }

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 小写扩展名
    #[inline]
    pub fn extension_lowercase(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase())
    }
}

/// 秒数格式化为 `h:mm:ss` 或 `m:ss`
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// 实际并发度：限制在 [MIN, MAX] 内，且不超过任务数
pub fn effective_parallel_degree(requested: usize, task_count: Option<usize>) -> usize {
    let degree = requested.clamp(MIN_PARALLEL_DEGREE, MAX_PARALLEL_DEGREE);
    match task_count {
        Some(count) if count > 0 => degree.min(count),
        _ => degree,
    }
}

// 重新导出为平级函数
pub use path::{extension_lowercase, extract_filename, extract_filename_lossy};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(59.6), "1:00");
        assert_eq!(format_duration(1834.24), "30:34");
        assert_eq!(format_duration(3725.0), "1:02:05");
        assert_eq!(format_duration(f64::NAN), "0:00");
    }

    #[test]
    fn test_effective_parallel_degree() {
        assert_eq!(effective_parallel_degree(4, Some(10)), 4);
        assert_eq!(effective_parallel_degree(4, Some(2)), 2);
        assert_eq!(effective_parallel_degree(0, None), 1);
        assert_eq!(effective_parallel_degree(64, None), 16);
        assert_eq!(effective_parallel_degree(8, Some(0)), 8);
    }

    #[test]
    fn test_path_helpers() {
        let path = Path::new("/books/Chapter01.MP3");
        assert_eq!(extract_filename(path), "Chapter01.MP3");
        assert_eq!(extension_lowercase(path).as_deref(), Some("mp3"));
        assert_eq!(extension_lowercase(Path::new("README")), None);
    }
}
