//! 批处理状态管理模块
//!
//! 提供统一的批处理统计管理，支持串行和并行两种模式。
//! "分析完成"与"合规通过"分开计数：分析完成但不合规不算失败。

use crate::error::ErrorCategory;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 批处理统计快照
#[derive(Debug, Clone, Default)]
pub struct BatchStatsSnapshot {
    /// 分析完成的文件数
    pub analyzed: usize,
    /// 其中合规通过的文件数
    pub compliant: usize,
    /// 分析失败的文件数
    pub failed: usize,
    /// 错误分类统计（错误类型 -> 失败文件列表）
    pub error_stats: HashMap<ErrorCategory, Vec<String>>,
}

impl BatchStatsSnapshot {
    pub fn total(&self) -> usize {
        self.analyzed + self.failed
    }

    pub fn non_compliant(&self) -> usize {
        self.analyzed - self.compliant
    }
}

/// 串行批处理统计（单线程）
#[derive(Debug, Default)]
pub struct SerialBatchStats {
    analyzed: usize,
    compliant: usize,
    failed: usize,
    error_stats: HashMap<ErrorCategory, Vec<String>>,
}

impl SerialBatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次完成的分析
    #[inline]
    pub fn inc_analyzed(&mut self, compliant: bool) -> usize {
        self.analyzed += 1;
        if compliant {
            self.compliant += 1;
        }
        self.analyzed
    }

    /// 增加失败计数并记录错误分类
    #[inline]
    pub fn inc_failed(&mut self, category: ErrorCategory, filename: String) -> usize {
        self.failed += 1;
        self.error_stats.entry(category).or_default().push(filename);
        self.failed
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        BatchStatsSnapshot {
            analyzed: self.analyzed,
            compliant: self.compliant,
            failed: self.failed,
            error_stats: self.error_stats.clone(),
        }
    }
}

/// 并行批处理统计（多线程安全）
///
/// 使用原子类型和锁，克隆后共享同一状态
#[derive(Debug, Clone, Default)]
pub struct ParallelBatchStats {
    analyzed: Arc<AtomicUsize>,
    compliant: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    error_stats: Arc<Mutex<HashMap<ErrorCategory, Vec<String>>>>,
}

impl ParallelBatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次完成的分析（线程安全）
    #[inline]
    pub fn inc_analyzed(&self, compliant: bool) -> usize {
        if compliant {
            self.compliant.fetch_add(1, Ordering::Relaxed);
        }
        self.analyzed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 增加失败计数并记录错误分类（线程安全）
    pub fn inc_failed(&self, category: ErrorCategory, filename: String) -> usize {
        let count = self.failed.fetch_add(1, Ordering::Relaxed) + 1;

        if let Ok(mut stats) = self.error_stats.lock() {
            stats.entry(category).or_default().push(filename);
        }

        count
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        BatchStatsSnapshot {
            analyzed: self.analyzed.load(Ordering::Relaxed),
            compliant: self.compliant.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            error_stats: self
                .error_stats
                .lock()
                .map(|stats| stats.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, decode_failure};
    use std::path::PathBuf;

    fn format_category() -> ErrorCategory {
        ErrorCategory::from_analysis_error(&AnalysisError::NoAudioStream {
            path: PathBuf::from("cover.mp3"),
        })
    }

    #[test]
    fn test_serial_stats_basic() {
        let mut stats = SerialBatchStats::new();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total(), 0);
        assert!(snapshot.error_stats.is_empty());

        assert_eq!(stats.inc_analyzed(true), 1);
        assert_eq!(stats.inc_analyzed(false), 2);

        let category = format_category();
        assert_eq!(stats.inc_failed(category, "file1.wav".to_string()), 1);
        assert_eq!(stats.inc_failed(category, "file2.wav".to_string()), 2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.analyzed, 2);
        assert_eq!(snapshot.compliant, 1);
        assert_eq!(snapshot.non_compliant(), 1);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.total(), 4);
        assert_eq!(snapshot.error_stats[&category].len(), 2);
    }

    #[test]
    fn test_serial_stats_multiple_categories() {
        let mut stats = SerialBatchStats::new();

        let cat1 = format_category();
        let cat2 = ErrorCategory::from_analysis_error(&decode_failure("b.mp3", "truncated"));

        stats.inc_failed(cat1, "file1.wav".to_string());
        stats.inc_failed(cat2, "file2.mp3".to_string());
        stats.inc_failed(cat1, "file3.wav".to_string());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.failed, 3);
        assert_eq!(snapshot.error_stats.len(), 2);
        assert_eq!(snapshot.error_stats[&cat1].len(), 2);
        assert_eq!(snapshot.error_stats[&cat2].len(), 1);
    }

    #[test]
    fn test_parallel_stats_concurrent_updates() {
        use rayon::prelude::*;

        let stats = ParallelBatchStats::new();

        (0..100).into_par_iter().for_each(|i| {
            stats.inc_analyzed(i % 2 == 0);
        });

        let category = format_category();
        (0..50).into_par_iter().for_each(|i| {
            stats.inc_failed(category, format!("file{i}.wav"));
        });

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.analyzed, 100);
        assert_eq!(snapshot.compliant, 50);
        assert_eq!(snapshot.failed, 50);
        assert_eq!(snapshot.error_stats[&category].len(), 50);
    }

    #[test]
    fn test_parallel_stats_clone_shares_state() {
        let stats1 = ParallelBatchStats::new();
        stats1.inc_analyzed(true);

        let stats2 = stats1.clone();
        stats2.inc_analyzed(false);

        assert_eq!(stats1.snapshot().analyzed, 2);
        assert_eq!(stats2.snapshot().compliant, 1);
    }
}
