//! 文件扫描模块
//!
//! 负责扫描目录中的音频文件（可选递归），按路径排序输出。

use super::constants::defaults::SUPPORTED_EXTENSIONS;
use super::utils;
use crate::error::{AnalysisError, AnalysisResult};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// 扩展名是否在受支持列表中（大小写不敏感）
pub fn is_supported_audio(path: &Path) -> bool {
    utils::extension_lowercase(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// 扫描目录中的音频文件
pub fn scan_audio_files(dir_path: &Path, recursive: bool) -> AnalysisResult<Vec<PathBuf>> {
    if !dir_path.exists() {
        return Err(AnalysisError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在 / directory not found: {}", dir_path.display()),
        )));
    }

    if !dir_path.is_dir() {
        return Err(AnalysisError::InvalidInput(format!(
            "路径不是目录 / not a directory: {}",
            dir_path.display()
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut audio_files = Vec::new();

    for entry in WalkDir::new(dir_path).min_depth(1).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // 不可读的子目录跳过，不中断整个扫描
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_file() && is_supported_audio(entry.path()) {
            audio_files.push(entry.into_path());
        }
    }

    audio_files.sort();
    Ok(audio_files)
}

/// 显示文件扫描结果
pub fn show_scan_results(dir_path: &Path, audio_files: &[PathBuf], verbose: bool) {
    if audio_files.is_empty() {
        eprintln!(
            "⚠️  在目录 {} 中没有找到支持的音频文件 / no supported audio files found",
            dir_path.display()
        );
        eprintln!(
            "   支持的格式 / Supported formats: {}",
            SUPPORTED_EXTENSIONS
                .iter()
                .map(|s| s.to_uppercase())
                .collect::<Vec<_>>()
                .join(", ")
        );
        return;
    }

    eprintln!("📁 扫描目录 / Scanning: {}", dir_path.display());
    eprintln!("🎵 找到 {} 个音频文件 / audio files found", audio_files.len());

    if verbose {
        for (i, file) in audio_files.iter().enumerate() {
            eprintln!("   {}. {}", i + 1, utils::extract_filename_lossy(file));
        }
    }
}
