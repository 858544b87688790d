//! ACX Compliance Checker - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成合规分析任务。

use acx_compliance_checker::{
    AnalysisError, ComplianceAnalyzer, ComplianceSpec, ErrorCategory,
    audio::{FFMPEG_INSTALL_GUIDE, FfprobeProber},
    tools::{self, AppConfig, processor::Validator},
};
use std::path::Path;
use std::process;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误（I/O等）
    pub const GENERAL_ERROR: i32 = 1;
    /// 输入/参数错误
    pub const INPUT_ERROR: i32 = 2;
    /// 探测/格式错误
    pub const FORMAT_ERROR: i32 = 3;
    /// 响度测量错误
    pub const LOUDNESS_ERROR: i32 = 4;
    /// 解码失败
    pub const DECODING_ERROR: i32 = 5;
    /// 外部工具超时
    pub const TIMEOUT_ERROR: i32 = 6;
    /// 外部工具不可用（--check-tools）
    pub const TOOLS_UNAVAILABLE: i32 = 7;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &AnalysisError) -> &'static str {
    match error {
        AnalysisError::InvalidInput(_) => {
            "检查命令行参数与输入路径，使用 --help 查看完整用法 / Check arguments and input path, use --help for usage"
        }
        AnalysisError::NoAudioStream { .. } => {
            "文件中没有音频流，请确认上传的是音频文件 / The file has no audio stream, make sure it is an audio file"
        }
        _ => match ErrorCategory::from_analysis_error(error) {
            ErrorCategory::Timeout => {
                "外部工具超时，文件可能过大或损坏 / External tool timed out, the file may be too large or damaged"
            }
            ErrorCategory::Format => {
                "ffprobe 无法读取文件，请确认 ffprobe 可用且文件未损坏（可用 --check-tools 检查） / ffprobe could not read the file, run --check-tools"
            }
            ErrorCategory::Loudness => {
                "ffmpeg 未给出积分响度，请确认 ffmpeg 可用（可用 --check-tools 检查） / ffmpeg reported no integrated loudness, run --check-tools"
            }
            ErrorCategory::Decoding => {
                "文件可能损坏或使用不支持的编码，可尝试 --decoder ffmpeg / File may be damaged or unsupported, try --decoder ffmpeg"
            }
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check the path exists and is readable"
            }
            ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input file and parameter settings"
            }
        },
    }
}

fn exit_code_for(error: &AnalysisError) -> i32 {
    match ErrorCategory::from_analysis_error(error) {
        ErrorCategory::Timeout => exit_codes::TIMEOUT_ERROR,
        ErrorCategory::Format => exit_codes::FORMAT_ERROR,
        ErrorCategory::Loudness => exit_codes::LOUDNESS_ERROR,
        ErrorCategory::Decoding => exit_codes::DECODING_ERROR,
        ErrorCategory::Io => exit_codes::GENERAL_ERROR,
        ErrorCategory::Other => exit_codes::INPUT_ERROR,
    }
}

/// 错误处理和建议
fn handle_error(error: AnalysisError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");
    eprintln!("[INFO] 阶段 / Stage: {}", error.stage());
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));
    process::exit(exit_code_for(&error));
}

/// 检查外部工具可用性
fn check_tools(config: &AppConfig) -> i32 {
    let status = config
        .analyzer
        .tools
        .check_available(config.analyzer.timeouts.tool_check);
    let mark = |ok: bool| if ok { "✓" } else { "✗" };
    println!(
        "ffprobe ({}): {}",
        config.analyzer.tools.ffprobe.display(),
        mark(status.ffprobe)
    );
    println!(
        "ffmpeg  ({}): {}",
        config.analyzer.tools.ffmpeg.display(),
        mark(status.ffmpeg)
    );

    if status.all_available() {
        0
    } else {
        eprintln!("{FFMPEG_INSTALL_GUIDE}");
        exit_codes::TOOLS_UNAVAILABLE
    }
}

fn load_spec(config: &AppConfig) -> Result<ComplianceSpec, AnalysisError> {
    match &config.spec_path {
        Some(path) => ComplianceSpec::from_json_file(path),
        None => Ok(ComplianceSpec::acx()),
    }
}

/// 批量处理目录中的音频文件
fn process_batch_mode(config: &AppConfig, analyzer: &ComplianceAnalyzer) -> Result<(), AnalysisError> {
    let audio_files = tools::scan_audio_files(&config.input_path, config.recursive)?;
    tools::show_scan_results(&config.input_path, &audio_files, config.verbose);

    if audio_files.is_empty() {
        return Ok(());
    }

    let prober = FfprobeProber::new(&config.analyzer.tools).with_timeouts(
        config.analyzer.timeouts.probe,
        config.analyzer.timeouts.validation,
    );
    let has_audio = |path: &Path| prober.has_audio_stream(path);
    let validator: Validator = &has_audio;

    let (outcomes, stats) = match config.parallel_files {
        None => tools::process_batch_serial(&audio_files, analyzer, Some(validator), config.verbose),
        Some(degree) => {
            let actual_degree =
                tools::utils::effective_parallel_degree(degree, Some(audio_files.len()));

            if actual_degree == 1 {
                tools::process_batch_serial(&audio_files, analyzer, Some(validator), config.verbose)
            } else {
                // 并行失败则降级串行
                tools::process_batch_parallel(
                    &audio_files,
                    analyzer,
                    Some(validator),
                    actual_degree,
                    config.verbose,
                )
                .unwrap_or_else(|e| {
                    eprintln!("[WARNING] 并行处理失败 / Parallel processing failed: {e}，回退到串行模式 / fallback to serial");
                    tools::process_batch_serial(&audio_files, analyzer, Some(validator), config.verbose)
                })
            }
        }
    };

    let content = if config.json {
        tools::render_batch_json(&outcomes)?
    } else {
        tools::render_batch_text(&config.input_path, &outcomes, &stats)
    };
    tools::write_output(&content, config.output_path.as_deref())
}

/// 单文件处理模式
fn process_single_mode(config: &AppConfig, analyzer: &ComplianceAnalyzer) -> Result<(), AnalysisError> {
    let details = analyzer.analyze_detailed(&config.input_path)?;

    let content = if config.json {
        tools::render_report_json(&details.report)?
    } else {
        tools::render_report_text(&details, config.verbose)
    };
    tools::write_output(&content, config.output_path.as_deref())
}

/// 应用程序主逻辑（便于测试和复用）
fn run(config: &AppConfig) -> Result<(), AnalysisError> {
    tools::show_startup_info(config);

    let spec = load_spec(config)?;
    let analyzer = ComplianceAnalyzer::from_config(&config.analyzer, spec)?;

    if config.is_batch_mode() {
        process_batch_mode(config, &analyzer)
    } else {
        process_single_mode(config, &analyzer)
    }
}

fn main() {
    let config = tools::parse_args();
    tools::init_logging(config.verbose);

    if config.check_tools {
        process::exit(check_tools(&config));
    }

    if let Err(error) = run(&config) {
        handle_error(error);
    }
}
