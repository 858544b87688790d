//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::ffi::OsString;
use std::path::PathBuf;

use super::constants::{analysis, defaults};
use crate::audio::{DecoderBackend, ToolPaths};
use crate::processing::AnalyzerConfig;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 输入文件路径（单文件模式）或扫描目录（批量模式）
    pub input_path: PathBuf,

    /// 输出文件路径（缺省写到stdout）
    pub output_path: Option<PathBuf>,

    /// 以JSON输出报告
    pub json: bool,

    /// 是否显示详细信息
    pub verbose: bool,

    /// 批量模式是否递归子目录
    pub recursive: bool,

    /// 多文件并发度；`None` 表示串行
    pub parallel_files: Option<usize>,

    /// 仅检查外部工具可用性
    pub check_tools: bool,

    /// 自定义合规标准文件（JSON）
    pub spec_path: Option<PathBuf>,

    /// 分析器配置
    pub analyzer: AnalyzerConfig,
}

impl AppConfig {
    /// 智能判断是否为批量模式（基于路径类型）
    #[inline]
    pub fn is_batch_mode(&self) -> bool {
        self.input_path.is_dir()
    }
}

/// 构建命令定义（clap builder）
pub fn build_command() -> Command {
    Command::new("acx-check")
        .version(VERSION)
        .about(DESCRIPTION)
        .arg(
            Arg::new("INPUT")
                .help("音频文件或目录路径 / Audio file or directory (WAV, MP3, OGG, FLAC, M4A, AIFF, WMA, AAC)")
                .required_unless_present("check-tools")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("以JSON输出报告 / Emit the report as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("输出结果到文件 / Write the report to FILE")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("spec")
                .long("spec")
                .help("从JSON文件加载合规标准（缺省为ACX） / Load an alternate compliance standard")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("silence-threshold")
                .long("silence-threshold")
                .help("静音阈值（dB，默认 -40） / Silence threshold in dB (default -40)")
                .value_name("DB")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("decoder")
                .long("decoder")
                .help("PCM解码后端 / PCM decoder backend")
                .value_name("BACKEND")
                .value_parser(["auto", "symphonia", "ffmpeg"])
                .default_value("auto"),
        )
        .arg(
            Arg::new("ffmpeg")
                .long("ffmpeg")
                .help("ffmpeg 可执行文件路径 / Path to ffmpeg")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("ffprobe")
                .long("ffprobe")
                .help("ffprobe 可执行文件路径 / Path to ffprobe")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("parallel-files")
                .long("parallel-files")
                .help("批量模式并发文件数（默认 4） / Files analysed concurrently in batch mode (default 4)")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("串行处理批量文件 / Analyse batch files one at a time")
                .action(ArgAction::SetTrue)
                .conflicts_with("parallel-files"),
        )
        .arg(
            Arg::new("recursive")
                .long("recursive")
                .short('r')
                .help("递归扫描子目录 / Recurse into subdirectories")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-tools")
                .long("check-tools")
                .help("检查 ffmpeg/ffprobe 是否可用后退出 / Check external tools and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息 / Verbose output")
                .action(ArgAction::SetTrue),
        )
}

/// 解析进程参数（参数错误时由clap打印用法并退出）
pub fn parse_args() -> AppConfig {
    config_from_matches(&build_command().get_matches())
}

/// 解析给定参数（便于测试）
pub fn parse_args_from<I, T>(args: I) -> Result<AppConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    build_command()
        .try_get_matches_from(args)
        .map(|matches| config_from_matches(&matches))
}

fn config_from_matches(matches: &ArgMatches) -> AppConfig {
    let default_tools = ToolPaths::default();
    let tools = ToolPaths {
        ffprobe: matches
            .get_one::<PathBuf>("ffprobe")
            .cloned()
            .unwrap_or(default_tools.ffprobe),
        ffmpeg: matches
            .get_one::<PathBuf>("ffmpeg")
            .cloned()
            .unwrap_or(default_tools.ffmpeg),
    };

    // value_parser 已限定取值
    let decoder = matches
        .get_one::<String>("decoder")
        .and_then(|s| s.parse::<DecoderBackend>().ok())
        .unwrap_or_default();

    let analyzer = AnalyzerConfig {
        tools,
        silence_threshold_db: matches
            .get_one::<f64>("silence-threshold")
            .copied()
            .unwrap_or(analysis::SILENCE_THRESHOLD_DB),
        decoder,
        ..AnalyzerConfig::default()
    };

    let parallel_files = if matches.get_flag("serial") {
        None
    } else {
        Some(
            matches
                .get_one::<usize>("parallel-files")
                .copied()
                .unwrap_or(defaults::PARALLEL_FILES_DEGREE),
        )
    };

    AppConfig {
        input_path: matches
            .get_one::<PathBuf>("INPUT")
            .cloned()
            .unwrap_or_default(),
        output_path: matches.get_one::<PathBuf>("output").cloned(),
        json: matches.get_flag("json"),
        verbose: matches.get_flag("verbose"),
        recursive: matches.get_flag("recursive"),
        parallel_files,
        check_tools: matches.get_flag("check-tools"),
        spec_path: matches.get_one::<PathBuf>("spec").cloned(),
        analyzer,
    }
}

/// 显示程序启动信息（写到stderr，stdout留给报告）
pub fn show_startup_info(config: &AppConfig) {
    if config.verbose {
        eprintln!("🚀 ACX Compliance Checker v{VERSION} 启动");
        eprintln!("📝 {DESCRIPTION}");
        eprintln!(
            "🔧 解码后端 / Decoder: {}, 静音阈值 / Silence threshold: {} dB",
            config.analyzer.decoder, config.analyzer.silence_threshold_db
        );
        eprintln!();
    }
}
