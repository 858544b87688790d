//! 工具模块集合
//!
//! 包含CLI、日志、文件扫描、批处理、格式化等工具模块，支持main.rs的流程控制。

pub mod batch_state;
pub mod cli;
pub mod constants;
pub mod formatter;
pub mod logging;
pub mod parallel_processor;
pub mod processor;
pub mod scanner;
pub mod utils;

// 重新导出主要的公共接口
pub use batch_state::{BatchStatsSnapshot, ParallelBatchStats, SerialBatchStats};
pub use cli::{AppConfig, parse_args, parse_args_from, show_startup_info};
pub use formatter::{
    render_batch_json, render_batch_text, render_report_json, render_report_text, write_output,
};
pub use logging::init_logging;
pub use parallel_processor::process_batch_parallel;
pub use processor::{FileOutcome, analyze_file, process_batch_serial};
pub use scanner::{scan_audio_files, show_scan_results};
