//! 日志初始化
//!
//! tracing 事件统一写到 stderr，stdout 只留给报告输出。
//! `RUST_LOG` 优先；否则 `--verbose` 为 debug，默认 info。

use tracing_subscriber::EnvFilter;

/// 安装全局 subscriber（重复调用无副作用）
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
