//! 日志工具模块
//!
//! 初始化 tracing，并提供运行横幅和统计输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；未设置时 `verbose` 为 true 使用 debug 级别，否则 info。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(command: &str, model_name: &str, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", command);
    info!("🤖 模型: {} | 最大并发: {}", model_name, max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始
pub fn log_stage(step: usize, total: usize, name: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📦 [{}/{}] {}", step, total, name);
    info!("{}", "─".repeat(60));
}

/// 打印比对结果统计
pub fn print_comparison_stats(pesticides: usize, rows: usize, unmatched: usize, output: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 比对完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🧪 中国农药: {}", pesticides);
    info!("📄 输出行数: {}", rows);
    info!("❓ 无 EU 对应农药: {}", unmatched);
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", output);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
