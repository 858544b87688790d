//! 结果格式化模块
//!
//! 文本报告（comfy-table 表格）与 JSON 报告的生成和输出。

use chrono::Local;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::path::Path;

use super::batch_state::BatchStatsSnapshot;
use super::cli::VERSION;
use super::processor::FileOutcome;
use super::utils;
use crate::core::{CbrBasis, ComplianceReport};
use crate::error::{AnalysisError, AnalysisResult, ErrorCategory};
use crate::processing::AnalysisDetails;

const RULE: &str =
    "--------------------------------------------------------------------------------\n";

/// 创建输出文件头部信息
pub fn create_output_header(input: &Path) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "ACX Compliance Checker v{VERSION} / Audiobook compliance report\n"
    ));
    let now = Local::now().format("%Y-%m-%d %H:%M:%S");
    output.push_str(&format!("log date: {now}\n"));
    output.push_str(&format!("input: {}\n", input.display()));
    output.push_str(RULE);
    output
}

fn verdict_cell(passed: Option<bool>) -> Cell {
    match passed {
        Some(true) => Cell::new("PASS"),
        Some(false) => Cell::new("FAIL"),
        None => Cell::new("INFO"),
    }
    .set_alignment(CellAlignment::Center)
}

/// 逐项判定表
pub fn criteria_table(report: &ComplianceReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["项目 / Criterion", "结果 / Result", "说明 / Detail"]);

    for criterion in report.criteria() {
        table.add_row(vec![
            Cell::new(criterion.label()),
            verdict_cell(criterion.passed()),
            Cell::new(criterion.message()),
        ]);
    }
    table
}

fn describe_cbr_basis(basis: &CbrBasis) -> String {
    match basis {
        CbrBasis::Measured { variation } => {
            format!("measured, variation {:.2}%", variation * 100.0)
        }
        CbrBasis::StreamOnly => "stream bitrate only, assumed constant".to_string(),
        CbrBasis::Unavailable => "evidence unavailable, assumed constant".to_string(),
        CbrBasis::NotApplicable => "not evaluated (not MP3)".to_string(),
    }
}

/// 单文件文本报告
pub fn render_report_text(details: &AnalysisDetails, verbose: bool) -> String {
    let report = &details.report;
    let meta = &details.measurements.metadata;

    let mut output = create_output_header(&details.path);
    output.push_str(&format!(
        "Statistics for: {}\n",
        utils::extract_filename_lossy(&details.path)
    ));
    output.push_str(&format!(
        "Duration: {} ({:.2}s), {}\n",
        utils::format_duration(report.duration),
        report.duration,
        report.channels
    ));
    output.push_str(&format!(
        "Codec: {} in {}, {} Hz\n",
        meta.codec, meta.container_format, meta.sample_rate
    ));
    if verbose {
        output.push_str(&format!(
            "Decoded: {}-bit, {} samples @ {} Hz\n",
            details.signal.bit_depth, details.signal.sample_count, details.signal.frame_rate
        ));
        output.push_str(&format!(
            "CBR: {}\n",
            describe_cbr_basis(&details.measurements.cbr.basis)
        ));
        output.push_str(&format!(
            "Elapsed: {:.2}s\n",
            details.elapsed.as_secs_f64()
        ));
    }
    output.push('\n');

    output.push_str(&criteria_table(report).to_string());
    output.push_str("\n\n");
    output.push_str(&report.summary);
    output.push('\n');
    output
}

/// 单文件JSON报告
pub fn render_report_json(report: &ComplianceReport) -> AnalysisResult<String> {
    serde_json::to_string_pretty(report).map_err(|e| {
        AnalysisError::InvalidInput(format!("报告序列化失败 / failed to serialize report: {e}"))
    })
}

/// 批量JSON中的失败信息
#[derive(Debug, Serialize)]
pub struct BatchError {
    pub stage: String,
    pub category: String,
    pub message: String,
}

impl From<&AnalysisError> for BatchError {
    fn from(e: &AnalysisError) -> Self {
        Self {
            stage: e.stage().to_string(),
            category: ErrorCategory::from_analysis_error(e)
                .display_name()
                .to_string(),
            message: e.to_string(),
        }
    }
}

/// 批量JSON中的单个文件条目
#[derive(Debug, Serialize)]
pub struct BatchEntry<'a> {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<&'a ComplianceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchError>,
}

impl<'a> From<&'a FileOutcome> for BatchEntry<'a> {
    fn from(outcome: &'a FileOutcome) -> Self {
        let file = outcome.path.display().to_string();
        match &outcome.result {
            Ok(details) => Self {
                file,
                report: Some(&details.report),
                error: None,
            },
            Err(e) => Self {
                file,
                report: None,
                error: Some(BatchError::from(e)),
            },
        }
    }
}

/// 批量JSON报告（按输入顺序）
pub fn render_batch_json(outcomes: &[FileOutcome]) -> AnalysisResult<String> {
    let entries: Vec<BatchEntry> = outcomes.iter().map(BatchEntry::from).collect();
    serde_json::to_string_pretty(&entries).map_err(|e| {
        AnalysisError::InvalidInput(format!("报告序列化失败 / failed to serialize report: {e}"))
    })
}

/// 批量文本报告：每文件一行 + 统计
pub fn render_batch_text(
    input: &Path,
    outcomes: &[FileOutcome],
    stats: &BatchStatsSnapshot,
) -> String {
    let mut output = create_output_header(input);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "文件 / File",
            "结果 / Result",
            "响度 / LUFS",
            "峰值 / Peak dB",
            "采样率 / Hz",
            "时长 / Duration",
            "说明 / Detail",
        ]);

    for outcome in outcomes {
        let name = utils::extract_filename_lossy(&outcome.path);
        match &outcome.result {
            Ok(details) => {
                let report = &details.report;
                let detail = if report.overall_pass {
                    String::new()
                } else {
                    report.failed_criteria().join(", ")
                };
                table.add_row(vec![
                    Cell::new(name),
                    verdict_cell(Some(report.overall_pass)),
                    Cell::new(format!("{:.2}", report.loudness.value))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.2}", report.peak.value))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(report.sample_rate.value).set_alignment(CellAlignment::Right),
                    Cell::new(utils::format_duration(report.duration))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(detail),
                ]);
            }
            Err(e) => {
                table.add_row(vec![
                    Cell::new(name),
                    Cell::new("ERROR").set_alignment(CellAlignment::Center),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(format!("[{}] {}", e.stage(), e)),
                ]);
            }
        }
    }

    output.push_str(&table.to_string());
    output.push_str("\n\n");
    output.push_str(&create_batch_footer(stats));
    output
}

/// 批量统计信息
pub fn create_batch_footer(stats: &BatchStatsSnapshot) -> String {
    let mut output = String::new();
    output.push_str("批量处理统计 / Batch statistics:\n");
    output.push_str(&format!("   总文件数 / Total: {}\n", stats.total()));
    output.push_str(&format!(
        "   合规 / Compliant: {}   不合规 / Not compliant: {}   失败 / Failed: {}\n",
        stats.compliant,
        stats.non_compliant(),
        stats.failed
    ));

    if !stats.error_stats.is_empty() {
        // 按类别名排序，输出稳定
        let mut categories: Vec<_> = stats.error_stats.iter().collect();
        categories.sort_by_key(|(category, _)| category.display_name());
        for (category, files) in categories {
            output.push_str(&format!(
                "   {}: {}\n",
                category.display_name(),
                files.join(", ")
            ));
        }
    }
    output
}

/// 输出到文件或stdout
pub fn write_output(content: &str, output_path: Option<&Path>) -> AnalysisResult<()> {
    match output_path {
        Some(path) => {
            std::fs::write(path, content)?;
            eprintln!("📄 结果已保存 / Saved to: {}", path.display());
            Ok(())
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}
