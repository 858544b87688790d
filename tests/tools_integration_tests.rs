//! 工具层集成测试
//!
//! 测试CLI、文件扫描、批量处理与格式化输出等工具模块的集成功能。


use acx_compliance_checker::audio::DecoderBackend;
use acx_compliance_checker::core::ComplianceSpec;
use acx_compliance_checker::error::AnalysisError;
use acx_compliance_checker::tools::{self, processor::Validator};
use acx_compliance_checker::{ComplianceAnalyzer, ErrorCategory};
use audio_test_fixtures::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// CLI配置测试
// ============================================================================

#[test]
fn test_cli_defaults() {
    let config = tools::parse_args_from(["acx-check", "chapter01.mp3"]).unwrap();

    assert_eq!(config.input_path, PathBuf::from("chapter01.mp3"));
    assert!(!config.json);
    assert!(!config.verbose);
    assert_eq!(config.parallel_files, Some(4));
    assert_eq!(config.analyzer.silence_threshold_db, -40.0);
    assert_eq!(config.analyzer.decoder, DecoderBackend::Auto);
    assert!(config.spec_path.is_none());
}

#[test]
fn test_cli_full_options() {
    let config = tools::parse_args_from([
        "acx-check",
        "book/",
        "--json",
        "-o",
        "report.json",
        "--silence-threshold",
        "-50",
        "--decoder",
        "ffmpeg",
        "--ffprobe",
        "/opt/ffmpeg/bin/ffprobe",
        "--parallel-files",
        "8",
        "-r",
        "--spec",
        "strict.json",
    ])
    .unwrap();

    assert!(config.json);
    assert!(config.recursive);
    assert_eq!(config.output_path, Some(PathBuf::from("report.json")));
    assert_eq!(config.analyzer.silence_threshold_db, -50.0);
    assert_eq!(config.analyzer.decoder, DecoderBackend::Ffmpeg);
    assert_eq!(
        config.analyzer.tools.ffprobe,
        PathBuf::from("/opt/ffmpeg/bin/ffprobe")
    );
    assert_eq!(config.parallel_files, Some(8));
    assert_eq!(config.spec_path, Some(PathBuf::from("strict.json")));
}

#[test]
fn test_cli_serial_and_errors() {
    let config = tools::parse_args_from(["acx-check", "book/", "--serial"]).unwrap();
    assert_eq!(config.parallel_files, None);

    // 互斥参数
    assert!(tools::parse_args_from(["acx-check", "book/", "--serial", "--parallel-files", "2"]).is_err());
    // 缺少输入
    assert!(tools::parse_args_from(["acx-check"]).is_err());
    // 未知解码后端
    assert!(tools::parse_args_from(["acx-check", "a.mp3", "--decoder", "gstreamer"]).is_err());
    // --check-tools 不需要输入
    let config = tools::parse_args_from(["acx-check", "--check-tools"]).unwrap();
    assert!(config.check_tools);
}

#[test]
fn test_batch_mode_detection() {
    let dir = TempDir::new().unwrap();
    let file = placeholder_file(dir.path(), "chapter01.mp3");

    let as_dir = tools::parse_args_from([Path::new("acx-check"), dir.path()]).unwrap();
    let as_file = tools::parse_args_from([Path::new("acx-check"), file.as_path()]).unwrap();

    assert!(as_dir.is_batch_mode());
    assert!(!as_file.is_batch_mode());
}

// ============================================================================
// 标准文件
// ============================================================================

#[test]
fn test_spec_file_overrides_selected_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strict.json");
    std::fs::write(&path, r#"{ "name": "Strict", "peak_max": -6.0 }"#).unwrap();

    let spec = ComplianceSpec::from_json_file(&path).unwrap();

    assert_eq!(spec.name, "Strict");
    assert_eq!(spec.peak_max, -6.0);
    assert_eq!(spec.sample_rate_required, 44100);
    assert_eq!(spec.loudness_min, -23.0);
}

#[test]
fn test_invalid_spec_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let inverted = dir.path().join("inverted.json");
    std::fs::write(&inverted, r#"{ "loudness_min": -10.0, "loudness_max": -20.0 }"#).unwrap();
    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, "not json").unwrap();

    assert!(matches!(
        ComplianceSpec::from_json_file(&inverted),
        Err(AnalysisError::InvalidInput(_))
    ));
    assert!(matches!(
        ComplianceSpec::from_json_file(&garbage),
        Err(AnalysisError::InvalidInput(_))
    ));
    assert!(matches!(
        ComplianceSpec::from_json_file(&dir.path().join("missing.json")),
        Err(AnalysisError::Io(_))
    ));
}

// ============================================================================
// 文件扫描
// ============================================================================

#[test]
fn test_scan_filters_and_sorts() {
    let dir = TempDir::new().unwrap();
    for name in ["b.mp3", "a.WAV", "cover.jpg", "notes.txt", "c.flac"] {
        placeholder_file(dir.path(), name);
    }
    std::fs::create_dir(dir.path().join("part2")).unwrap();
    placeholder_file(&dir.path().join("part2"), "d.m4a");

    let flat = tools::scan_audio_files(dir.path(), false).unwrap();
    let names: Vec<_> = flat
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.WAV", "b.mp3", "c.flac"]);

    let deep = tools::scan_audio_files(dir.path(), true).unwrap();
    assert_eq!(deep.len(), 4);
    assert!(deep.iter().any(|p| p.ends_with("part2/d.m4a")));
}

#[test]
fn test_scan_rejects_missing_directory() {
    let err = tools::scan_audio_files(Path::new("/nonexistent/book"), false).unwrap_err();
    assert_eq!(ErrorCategory::from_analysis_error(&err), ErrorCategory::Io);
}

// ============================================================================
// 批量处理
// ============================================================================

fn batch_fixture(dir: &Path) -> Vec<PathBuf> {
    (1..=6)
        .map(|i| placeholder_file(dir, &format!("chapter{i:02}.mp3")))
        .collect()
}

fn compliant_analyzer() -> ComplianceAnalyzer {
    fake_analyzer(mp3_metadata(), -20.0, pcm_with_peak(-4.0))
}

#[test]
fn test_serial_batch_with_validator() {
    let dir = TempDir::new().unwrap();
    let files = batch_fixture(dir.path());
    let analyzer = compliant_analyzer();
    let reject_odd = |path: &Path| !path.to_string_lossy().ends_with("3.mp3");
    let validator: Validator = &reject_odd;

    let (outcomes, stats) = tools::process_batch_serial(&files, &analyzer, Some(validator), false);

    assert_eq!(outcomes.len(), 6);
    assert_eq!(stats.analyzed, 5);
    assert_eq!(stats.compliant, 5);
    assert_eq!(stats.failed, 1);
    assert!(matches!(
        outcomes[2].result,
        Err(AnalysisError::NoAudioStream { .. })
    ));
    assert!(outcomes[0].passed());
}

#[test]
fn test_parallel_batch_matches_serial_order() {
    let dir = TempDir::new().unwrap();
    let files = batch_fixture(dir.path());
    let analyzer = compliant_analyzer();

    let (serial, _) = tools::process_batch_serial(&files, &analyzer, None, false);
    let (parallel, stats) =
        tools::process_batch_parallel(&files, &analyzer, None, 3, false).unwrap();

    let serial_paths: Vec<_> = serial.iter().map(|o| &o.path).collect();
    let parallel_paths: Vec<_> = parallel.iter().map(|o| &o.path).collect();
    assert_eq!(serial_paths, parallel_paths);
    assert_eq!(stats.total(), 6);
    assert_eq!(stats.non_compliant(), 0);
}

#[test]
fn test_batch_json_output() {
    let dir = TempDir::new().unwrap();
    let mut files = batch_fixture(dir.path());
    files.push(dir.path().join("vanished.mp3"));
    let analyzer = compliant_analyzer();

    let (outcomes, _) = tools::process_batch_serial(&files, &analyzer, None, false);
    let json = tools::render_batch_json(&outcomes).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let entries = value.as_array().unwrap();

    assert_eq!(entries.len(), 7);
    assert_eq!(entries[0]["report"]["overallPass"], true);
    assert!(entries[0].get("error").is_none());
    assert_eq!(entries[6]["error"]["stage"], "input");
    assert!(entries[6].get("report").is_none());
}

#[test]
fn test_batch_text_output_and_file_write() {
    let dir = TempDir::new().unwrap();
    let files = batch_fixture(dir.path());
    let analyzer = compliant_analyzer();

    let (outcomes, stats) = tools::process_batch_serial(&files, &analyzer, None, false);
    let text = tools::render_batch_text(dir.path(), &outcomes, &stats);
    log("批量文本报告", "batch text report");
    println!("{text}");

    assert!(text.contains("chapter01.mp3"));
    assert!(text.contains("PASS"));
    assert!(text.contains("Total: 6"));

    let out = dir.path().join("report.txt");
    tools::write_output(&text, Some(&out)).unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), text);
}

#[test]
fn test_single_report_renderers() {
    let dir = TempDir::new().unwrap();
    let file = placeholder_file(dir.path(), "chapter01.mp3");
    let details = compliant_analyzer().analyze_detailed(&file).unwrap();

    let text = tools::render_report_text(&details, true);
    assert!(text.contains("192kbps CBR"));
    assert!(text.contains("44100 Hz"));
    assert!(text.contains("-20.00 LUFS"));

    let json = tools::render_report_json(&details.report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"], "ACX Compliant ✓");
    assert_eq!(value["rms"]["range"], serde_json::json!([-23.0, -18.0]));
}
