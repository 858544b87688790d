//! 分析流水线模块
//!
//! 把audio层的外部能力与core层的纯算法编排为一次完整的合规分析。

pub mod analyzer;

pub use analyzer::{
    AnalysisDetails, AnalyzerConfig, ComplianceAnalyzer, SignalSummary, ToolTimeouts,
};
