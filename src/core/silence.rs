//! 首尾静音检测
//!
//! 在交错样本序列上找第一个与最后一个超过阈值的样本，
//! 索引直接除以帧率换算为秒（多声道时索引按交错样本计）。
//! 全部低于阈值时：整段时长计为首部静音，尾部为0。

use serde::Serialize;

use super::peak::db_to_linear;

/// 首尾静音时长（秒）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SilenceBounds {
    pub lead: f64,
    pub trail: f64,
}

/// 检测首尾静音
///
/// `frame_rate` 为0时无法换算时长，返回全0。
pub fn detect_silence(samples: &[f64], frame_rate: u32, threshold_db: f64) -> SilenceBounds {
    if frame_rate == 0 {
        return SilenceBounds::default();
    }

    let threshold = db_to_linear(threshold_db);
    let rate = frame_rate as f64;
    let is_sound = |s: &f64| s.abs() > threshold;

    let Some(first) = samples.iter().position(is_sound) else {
        return SilenceBounds {
            lead: samples.len() as f64 / rate,
            trail: 0.0,
        };
    };
    // first 存在时 last 必然存在
    let last = samples.iter().rposition(is_sound).unwrap_or(first);

    SilenceBounds {
        lead: first as f64 / rate,
        trail: (samples.len() - last - 1) as f64 / rate,
    }
}
