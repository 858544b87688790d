//! 样本峰值（dBFS）

/// 所有声道中最大绝对样本值
#[inline]
pub fn max_abs_sample(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0f64, |acc, &s| acc.max(s.abs()))
}

/// 峰值电平 `20·log10(max|x|)`
///
/// 全零（或空）输入返回负无穷。
pub fn calculate_peak(samples: &[f64]) -> f64 {
    let peak = max_abs_sample(samples);
    if peak > 0.0 {
        20.0 * peak.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// 线性幅度 → dB
#[inline]
pub fn linear_to_db(amplitude: f64) -> f64 {
    20.0 * amplitude.log10()
}

/// dB → 线性幅度
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}
