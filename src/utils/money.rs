//! 金额统一使用最小货币单位（i64），仅在展示时格式化

/// 将最小单位金额格式化为带两位小数与千分位的字符串，例如 `₦1,234.50`
pub fn format_amount(symbol: &str, minor_units: i64) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    let whole = abs / 100;
    let frac = abs % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{symbol}{grouped}.{frac:02}")
}

/// 募资进度百分比（两位小数）；目标为 0 时返回 "N/A"
pub fn progress_percent(raised: i64, target: i64) -> String {
    if target <= 0 {
        return "N/A".to_string();
    }
    // 以万分之一为单位做整数运算再四舍五入，避免浮点误差
    let basis_points = (raised as i128 * 10_000 * 2 + target as i128) / (target as i128 * 2);
    format!("{}.{:02}", basis_points / 100, basis_points % 100)
}
