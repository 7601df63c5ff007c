//! Value formatting shared by the views

use chrono::{DateTime, Local};

/// Format a score with digit grouping, e.g. `1234567` → `1,234,567`
pub fn group_thousands(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let len = digits.len();
    let mut out = String::with_capacity(len + (len / 3) * separator.len());

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Wall-clock time of an update, e.g. `03:04:05 PM`
pub fn clock(time: &DateTime<Local>) -> String {
    time.format("%I:%M:%S %p").to_string()
}
