/// Size formatting utilities: human-readable byte counts.
///
/// All internal sizes are `u64` bytes. Floating point is only used
/// at the display-formatting boundary.

/// Unit suffixes for successive powers of 1024, starting at 1024^1.
const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];

const KIB: u64 = 1024;

/// Format a byte count into a human-readable string.
///
/// Below 1024 the raw count is shown (`"512 B"`). Otherwise the value is
/// scaled by the largest power of 1024 not exceeding it and rendered with
/// two decimals (`"1.50 KB"`). Units are binary multiples with the short
/// labels KB, MB, … up to EB.
pub fn human(bytes: u64) -> String {
    if bytes < KIB {
        return format!("{bytes} B");
    }

    // Integer exponent: floor(log_1024(bytes)), no float rounding at the
    // unit boundaries.
    let mut exp = 0usize;
    let mut scaled = bytes;
    while scaled >= KIB && exp < UNITS.len() {
        scaled /= KIB;
        exp += 1;
    }

    let value = bytes as f64 / (KIB as f64).powi(exp as i32);
    format!("{value:.2} {}", UNITS[exp - 1])
}

/// Format a count with comma thousands separators (`1234567` → `"1,234,567"`).
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && i % 3 == lead % 3 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
