// Number formatting and small arithmetic helpers.
//
// Every formatter here is total: non-finite or missing input renders the
// same as zero, so a bad figure never aborts a report.
use chrono::{Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};

fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Insert `,` between every group of three digits.
fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Digits of `|v|` rounded half away from zero. Works past `i64::MAX`.
fn whole_digits(v: f64) -> String {
    format!("{:.0}", v.round().abs())
}

/// Whole-dollar USD with thousands separators, e.g. `$43,780` or `-$12`.
pub fn format_currency<T: Into<Option<f64>>>(value: T) -> String {
    let v = finite_or_zero(value.into()).round();
    let grouped = group_digits(&whole_digits(v));
    if v < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// One decimal place plus a percent sign, e.g. `19.7%`.
pub fn format_percentage<T: Into<Option<f64>>>(value: T) -> String {
    let v = finite_or_zero(value.into());
    let s = format!("{:.1}%", v);
    // `-0.0` would otherwise print as `-0.0%`.
    if s == "-0.0%" {
        "0.0%".to_string()
    } else {
        s
    }
}

/// Locale-grouped integer, e.g. `28,456`.
pub fn format_number<T: Into<Option<f64>>>(value: T) -> String {
    let v = finite_or_zero(value.into()).round();
    let grouped = group_digits(&whole_digits(v));
    if v < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Grouped number with a fixed number of decimals (`1,234,567.89`).
pub fn format_decimal(n: f64, decimals: usize) -> String {
    let n = if n.is_finite() { n } else { 0.0 };
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let mut res = group_digits(parts.next().unwrap_or("0"));
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    let is_zero = s.chars().all(|c| c == '0' || c == '.');
    if n.is_sign_negative() && !is_zero {
        format!("-{}", res)
    } else {
        res
    }
}

/// Dollar amount with cents, used for unit prices.
pub fn format_unit_price(n: f64) -> String {
    format!("${}", format_decimal(n, 2))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Percentage share of `value` in `total`. A zero (or non-finite) total
/// yields 0 rather than NaN or infinity.
pub fn compute_share(value: f64, total: f64) -> f64 {
    if total == 0.0 || !total.is_finite() || !value.is_finite() {
        return 0.0;
    }
    value / total * 100.0
}

pub fn average(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Parse a `YYYY-MM` month into the first day of that month.
pub fn parse_month(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()
}

/// Last calendar day of the month containing `d`.
pub fn month_end(d: NaiveDate) -> NaiveDate {
    let (y, m) = if d.month() == 12 {
        (d.year() + 1, 1)
    } else {
        (d.year(), d.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(d)
}

/// Minimal HTML escaping for text interpolated into fragments.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_is_whole_dollars_grouped() {
        assert_eq!(format_currency(1_245_800_000.0), "$1,245,800,000");
        assert_eq!(format_currency(43_779.87), "$43,780");
        assert_eq!(format_currency(0.5), "$1");
        assert_eq!(format_currency(-1234.4), "-$1,234");
    }

    #[test]
    fn formatters_treat_missing_as_zero() {
        assert_eq!(format_currency(None), format_currency(0.0));
        assert_eq!(format_number(None), format_number(0.0));
        assert_eq!(format_percentage(None), format_percentage(0.0));
        assert_eq!(format_currency(f64::NAN), "$0");
        assert_eq!(format_percentage(f64::INFINITY), "0.0%");
    }

    #[test]
    fn percentage_has_one_decimal() {
        assert_eq!(format_percentage(19.666), "19.7%");
        assert_eq!(format_percentage(5.0), "5.0%");
        assert_eq!(format_percentage(-0.01), "0.0%");
    }

    #[test]
    fn number_groups_thousands() {
        assert_eq!(format_number(28_456.0), "28,456");
        assert_eq!(format_number(999.6), "1,000");
    }

    #[test]
    fn decimal_keeps_fraction() {
        assert_eq!(format_decimal(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(format_decimal(-3.5, 1), "-3.5");
        assert_eq!(format_unit_price(1820.5), "$1,820.50");
    }

    #[test]
    fn huge_values_keep_their_digits() {
        assert_eq!(format_decimal(1e20, 2), "100,000,000,000,000,000,000.00");
        assert_eq!(format_unit_price(2.5e19), "$25,000,000,000,000,000,000.00");
        assert_eq!(format_currency(1e19), "$10,000,000,000,000,000,000");
        assert_eq!(format_number(-1e19), "-10,000,000,000,000,000,000");
        assert_eq!(format_number(-0.4), "0");
        assert_eq!(group_digits("123"), "123");
        assert_eq!(group_digits("1234"), "1,234");
    }

    #[test]
    fn share_never_divides_by_zero() {
        assert_eq!(compute_share(245_000_000.0, 0.0), 0.0);
        assert_eq!(compute_share(0.0, 0.0), 0.0);
        let s = compute_share(245_000_000.0, 1_245_800_000.0);
        assert_eq!(format_percentage(s), "19.7%");
    }

    #[test]
    fn months_parse_and_end() {
        let d = parse_month("2024-02").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(month_end(d), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let dec = parse_month("2023-12").unwrap();
        assert_eq!(month_end(dec), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(parse_month("2024-13").is_none());
        assert!(parse_month("").is_none());
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("A&B <x>"), "A&amp;B &lt;x&gt;");
    }
}
