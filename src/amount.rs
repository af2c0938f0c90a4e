//! Formatting of whole-euro amounts for display and parsing of amounts typed by users.
//!
//! Amounts are rendered the way the fr-FR locale renders euros, e.g.
//! `125 450,00 €`: digits grouped by three with a narrow no-break space, a
//! decimal comma and a no-break space before the currency sign.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision, Scales};

/// Separates groups of three digits.
pub const GROUP_SEPARATOR: char = '\u{202f}';

/// Separates the number from the currency sign or percent sign.
pub const UNIT_SEPARATOR: char = '\u{a0}';

const DECIMAL_SEPARATOR: char = ',';
const CURRENCY_SYMBOL: char = '€';
const EURO_SUFFIX: &str = "\u{a0}€";
const PERCENT_SUFFIX: &str = "\u{a0}%";

/// Format `value` with thousands separators only, e.g. `125 450`.
///
/// Written out digit by digit rather than through numfmt, which formats via
/// `f64` and so loses precision above 2^53.
pub fn format_number(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut formatted = String::with_capacity(digits.len() * 2);

    if value < 0 {
        formatted.push('-');
    }

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(GROUP_SEPARATOR);
        }

        formatted.push(digit);
    }

    formatted
}

/// Format `value` as a euro amount with cents, e.g. `125 450,00 €`.
///
/// Balances are whole units so the minor units are always `00`.
pub fn format_amount(value: i64) -> String {
    format!(
        "{}{DECIMAL_SEPARATOR}00{UNIT_SEPARATOR}{CURRENCY_SYMBOL}",
        format_number(value)
    )
}

/// Format `value` as a euro amount without cents, e.g. `125 450 €`.
pub fn format_amount_rounded(value: i64) -> String {
    static POSITIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let formatter = if value < 0 {
        NEGATIVE_FMT.get_or_init(|| whole_number_formatter("-", EURO_SUFFIX))
    } else {
        POSITIVE_FMT.get_or_init(|| whole_number_formatter("", EURO_SUFFIX))
    };

    match formatter {
        // Zero is hardcoded as "0" by numfmt, so it is formatted here.
        Some(formatter) if value != 0 => formatter.fmt_string(value.unsigned_abs() as f64),
        _ => format!("{}{EURO_SUFFIX}", format_number(value)),
    }
}

/// Format a ratio in `[0, 1]` as a whole percentage, e.g. `0.254` as `25 %`.
///
/// Non-finite ratios are shown as `0 %`.
pub fn format_percentage(share: f64) -> String {
    static FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let percent = if share.is_finite() {
        (share * 100.0).round()
    } else {
        0.0
    };

    let formatter = FMT.get_or_init(|| whole_number_formatter("", PERCENT_SUFFIX));

    match formatter {
        Some(formatter) if percent > 0.0 => formatter.fmt_string(percent),
        _ => format!("{}{PERCENT_SUFFIX}", format_number(percent as i64)),
    }
}

/// A formatter for whole numbers grouped by [GROUP_SEPARATOR].
///
/// Returns `None` if numfmt rejects the affixes, callers then fall back to
/// [format_number].
fn whole_number_formatter(prefix: &str, suffix: &str) -> Option<Formatter> {
    let formatter = Formatter::new()
        .scales(Scales::none())
        .precision(Precision::Decimals(0))
        .separator(GROUP_SEPARATOR)
        .and_then(|formatter| formatter.prefix(prefix))
        .and_then(|formatter| formatter.suffix(suffix));

    match formatter {
        Ok(formatter) => Some(formatter),
        Err(error) => {
            tracing::error!("could not build number formatter: {error:?}");
            None
        }
    }
}

/// Remove the currency sign and the minor units from a string produced by
/// [format_amount], leaving the grouped whole part, e.g. `125 450`.
pub fn strip_currency_symbols(formatted: &str) -> &str {
    let whole = match formatted.split_once(DECIMAL_SEPARATOR) {
        Some((whole, _)) => whole,
        None => formatted,
    };

    whole
        .trim_end_matches(|c: char| c == CURRENCY_SYMBOL || c.is_whitespace())
        .trim_start()
}

/// Parse the digits in `raw` as an integer, ignoring every other character.
///
/// This lets amount inputs display grouped values (`1 500`) while storing a
/// plain integer. Returns 0 if `raw` has no digits or the number does not fit
/// in an `i64`.
pub fn parse_digits(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    digits.parse().unwrap_or(0)
}

/// Read an amount typed into a form, e.g. `1 500` or `12,5`.
///
/// Whitespace and the currency sign are ignored and a decimal comma is
/// accepted. Unlike [parse_digits] the fractional part is kept so that the
/// validator can reject it. Returns NaN if `raw` is not a number.
pub fn parse_amount_input(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|&c| !c.is_whitespace() && c != CURRENCY_SYMBOL)
        .map(|c| if c == DECIMAL_SEPARATOR { '.' } else { c })
        .collect();

    cleaned.parse().unwrap_or(f64::NAN)
}
