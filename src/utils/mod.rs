//! Utility functions for formatting and common operations
//!
//! Centralized formatting for money and return fractions so tables, CSV
//! exports and summaries all display values the same way.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$" prefix (US dollar)
    USD,
    /// No currency symbol (for table cells and CSV exports)
    None,
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value using US conventions:
/// - Thousands separator: `,`
/// - Decimal separator: `.`
///
/// # Arguments
/// * `value` - The decimal value to format
/// * `width` - Minimum width for padding (0 for no padding, right-aligned)
/// * `symbol` - Whether to include currency symbol
///
/// # Examples
/// ```
/// use folio::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.56), 0, CurrencySymbol::USD),
///     "$1,234.56"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 15, CurrencySymbol::None),
///     "       1,234.00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let rounded = round_cents(value);
    let is_negative = rounded < Decimal::ZERO;

    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::USD => "$",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{}{}.{}", sign, prefix, with_separators, decimal_part);

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

// ============ Convenience functions ============

/// Format as US dollars with symbol: "$1,234.56"
///
/// # Examples
/// ```
/// use folio::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "$1,234.56");
/// assert_eq!(format_currency(dec!(-500)), "-$500.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::USD)
}

/// Format as US dollars, right-aligned to specified width.
///
/// # Examples
/// ```
/// use folio::utils::format_currency_aligned;
/// use rust_decimal_macros::dec;
///
/// let result = format_currency_aligned(dec!(100), 12);
/// assert_eq!(result, "     $100.00");
/// ```
pub fn format_currency_aligned(value: Decimal, width: usize) -> String {
    format_currency_with_width(value, width, CurrencySymbol::USD)
}

/// Format a return fraction as a percentage: `0.1234` -> "12.34%"
///
/// # Examples
/// ```
/// use folio::utils::format_percent;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_percent(dec!(0.1)), "10.00%");
/// assert_eq!(format_percent(dec!(-0.02345)), "-2.35%");
/// ```
pub fn format_percent(fraction: Decimal) -> String {
    let pct = round_cents(fraction * Decimal::ONE_HUNDRED);
    if pct.is_zero() {
        return "0.00%".to_string();
    }
    format!("{:.2}%", pct)
}

/// Signed percentage for deltas against a benchmark: "+1.50%"
pub fn format_percent_signed(fraction: Decimal) -> String {
    let formatted = format_percent(fraction);
    if fraction > Decimal::ZERO {
        format!("+{}", formatted)
    } else {
        formatted
    }
}
