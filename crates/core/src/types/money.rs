//! Monetary amount checks.
//!
//! Every price, rate and subtotal in the system is stored as `NUMERIC(12, 2)`.
//! [`check_amount`] enforces that shape before anything reaches storage and
//! fixes the scale at two places so amounts serialize as `"12.50"`.

use rust_decimal::Decimal;

/// Total number of significant digits an amount may carry.
pub const MAX_DIGITS: u32 = 12;

/// Number of decimal places an amount may carry.
pub const DECIMAL_PLACES: u32 = 2;

/// Reasons an amount does not fit the storage shape.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    #[error("Ensure that there are no more than {DECIMAL_PLACES} decimal places.")]
    TooManyDecimalPlaces,
    #[error("Ensure that there are no more than {MAX_DIGITS} digits in total.")]
    TooManyDigits,
    #[error("Ensure that there are no more than {} digits before the decimal point.", MAX_DIGITS - DECIMAL_PLACES)]
    TooManyWholeDigits,
}

/// Validate an amount and return it with a fixed scale of two.
///
/// # Errors
///
/// Returns an [`AmountError`] if the amount has more than two decimal places
/// or more digits than a `NUMERIC(12, 2)` column holds.
pub fn check_amount(value: Decimal) -> Result<Decimal, AmountError> {
    let normalized = value.normalize();
    let scale = normalized.scale();

    let whole = normalized.abs().trunc();
    let whole_digits = if whole.is_zero() {
        0
    } else {
        u32::try_from(whole.to_string().len()).unwrap_or(u32::MAX)
    };

    if scale > DECIMAL_PLACES {
        return Err(AmountError::TooManyDecimalPlaces);
    }
    if whole_digits + scale > MAX_DIGITS {
        return Err(AmountError::TooManyDigits);
    }
    if whole_digits > MAX_DIGITS - DECIMAL_PLACES {
        return Err(AmountError::TooManyWholeDigits);
    }

    let mut fixed = normalized;
    fixed.rescale(DECIMAL_PLACES);
    Ok(fixed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_amount_is_rescaled_to_cents() {
        assert_eq!(check_amount(dec("12.5")).unwrap().to_string(), "12.50");
        assert_eq!(check_amount(dec("7")).unwrap().to_string(), "7.00");
        assert_eq!(check_amount(dec("0.10")).unwrap().to_string(), "0.10");
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_places() {
        assert!(check_amount(dec("3.1000")).is_ok());
    }

    #[test]
    fn test_rejects_sub_cent_precision() {
        assert_eq!(
            check_amount(dec("1.005")),
            Err(AmountError::TooManyDecimalPlaces)
        );
    }

    #[test]
    fn test_rejects_oversized_amounts() {
        assert_eq!(
            check_amount(dec("123456789012.5")),
            Err(AmountError::TooManyDigits)
        );
        assert_eq!(
            check_amount(dec("12345678901")),
            Err(AmountError::TooManyWholeDigits)
        );
        assert!(check_amount(dec("9999999999.99")).is_ok());
    }
}
