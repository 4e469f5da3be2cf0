//! Defensive re-checks of payload rules the upstream validator already enforces.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::CoreError;

pub(crate) fn positive_amount(field: &str, amount: Decimal) -> Result<(), CoreError> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::Validation(format!(
            "{field} must be a positive number"
        )));
    }
    Ok(())
}

pub(crate) fn non_negative_amount(field: &str, amount: Decimal) -> Result<(), CoreError> {
    if amount < Decimal::ZERO {
        return Err(CoreError::Validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

pub(crate) fn required_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn date_order(start: NaiveDate, end: NaiveDate) -> Result<(), CoreError> {
    if end < start {
        return Err(CoreError::Validation(format!(
            "target date {end} is before start date {start}"
        )));
    }
    Ok(())
}
