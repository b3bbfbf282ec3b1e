use crate::error::{
    Error,
    Result,
};
use alloy::primitives::{
    U256,
    utils::{
        ParseUnits,
        format_units,
        parse_units,
    },
};

/// Decimals of both the native currencies in the catalog and the betting token.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Parse a human decimal such as `"12.5"` into base units.
pub fn parse_amount(raw: &str, decimals: u8) -> Result<U256> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAmount("empty amount".to_string()));
    }
    match parse_units(trimmed, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(value)) if !value.is_negative() => Ok(value.into_raw()),
        Ok(ParseUnits::I256(_)) => {
            Err(Error::InvalidAmount(format!("negative amount '{trimmed}'")))
        }
        Err(err) => Err(Error::InvalidAmount(format!("'{trimmed}': {err}"))),
    }
}

/// Render base units as a decimal string, keeping one fractional digit for
/// whole amounts (`"50.0"`, `"12.5"`). Zero renders as `"0"`.
pub fn format_amount(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    let Ok(mut formatted) = format_units(value, decimals) else {
        return value.to_string();
    };
    if let Some(dot) = formatted.find('.') {
        let keep = formatted.trim_end_matches('0').len().max(dot + 2);
        formatted.truncate(keep);
    }
    formatted
}
