// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";
pub const CURRENCY_SYMBOL: &str = "₹";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Required,
    InvalidEmail,
    NotPositive,
    NotWholeNumber,
    InvalidMobile,
    InvalidMoney,
    NegativeMoney,
    InvalidDate,
    ExceedsStock(i64),
    CustomerOrCash,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => f.write_str("this field is required"),
            Self::InvalidEmail => f.write_str("enter a valid email address"),
            Self::NotPositive => f.write_str("must be greater than 0"),
            Self::NotWholeNumber => f.write_str("must be a whole number"),
            Self::InvalidMobile => f.write_str("enter a valid 10-digit mobile number"),
            Self::InvalidMoney => f.write_str("invalid money value"),
            Self::NegativeMoney => f.write_str("negative money value"),
            Self::InvalidDate => write!(f, "invalid date, use {DATE_LAYOUT}"),
            Self::ExceedsStock(max) => write!(f, "quantity cannot exceed {max}"),
            Self::CustomerOrCash => f.write_str("select a customer or mark as cash sale"),
        }
    }
}

impl std::error::Error for FieldError {}

pub type ValidationResult<T> = std::result::Result<T, FieldError>;

pub fn required(input: &str) -> ValidationResult<()> {
    if input.trim().is_empty() {
        return Err(FieldError::Required);
    }
    Ok(())
}

/// `local@domain.tld` with no whitespace; blank input is left to `required`.
pub fn email(input: &str) -> ValidationResult<()> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(FieldError::InvalidEmail);
    }
    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(FieldError::InvalidEmail);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(FieldError::InvalidEmail);
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(FieldError::InvalidEmail),
    }
}

pub fn positive_number(input: &str) -> ValidationResult<f64> {
    let value = input
        .trim()
        .parse::<f64>()
        .map_err(|_| FieldError::NotPositive)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(FieldError::NotPositive);
    }
    Ok(value)
}

/// Exactly ten ASCII digits; blank input is left to `required`.
pub fn mobile_number(input: &str) -> ValidationResult<()> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    if trimmed.len() != 10 || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(FieldError::InvalidMobile);
    }
    Ok(())
}

pub fn max_quantity(value: i64, max: i64) -> ValidationResult<()> {
    if value > max {
        return Err(FieldError::ExceedsStock(max));
    }
    Ok(())
}

/// Required whole number strictly above zero.
pub fn parse_quantity(input: &str) -> ValidationResult<i64> {
    let trimmed = input.trim();
    required(trimmed)?;
    let value = match trimmed.parse::<i64>() {
        Ok(value) => value,
        Err(_) => {
            return match trimmed.parse::<f64>() {
                Ok(value) if value.is_finite() && value <= 0.0 => Err(FieldError::NotPositive),
                _ => Err(FieldError::NotWholeNumber),
            };
        }
    };
    if value <= 0 {
        return Err(FieldError::NotPositive);
    }
    Ok(value)
}

/// Whole number at or above zero, blank meaning zero.
pub fn parse_stock(input: &str) -> ValidationResult<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let value = trimmed
        .parse::<i64>()
        .map_err(|_| FieldError::NotWholeNumber)?;
    if value < 0 {
        return Err(FieldError::NotWholeNumber);
    }
    Ok(value)
}

pub fn parse_required_cents(input: &str) -> ValidationResult<i64> {
    let trimmed = input.trim();
    required(trimmed)?;
    parse_cents(trimmed)
}

pub fn parse_required_date(input: &str) -> ValidationResult<Date> {
    let trimmed = input.trim();
    required(trimmed)?;
    Date::parse(trimmed, &format_description!("[year]-[month]-[day]"))
        .map_err(|_| FieldError::InvalidDate)
}

pub fn format_date(value: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        value.year(),
        u8::from(value.month()),
        value.day()
    )
}

/// `₹1 234.50`: currency symbol, space thousands separator, two decimals.
pub fn format_money(cents: i64) -> String {
    let (sign, cents) = normalize_sign(cents);
    format!(
        "{sign}{CURRENCY_SYMBOL}{}.{:02}",
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Whole number with a space every three digits: `10 000`.
pub fn format_count(value: i64) -> String {
    let (sign, value) = normalize_sign(value);
    format!("{sign}{}", group_thousands(value))
}

/// Converts a decimal wire amount to cents, rounding half away from zero.
pub fn cents_from_decimal(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

pub fn cents_to_decimal(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn parse_cents(input: &str) -> ValidationResult<i64> {
    let clean = input.replace([',', ' '], "");
    let clean = clean.strip_prefix(CURRENCY_SYMBOL).unwrap_or(&clean);
    if clean.starts_with('-') {
        return Err(FieldError::NegativeMoney);
    }
    if clean.is_empty() {
        return Err(FieldError::InvalidMoney);
    }

    let (whole, frac) = match clean.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (clean, None),
    };

    let whole = parse_digits(whole, true)?;
    if whole > i64::MAX / 100 {
        return Err(FieldError::InvalidMoney);
    }

    let frac = match frac {
        None => 0,
        Some(frac) if frac.len() > 2 || frac.contains('.') => {
            return Err(FieldError::InvalidMoney);
        }
        Some(frac) => {
            let digits = parse_digits(frac, false)?;
            if frac.len() == 1 { digits * 10 } else { digits }
        }
    };

    Ok(whole * 100 + frac)
}

fn parse_digits(input: &str, allow_empty: bool) -> ValidationResult<i64> {
    if input.is_empty() {
        if allow_empty {
            return Ok(0);
        }
        return Err(FieldError::InvalidMoney);
    }
    if !input.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(FieldError::InvalidMoney);
    }
    input.parse::<i64>().map_err(|_| FieldError::InvalidMoney)
}

fn group_thousands(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

fn normalize_sign(value: i64) -> (&'static str, i64) {
    if value >= 0 {
        return ("", value);
    }
    if value == i64::MIN {
        ("-", i64::MAX)
    } else {
        ("-", -value)
    }
}
