//! Currency amounts as the model writes them.
//!
//! Models decorate costs freely (`"R$ 1.234,56"`, `"600.00"`, `850`). Everything
//! here is exact decimal arithmetic; no amount ever passes through `f64`.

use rust_decimal::Decimal;
use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use std::{fmt, str::FromStr};

/// An amount read from model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amount {
    /// Held by `Decimal` without loss.
    Exact(Decimal),
    /// Well-formed, but too large or too precise for `Decimal`. Carries the
    /// nearest representable value, saturated at `Decimal::MAX`/`MIN`.
    Inexact(Decimal),
}

impl Amount {
    pub fn exact(self) -> Option<Decimal> {
        match self {
            Amount::Exact(amount) => Some(amount),
            Amount::Inexact(_) => None,
        }
    }
}

/// Significant digits above the decimal point that still fit in a `Decimal`.
const MAX_INTEGER_DIGITS: i64 = 29;
/// Past this many leading fractional zeros a value is read as zero outright.
const MAX_FRACTION_ZEROS: i64 = 40;

/// Read a plain or scientific decimal literal (`-12.50`, `1e40`, `2.5E-3`).
fn amount_from_literal(literal: &str) -> Option<Amount> {
    let (negative, unsigned) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => (&unsigned[..idx], parse_exponent(&unsigned[idx + 1..])?),
        None => (unsigned, 0),
    };
    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{integer}{fraction}");
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Some(Amount::Exact(Decimal::ZERO));
    }
    // Position of the decimal point relative to the first significant digit.
    let skipped = (digits.len() - significant.len()) as i64;
    let point = (integer.len() as i64).saturating_add(exponent).saturating_sub(skipped);

    let saturated = if negative { Decimal::MIN } else { Decimal::MAX };
    if point > MAX_INTEGER_DIGITS {
        return Some(Amount::Inexact(saturated));
    }
    if point < -MAX_FRACTION_ZEROS {
        return Some(Amount::Inexact(Decimal::ZERO));
    }

    let magnitude = if point <= 0 {
        format!("0.{}{significant}", "0".repeat(point.unsigned_abs() as usize))
    } else if point as usize >= significant.len() {
        format!("{significant}{}", "0".repeat(point as usize - significant.len()))
    } else {
        let (whole, rest) = significant.split_at(point as usize);
        format!("{whole}.{rest}")
    };
    let plain = if negative { format!("-{magnitude}") } else { magnitude };

    if let Ok(exact) = Decimal::from_str_exact(&plain) {
        return Some(Amount::Exact(exact));
    }
    // Trailing fractional zeros can push the scale past 28 without adding value.
    if plain.contains('.') {
        let trimmed = plain.trim_end_matches('0').trim_end_matches('.');
        if let Ok(exact) = Decimal::from_str_exact(trimmed) {
            return Some(Amount::Exact(exact));
        }
    }
    Some(Amount::Inexact(nearest(&plain, saturated)))
}

/// Exponent of a scientific literal. Out-of-range exponents saturate.
fn parse_exponent(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX / 2);
    Some(if negative { -magnitude } else { magnitude })
}

/// Closest `Decimal` to a plain literal, dropping fraction digits until it fits.
fn nearest(plain: &str, saturated: Decimal) -> Decimal {
    let mut text = plain;
    loop {
        if let Ok(value) = Decimal::from_str(text) {
            return value;
        }
        match text.split_once('.') {
            // Drop the last fraction digit, then the point itself.
            Some((whole, fraction)) if fraction.len() > 1 => {
                text = &text[..whole.len() + fraction.len()];
            }
            Some((whole, _)) => text = whole,
            None => return saturated,
        }
    }
}

/// Read a decorated, locale-agnostic amount such as `"R$ 1.234,56"`.
///
/// Only the first numeric run is read; symbols and words around it are ignored.
/// When both `.` and `,` appear, the last one is the decimal mark. A mark that
/// repeats, or a lone mark followed by exactly three digits, is digit grouping.
pub fn read_amount_text(raw: &str) -> Option<Amount> {
    let mut run = String::new();
    let mut negative = false;
    let mut prev = None;

    for c in raw.chars() {
        if c.is_ascii_digit() {
            if run.is_empty() && prev == Some('-') {
                negative = true;
            }
            run.push(c);
        } else if !run.is_empty() && (c == '.' || c == ',') {
            run.push(c);
        } else if !run.is_empty() {
            break;
        }
        prev = Some(c);
    }

    let run = run.trim_end_matches(&['.', ','][..]);
    if run.is_empty() {
        return None;
    }

    let mark = decimal_mark(run)?;
    let normalized: String = run
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            c if Some(c) == mark => Some('.'),
            _ => None,
        })
        .collect();

    if negative {
        amount_from_literal(&format!("-{normalized}"))
    } else {
        amount_from_literal(&normalized)
    }
}

/// Exact decimal for a decorated amount; `None` when garbled or not representable.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    read_amount_text(raw)?.exact()
}

/// `Ok(None)` means the run has no fractional part; `None` means it is garbled.
fn decimal_mark(run: &str) -> Option<Option<char>> {
    let dots = run.matches('.').count();
    let commas = run.matches(',').count();

    match (dots, commas) {
        (0, 0) => Some(None),
        (_, 0) => Some(lone_mark(run, '.', dots)),
        (0, _) => Some(lone_mark(run, ',', commas)),
        _ => {
            let mark = if run.rfind('.') > run.rfind(',') { '.' } else { ',' };
            let count = if mark == '.' { dots } else { commas };
            (count == 1).then_some(Some(mark))
        }
    }
}

fn lone_mark(run: &str, mark: char, count: usize) -> Option<char> {
    if count > 1 {
        return None;
    }
    let fraction_digits = run.rsplit(mark).next().map_or(0, str::len);
    (fraction_digits != 3).then_some(mark)
}

/// Amount carried by a JSON number or string. Numbers keep their literal
/// digits because serde_json runs with `arbitrary_precision`.
pub fn read_amount(value: &Value) -> Option<Amount> {
    match value {
        Value::Number(number) => amount_from_literal(&number.to_string()),
        Value::String(text) => read_amount_text(text),
        _ => None,
    }
}

/// Exact amount carried by an arbitrary JSON value, if one can be read from it.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    read_amount(value)?.exact()
}

/// A normalized cost estimate. `None` when the model gave nothing readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cost(Option<Decimal>);

impl Cost {
    pub fn new(amount: Decimal) -> Self {
        Self(Some(amount))
    }

    pub fn unknown() -> Self {
        Self(None)
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.0
    }

    pub fn is_known(&self) -> bool {
        self.0.is_some()
    }
}

impl From<Decimal> for Cost {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(amount) => write!(f, "{amount}"),
            None => f.write_str("?"),
        }
    }
}

/// Known amounts serialize as JSON numbers carrying the exact decimal literal.
impl Serialize for Cost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(amount) = self.0 else {
            return serializer.serialize_none();
        };
        let literal = amount.to_string();
        match Number::from_str(&literal) {
            Ok(number) => number.serialize(serializer),
            Err(_) => serializer.serialize_str(&literal),
        }
    }
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::unknown()),
            value @ (Value::Number(_) | Value::String(_)) => Ok(Self(decimal_from_value(&value))),
            other => Err(de::Error::custom(format!(
                "expected a currency amount, found {other}"
            ))),
        }
    }
}

impl JsonSchema for Cost {
    fn schema_name() -> String {
        "Cost".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        let mut schema = SchemaObject {
            instance_type: Some(
                vec![InstanceType::String, InstanceType::Number, InstanceType::Null].into(),
            ),
            ..Default::default()
        };
        schema.metadata().description =
            Some("Estimated cost, as a number or a currency string".to_string());
        schema.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn test_parse_currency_decorated_amounts() {
        assert_eq!(parse_amount("R$ 800,00"), Some(dec("800.00")));
        assert_eq!(parse_amount("600.00"), Some(dec("600.00")));
        assert_eq!(parse_amount("R$ 1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1.234.567"), Some(dec("1234567")));
        assert_eq!(parse_amount("R$ 1.500"), Some(dec("1500")));
        assert_eq!(parse_amount("2,5 mil"), Some(dec("2.5")));
        assert_eq!(parse_amount("  950 reais"), Some(dec("950")));
    }

    #[test]
    fn test_parse_reads_first_numeric_run() {
        assert_eq!(parse_amount("R$ 100 - 200"), Some(dec("100")));
        assert_eq!(parse_amount("Total: R$ 800,00."), Some(dec("800.00")));
        assert_eq!(parse_amount("-R$ 20"), Some(dec("20")));
        assert_eq!(parse_amount("-20,50"), Some(dec("-20.50")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("gratuito"), None);
        assert_eq!(parse_amount("R$"), None);
        assert_eq!(parse_amount("1.2,3,4"), None);
    }

    #[test]
    fn test_unrepresentable_amounts_are_inexact_not_unreadable() {
        let number = |text: &str| read_amount(&serde_json::from_str::<Value>(text).unwrap());

        assert_eq!(number("1e40"), Some(Amount::Inexact(Decimal::MAX)));
        assert_eq!(number("-1e40"), Some(Amount::Inexact(Decimal::MIN)));
        assert_eq!(
            number("100000000000000000000000000000"),
            Some(Amount::Inexact(Decimal::MAX))
        );
        assert_eq!(number("1e-50"), Some(Amount::Inexact(Decimal::ZERO)));

        let precise = number("1000.00000000000000000000000000001").unwrap();
        assert!(matches!(precise, Amount::Inexact(near) if near >= dec("1000")));
        assert_eq!(precise.exact(), None);

        let text = read_amount_text("R$ 100.000.000.000.000.000.000.000.000.000,00");
        assert_eq!(text, Some(Amount::Inexact(Decimal::MAX)));
        assert_eq!(parse_amount("R$ 100.000.000.000.000.000.000.000.000.000,00"), None);
    }

    #[test]
    fn test_scientific_and_padded_literals_stay_exact() {
        let number = |text: &str| read_amount(&serde_json::from_str::<Value>(text).unwrap());

        assert_eq!(number("1.5e2"), Some(Amount::Exact(dec("150"))));
        assert_eq!(number("2.5E-3"), Some(Amount::Exact(dec("0.0025"))));
        assert_eq!(number("0.50"), Some(Amount::Exact(dec("0.50"))));
        assert_eq!(
            number("1000.000000000000000000000000000000"),
            Some(Amount::Exact(dec("1000")))
        );
        assert_eq!(number("-0"), Some(Amount::Exact(Decimal::ZERO)));
        assert_eq!(read_amount(&Value::Bool(true)), None);
    }

    #[test]
    fn test_cost_deserializes_numbers_exactly() {
        let cost: Cost = serde_json::from_str("1234.10").unwrap();
        assert_eq!(cost.amount(), Some(dec("1234.10")));
        assert_eq!(cost.amount().unwrap().to_string(), "1234.10");

        let cost: Cost = serde_json::from_str("\"R$ 99,90\"").unwrap();
        assert_eq!(cost.amount(), Some(dec("99.90")));

        let cost: Cost = serde_json::from_str("null").unwrap();
        assert!(!cost.is_known());

        assert!(serde_json::from_str::<Cost>("[1, 2]").is_err());
    }

    #[test]
    fn test_cost_serializes_as_exact_number() {
        let value = serde_json::to_value(Cost::new(dec("800.00"))).unwrap();
        assert!(value.is_number());
        assert_eq!(value.to_string(), "800.00");
        assert_eq!(serde_json::to_value(Cost::unknown()).unwrap(), Value::Null);

        // Three fraction digits must not be mistaken for digit grouping on the way back.
        let cost = Cost::new(dec("1234.567"));
        let text = serde_json::to_string(&cost).unwrap();
        assert_eq!(text, "1234.567");
        assert_eq!(serde_json::from_str::<Cost>(&text).unwrap(), cost);
    }
}
