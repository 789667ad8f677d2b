//! Resource quantity comparison
//!
//! The API server stores quantities in canonical form, so a request written
//! as `1024Mi` reads back as `1Gi`. `Quantity` parses the Kubernetes
//! quantity grammar (decimal number, then an optional binary suffix, decimal
//! suffix, or `e<n>` exponent) into an exact value, so two spellings of the
//! same amount compare equal.

use std::collections::BTreeMap;
use std::str::FromStr;

use volclaim_common::Error;

const BINARY_SUFFIXES: &[(&str, u32)] = &[
    ("Ki", 10),
    ("Mi", 20),
    ("Gi", 30),
    ("Ti", 40),
    ("Pi", 50),
    ("Ei", 60),
];

const DECIMAL_SUFFIXES: &[(&str, i32)] = &[
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("", 0),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

/// Exact value of a quantity: `numerator / 10^scale`, with trailing zeros
/// stripped from the numerator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quantity {
    negative: bool,
    numerator: u128,
    scale: u32,
}

impl Quantity {
    fn normalized(negative: bool, mut numerator: u128, mut scale: u32) -> Self {
        while scale > 0 && numerator % 10 == 0 {
            numerator /= 10;
            scale -= 1;
        }
        Self {
            negative: negative && numerator != 0,
            numerator,
            scale,
        }
    }
}

fn invalid(input: &str) -> Error {
    Error::validation(format!("invalid quantity '{}'", input))
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Error> {
        let (negative, rest) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };

        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(number_len);
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid(input));
        }

        let digits = format!("{whole}{fraction}");
        let mut numerator: u128 = digits.parse().map_err(|_| invalid(input))?;
        let mut scale = fraction.len() as u32;

        let exponent = if let Some(&(_, shift)) = BINARY_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
            numerator = numerator
                .checked_mul(1u128 << shift)
                .ok_or_else(|| invalid(input))?;
            0
        } else if let Some(&(_, exp)) = DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
            exp
        } else {
            suffix
                .strip_prefix(|c: char| c == 'e' || c == 'E')
                .and_then(|exp| exp.parse::<i32>().ok())
                .ok_or_else(|| invalid(input))?
        };

        if exponent >= 0 {
            numerator = 10u128
                .checked_pow(exponent.unsigned_abs())
                .and_then(|factor| numerator.checked_mul(factor))
                .ok_or_else(|| invalid(input))?;
        } else {
            scale += exponent.unsigned_abs();
        }
        Ok(Self::normalized(negative, numerator, scale))
    }
}

/// True when two quantity strings denote the same amount
///
/// Strings that do not parse are compared verbatim.
pub fn same_quantity(a: &str, b: &str) -> bool {
    match (a.parse::<Quantity>(), b.parse::<Quantity>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// True when two resource maps have the same keys with equal quantities
pub fn same_resources(a: &BTreeMap<String, String>, b: &BTreeMap<String, String>) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && same_quantity(va, vb))
}
