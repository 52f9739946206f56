// vesper-parser - Arbitrary precision decimal numbers
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Decimal numbers (`1.25M`) stored as an unscaled [`BigInt`] and a base-10
//! scale: the value is `unscaled * 10^-scale`.
//!
//! Equality, ordering and hashing are numeric: `1.5M` equals `1.50M`. The
//! printed form keeps the scale it was read or computed with.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Scale used for quotients that do not terminate.
pub const DIVISION_SCALE: u32 = 16;

#[derive(Clone)]
pub struct Decimal {
    unscaled: BigInt,
    scale: u32,
}

fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

impl Decimal {
    pub fn new(unscaled: BigInt, scale: u32) -> Self {
        Decimal { unscaled, scale }
    }

    pub fn from_i64(n: i64) -> Self {
        Decimal::new(BigInt::from(n), 0)
    }

    /// Convert a float through its shortest decimal representation.
    pub fn from_f64(f: f64) -> Option<Self> {
        if !f.is_finite() {
            return None;
        }
        format!("{}", f).parse().ok()
    }

    #[must_use]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    #[must_use]
    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.unscaled.is_zero()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.unscaled.sign() == Sign::Minus
    }

    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Integral part, truncated towards zero, if it fits in an `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        (&self.unscaled / pow10(self.scale)).to_i64()
    }

    fn rescaled(&self, scale: u32) -> BigInt {
        debug_assert!(scale >= self.scale);
        &self.unscaled * pow10(scale - self.scale)
    }

    /// Both operands brought to a common scale.
    fn aligned(&self, other: &Decimal) -> (BigInt, BigInt, u32) {
        let scale = self.scale.max(other.scale);
        (self.rescaled(scale), other.rescaled(scale), scale)
    }

    /// Drop trailing zeros from the fractional part.
    #[must_use]
    pub fn normalized(&self) -> Decimal {
        let ten = BigInt::from(10u8);
        let mut unscaled = self.unscaled.clone();
        let mut scale = self.scale;
        while scale > 0 && (&unscaled % &ten).is_zero() {
            unscaled /= &ten;
            scale -= 1;
        }
        Decimal::new(unscaled, scale)
    }

    #[must_use]
    pub fn add(&self, other: &Decimal) -> Decimal {
        let (a, b, scale) = self.aligned(other);
        Decimal::new(a + b, scale)
    }

    #[must_use]
    pub fn sub(&self, other: &Decimal) -> Decimal {
        let (a, b, scale) = self.aligned(other);
        Decimal::new(a - b, scale)
    }

    #[must_use]
    pub fn mul(&self, other: &Decimal) -> Decimal {
        Decimal::new(&self.unscaled * &other.unscaled, self.scale + other.scale)
    }

    #[must_use]
    pub fn neg(&self) -> Decimal {
        Decimal::new(-&self.unscaled, self.scale)
    }

    /// Quotient rounded half-up to [`DIVISION_SCALE`] places, trailing
    /// zeros removed. `None` on division by zero.
    pub fn div(&self, other: &Decimal) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        // a/10^sa / (b/10^sb) = (a * 10^(sb + S)) / (b * 10^sa) * 10^-S
        let num = &self.unscaled * pow10(other.scale + DIVISION_SCALE + 1);
        let den = &other.unscaled * pow10(self.scale);
        let q = num / den;
        let rounded = (&q + q.signum() * BigInt::from(5u8)) / BigInt::from(10u8);
        Some(Decimal::new(rounded, DIVISION_SCALE).normalized())
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, _) = self.aligned(other);
        a.cmp(&b)
    }
}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let n = self.normalized();
        n.unscaled.hash(state);
        n.scale.hash(state);
    }
}

impl fmt::Display for Decimal {
    /// Plain decimal notation without the `M` suffix.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.abs().to_string();
        let sign = if self.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}M", self)
    }
}

/// Error returned when text is not a plain decimal literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError;

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid decimal literal")
    }
}

impl std::error::Error for ParseDecimalError {}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Accepts `-?digits(.digits*)?` optionally followed by `e[+-]?digits`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = s[pos + 1..].parse().map_err(|_| ParseDecimalError)?;
                (&s[..pos], exp)
            }
            None => (s, 0),
        };
        let (negative, body) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ParseDecimalError);
        }
        let digits = format!("{}{}", int_part, frac_part);
        let mut unscaled = BigInt::from_str(&digits).map_err(|_| ParseDecimalError)?;
        if negative {
            unscaled = -unscaled;
        }
        let mut scale = frac_part.len() as i64 - exponent;
        if scale < 0 {
            unscaled *= pow10((-scale) as u32);
            scale = 0;
        }
        let scale = u32::try_from(scale).map_err(|_| ParseDecimalError)?;
        Ok(Decimal::new(unscaled, scale))
    }
}

impl From<i64> for Decimal {
    fn from(n: i64) -> Self {
        Decimal::from_i64(n)
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Decimal::new(BigInt::zero(), 0)
    }
}

impl Decimal {
    /// `1` with scale 0.
    pub fn one() -> Self {
        Decimal::new(BigInt::one(), 0)
    }
}
