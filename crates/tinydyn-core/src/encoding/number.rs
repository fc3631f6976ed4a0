//! Exact decimal numbers with 38 significant digits.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::EncodingError;

/// Maximum number of significant decimal digits (matching DynamoDB).
pub const MAX_PRECISION: usize = 38;

/// Smallest allowed position of the most significant digit (1E-130).
const MIN_ADJUSTED_EXPONENT: i64 = -130;

/// Largest allowed position of the most significant digit (9.99..E+125).
const MAX_ADJUSTED_EXPONENT: i64 = 125;

/// An exact decimal number.
///
/// Stored normalized as `digits × 10^exponent` where `digits` carries no
/// leading or trailing zeros, so two numbers are equal exactly when their
/// values are equal (`1.50 == 1.5`). Zero has empty digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number {
    negative: bool,
    digits: String,
    exponent: i32,
}

impl Number {
    /// The number zero.
    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: String::new(),
            exponent: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Whether the value has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.exponent >= 0
    }

    /// Number of significant digits (0 for zero).
    pub fn precision(&self) -> usize {
        self.digits.len()
    }

    /// The value as an `i64`, if it is an integer in range.
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        self.to_string().parse().ok()
    }

    /// The nearest `f64`. Lossy for values with more than ~17 significant digits.
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let sign = if self.negative { "-" } else { "" };
        format!("{sign}{}e{}", self.digits, self.exponent)
            .parse()
            .unwrap_or(f64::NAN)
    }

    /// Build a number from a sign, an unnormalized mantissa of ASCII digits, and
    /// a base-10 exponent, enforcing the precision and magnitude limits.
    fn normalize(negative: bool, mantissa: &str, exponent: i64) -> Result<Self, EncodingError> {
        let trimmed = mantissa.trim_start_matches('0');
        if trimmed.is_empty() {
            return Ok(Self::zero());
        }
        let significant = trimmed.trim_end_matches('0');
        let exponent = exponent + (trimmed.len() - significant.len()) as i64;

        if significant.len() > MAX_PRECISION {
            return Err(EncodingError::InvalidNumber(format!(
                "{} significant digits exceeds the maximum precision of {MAX_PRECISION}",
                significant.len()
            )));
        }

        let adjusted = exponent + significant.len() as i64 - 1;
        if !(MIN_ADJUSTED_EXPONENT..=MAX_ADJUSTED_EXPONENT).contains(&adjusted) {
            return Err(EncodingError::InvalidNumber(format!(
                "magnitude 1E{adjusted} is outside the supported range 1E{MIN_ADJUSTED_EXPONENT}..1E{}",
                MAX_ADJUSTED_EXPONENT + 1
            )));
        }

        Ok(Self {
            negative,
            digits: significant.to_string(),
            // In range by the adjusted-exponent check above.
            exponent: exponent as i32,
        })
    }

    fn from_unsigned(negative: bool, value: u64) -> Self {
        if value == 0 {
            return Self::zero();
        }
        let text = value.to_string();
        let significant = text.trim_end_matches('0');
        Self {
            negative,
            digits: significant.to_string(),
            exponent: (text.len() - significant.len()) as i32,
        }
    }

    /// Position of the most significant digit relative to the decimal point.
    fn adjusted_exponent(&self) -> i64 {
        self.exponent as i64 + self.digits.len() as i64 - 1
    }

    fn signum(&self) -> i8 {
        if self.is_zero() {
            0
        } else if self.negative {
            -1
        } else {
            1
        }
    }
}

impl Default for Number {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Number {
    type Err = EncodingError;

    /// Parse decimal text: optional sign, digits with an optional fraction, and
    /// an optional `e`/`E` exponent (`-12.5`, `3e4`, `.5`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EncodingError::InvalidNumber(format!("'{s}' is not a decimal number"));

        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (mantissa_text, exponent_text) = match rest.find(['e', 'E']) {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };

        let (int_part, frac_part) = match mantissa_text.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa_text, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let exponent: i64 = match exponent_text {
            Some(text) => {
                let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
                if digits.is_empty() || digits.len() > 6 || !digits.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err(invalid());
                }
                text.parse().map_err(|_| invalid())?
            }
            None => 0,
        };

        let mut mantissa = String::with_capacity(int_part.len() + frac_part.len());
        mantissa.push_str(int_part);
        mantissa.push_str(frac_part);
        Number::normalize(negative, &mantissa, exponent - frac_part.len() as i64)
    }
}

impl fmt::Display for Number {
    /// Plain (non-scientific) decimal notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        if self.negative {
            f.write_str("-")?;
        }
        if self.exponent >= 0 {
            f.write_str(&self.digits)?;
            for _ in 0..self.exponent {
                f.write_str("0")?;
            }
            return Ok(());
        }
        let point = self.digits.len() as i64 + self.exponent as i64;
        if point > 0 {
            let (whole, frac) = self.digits.split_at(point as usize);
            write!(f, "{whole}.{frac}")
        } else {
            f.write_str("0.")?;
            for _ in 0..(-point) {
                f.write_str("0")?;
            }
            f.write_str(&self.digits)
        }
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ls, rs) = (self.signum(), other.signum());
        if ls != rs || ls == 0 {
            return ls.cmp(&rs);
        }
        // Digits have no leading zeros, so equal adjusted exponents make the
        // digit strings directly comparable.
        let magnitude = self
            .adjusted_exponent()
            .cmp(&other.adjusted_exponent())
            .then_with(|| self.digits.cmp(&other.digits));
        if self.negative {
            magnitude.reverse()
        } else {
            magnitude
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::from_unsigned(false, value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::from_unsigned(value < 0, value.unsigned_abs())
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Number::from(value as u64)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::from(value as i64)
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number::from(value as u64)
    }
}

impl TryFrom<f64> for Number {
    type Error = EncodingError;

    /// Convert via the shortest decimal text that round-trips the `f64`.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(EncodingError::InvalidNumber(format!(
                "{value} is not a finite number"
            )));
        }
        value.to_string().parse()
    }
}
