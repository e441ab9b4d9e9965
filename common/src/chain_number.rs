//! Exact decimal arithmetic for chain quantities.
//!
//! Every consensus-affecting number in Obelisk - block numbers,
//! timestamps, difficulty maths - is a [`ChainNumber`]:
//! an immutable decimal backed by an arbitrary-size integer magnitude and
//! an explicit scale. Results are truncated (rounded toward zero) to 18
//! significant digits, so every node computes bit-identical values.
//! Binary floating point is never used.

use bigdecimal::{BigDecimal, ParseBigDecimalError, RoundingMode};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

/// Significant-digit precision applied to every rounded operation.
const PRECISION: NonZeroU64 = match NonZeroU64::new(18) {
    Some(p) => p,
    None => panic!("precision must be non-zero"),
};

/// Truncate to [`PRECISION`] significant digits, rounding toward zero.
///
/// Values already within the precision are kept verbatim - no zero
/// padding, so exact small values keep their natural scale.
fn apply_precision(value: BigDecimal) -> BigDecimal {
    if value.digits() > PRECISION.get() {
        value.with_precision_round(PRECISION, RoundingMode::Down)
    } else {
        value
    }
}

fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10), exp as usize)
}

/// An exact, precision-bounded decimal number.
///
/// Equality and ordering are by numeric value: `4.5` and `4.50` compare
/// equal even though their scales differ.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChainNumber(BigDecimal);

impl ChainNumber {
    pub fn zero() -> Self {
        Self(BigDecimal::zero())
    }

    pub fn one() -> Self {
        Self(BigDecimal::from(1))
    }

    pub fn two() -> Self {
        Self(BigDecimal::from(2))
    }

    /// Build from an unbounded integer, truncating to precision.
    pub fn from_bigint(value: BigInt) -> Self {
        Self(apply_precision(BigDecimal::from(value)))
    }

    /// Precision-rounded addition.
    pub fn add(&self, rhs: &Self) -> Self {
        Self(apply_precision(&self.0 + &rhs.0))
    }

    /// Precision-rounded subtraction.
    pub fn sub(&self, rhs: &Self) -> Self {
        Self(apply_precision(&self.0 - &rhs.0))
    }

    /// Precision-rounded multiplication.
    pub fn mul(&self, rhs: &Self) -> Self {
        Self(apply_precision(&self.0 * &rhs.0))
    }

    /// Precision-rounded division, truncating toward zero.
    ///
    /// Computed by integer long division of the scaled magnitudes with
    /// two guard digits, so the first 18 significant digits are exactly
    /// those of the infinite-precision quotient.
    ///
    /// Panics on a zero divisor - callers guard zero spans and zero
    /// counts before dividing.
    pub fn div(&self, rhs: &Self) -> Self {
        if self.0.is_zero() {
            return Self::zero();
        }
        let (ia, sa) = self.0.as_bigint_and_exponent();
        let (ib, sb) = rhs.0.as_bigint_and_exponent();
        let da = BigDecimal::new(ia.clone(), 0).digits() as i64;
        let db = BigDecimal::new(ib.clone(), 0).digits() as i64;

        // Scale the dividend until the integer quotient carries the full
        // precision plus two guard digits
        let shift = PRECISION.get() as i64 - (da - db) + 2;
        let q = if shift >= 0 {
            ia * pow10(shift as u32) / ib
        } else {
            ia / (ib * pow10((-shift) as u32))
        };

        Self(apply_precision(BigDecimal::new(q, sa - sb + shift)))
    }

    /// Division truncated toward zero at the natural result scale
    /// (dividend scale minus divisor scale), full precision.
    ///
    /// Panics on a zero divisor.
    pub fn div_round_down(&self, rhs: &Self) -> Self {
        let (ia, sa) = self.0.as_bigint_and_exponent();
        let (ib, sb) = rhs.0.as_bigint_and_exponent();
        Self(BigDecimal::new(ia / ib, sa - sb))
    }

    /// Remainder after truncated integral division; takes the sign of
    /// the dividend. Panics on a zero divisor.
    pub fn modulo(&self, rhs: &Self) -> Self {
        let (ia, sa) = self.0.as_bigint_and_exponent();
        let (ib, sb) = rhs.0.as_bigint_and_exponent();

        // Align both magnitudes to a common scale, then the truncated
        // BigInt quotient is exactly the integral part of self/rhs
        let common = sa.max(sb);
        let a = ia * pow10((common - sa) as u32);
        let b = ib * pow10((common - sb) as u32);
        let int_q = a / b;

        Self(apply_precision(
            &self.0 - BigDecimal::new(int_q, 0) * &rhs.0,
        ))
    }

    /// Largest integral value not greater than self.
    pub fn floor(&self) -> Self {
        Self(self.0.with_scale_round(0, RoundingMode::Floor))
    }

    /// Smallest integral value not less than self.
    pub fn ceil(&self) -> Self {
        Self(self.0.with_scale_round(0, RoundingMode::Ceiling))
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn increment(&self) -> Self {
        Self(apply_precision(&self.0 + BigDecimal::from(1)))
    }

    pub fn decrement(&self) -> Self {
        Self(apply_precision(&self.0 - BigDecimal::from(1)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The integral part, truncated toward zero.
    pub fn to_bigint(&self) -> BigInt {
        self.0.with_scale_round(0, RoundingMode::Down).into_bigint_and_exponent().0
    }

    /// The integral part as an `i64`; `None` when out of range.
    pub fn to_i64(&self) -> Option<i64> {
        self.to_bigint().to_i64()
    }

    /// Lossy conversion for informational metrics only - never used in
    /// consensus-affecting arithmetic.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

impl Default for ChainNumber {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<u64> for ChainNumber {
    fn from(value: u64) -> Self {
        Self(apply_precision(BigDecimal::from(value)))
    }
}

impl From<i64> for ChainNumber {
    fn from(value: i64) -> Self {
        Self(apply_precision(BigDecimal::from(value)))
    }
}

impl FromStr for ChainNumber {
    type Err = ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(apply_precision(BigDecimal::from_str(s)?)))
    }
}

impl fmt::Display for ChainNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChainNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainNumber({})", self.0)
    }
}

impl Serialize for ChainNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// Binary form: [scale, unscaled signed big-endian magnitude]. The scale
// and magnitude are both preserved exactly, so any value within the
// 18-digit precision reconstructs bit-for-bit.
impl<C> minicbor::Encode<C> for ChainNumber {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let (unscaled, scale) = self.0.as_bigint_and_exponent();
        e.array(2)?.i64(scale)?.bytes(&unscaled.to_signed_bytes_be())?.ok()
    }
}

impl<'a, C> minicbor::Decode<'a, C> for ChainNumber {
    fn decode(
        d: &mut minicbor::Decoder<'a>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        if d.array()? != Some(2) {
            return Err(minicbor::decode::Error::message(
                "expected [scale, unscaled] array",
            ));
        }
        let scale = d.i64()?;
        let unscaled = BigInt::from_signed_bytes_be(d.bytes()?);
        Ok(Self(apply_precision(BigDecimal::new(unscaled, scale))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> ChainNumber {
        s.parse().unwrap()
    }

    #[test]
    fn value_equality_ignores_scale() {
        assert_eq!(num("4.5"), num("4.50"));
        assert_eq!(num("5"), num("5.000"));
        assert!(num("1.1") > num("1.09"));
        assert!(num("-3") < num("2"));
    }

    #[test]
    fn addition_and_subtraction_are_exact() {
        assert_eq!(num("10000.001").add(&num("0.009")), num("10000.01"));
        assert_eq!(num("1").sub(&num("0.000000000000001")), num("0.999999999999999"));
    }

    #[test]
    fn division_truncates_to_eighteen_digits() {
        let third = ChainNumber::one().div(&num("3"));
        assert_eq!(third, num("0.333333333333333333"));

        // Round-down, not half-even: 2/3 truncates the trailing 6s
        let two_thirds = ChainNumber::two().div(&num("3"));
        assert_eq!(two_thirds, num("0.666666666666666666"));
    }

    #[test]
    fn division_exact_values() {
        assert_eq!(num("18").div(&num("4")), num("4.5"));
        assert_eq!(num("10").div(&num("2")), num("5"));
        assert_eq!(num("-1").div(&num("3")), num("-0.333333333333333333"));
    }

    #[test]
    fn div_round_down_keeps_natural_scale() {
        assert_eq!(num("7").div_round_down(&num("2")), num("3"));
        assert_eq!(num("-7").div_round_down(&num("2")), num("-3"));
        assert_eq!(num("7.5").div_round_down(&num("2")), num("3.7"));
    }

    #[test]
    fn modulo_takes_dividend_sign() {
        assert_eq!(num("7").modulo(&num("3")), num("1"));
        assert_eq!(num("-7").modulo(&num("3")), num("-1"));
        assert_eq!(num("7.5").modulo(&num("2")), num("1.5"));
    }

    #[test]
    fn floor_and_ceil() {
        assert_eq!(num("2.7").floor(), num("2"));
        assert_eq!(num("-2.1").floor(), num("-3"));
        assert_eq!(num("2.1").ceil(), num("3"));
        assert_eq!(num("-2.7").ceil(), num("-2"));
    }

    #[test]
    fn increment_decrement_abs() {
        assert_eq!(num("41").increment(), num("42"));
        assert_eq!(num("0").decrement(), num("-1"));
        assert_eq!(num("-12.5").abs(), num("12.5"));
    }

    #[test]
    fn integral_extraction_truncates() {
        assert_eq!(num("2.9").to_i64(), Some(2));
        assert_eq!(num("-2.9").to_i64(), Some(-2));
        assert_eq!(num("123456789").to_bigint(), BigInt::from(123456789u64));
    }

    #[test]
    fn multiplication_truncates_past_precision() {
        // Exact product is 0.1111111101111111102 - 19 digits, so the
        // trailing 2 is truncated, never rounded up
        let product = num("0.123456789012345678").mul(&num("0.9"));
        assert_eq!(product, num("0.111111110111111110"));
    }

    #[test]
    fn cbor_round_trip_preserves_scale_and_magnitude() {
        for s in ["0", "1", "-1", "4.5", "-0.333333333333333333", "123456789.987654321"] {
            let value = num(s);
            let bytes = minicbor::to_vec(&value).unwrap();
            let back: ChainNumber = minicbor::decode(&bytes).unwrap();
            assert_eq!(back, value, "round trip of {s}");
            // Bit-for-bit: re-encoding is byte-identical
            assert_eq!(minicbor::to_vec(&back).unwrap(), bytes, "re-encode of {s}");
        }
    }

    #[test]
    fn cbor_round_trip_of_operation_results() {
        let speedy = num("17").div(&num("7")).mul(&num("1000"));
        let bytes = minicbor::to_vec(&speedy).unwrap();
        let back: ChainNumber = minicbor::decode(&bytes).unwrap();
        assert_eq!(back, speedy);
    }

    #[test]
    fn corrupt_cbor_is_an_error() {
        // Not an array at all
        let bytes = minicbor::to_vec(42u8).unwrap();
        assert!(minicbor::decode::<ChainNumber>(&bytes).is_err());

        // Truncated payload
        let good = minicbor::to_vec(num("4.5")).unwrap();
        assert!(minicbor::decode::<ChainNumber>(&good[..good.len() - 1]).is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("not-a-number".parse::<ChainNumber>().is_err());
    }
}
