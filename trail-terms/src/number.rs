//! Value comparison across the three number representations.

use crate::{Cell, Handle, Heap};
use core::cmp::Ordering;
use num_bigint::BigInt;
use num_traits::FromPrimitive;

/// A number cell decoded for comparison.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Num<'a> {
    Int(i64),
    Big(&'a BigInt),
    Real(f64),
}

impl<'a> Num<'a> {
    pub(crate) fn of(heap: &'a Heap, cell: Cell) -> Option<Self> {
        match cell.0 {
            Handle::Int(i) => Some(Num::Int(i)),
            Handle::BigInt(index) => Some(Num::Big(heap.bigint_at(index))),
            Handle::Real(f) => Some(Num::Real(f)),
            _ => None,
        }
    }

    /// Compares by mathematical value.  `None` only when a NaN is
    /// involved.
    pub(crate) fn value_cmp(&self, other: &Num<'_>) -> Option<Ordering> {
        match (*self, *other) {
            (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
            (Num::Big(a), Num::Big(b)) => Some(a.cmp(b)),
            (Num::Int(a), Num::Big(b)) => Some(BigInt::from(a).cmp(b)),
            (Num::Big(a), Num::Int(b)) => Some(a.cmp(&BigInt::from(b))),
            (Num::Real(a), Num::Real(b)) => a.partial_cmp(&b),
            (Num::Real(a), Num::Int(b)) => real_cmp_int(a, &BigInt::from(b)),
            (Num::Real(a), Num::Big(b)) => real_cmp_int(a, b),
            (Num::Int(a), Num::Real(b)) => real_cmp_int(b, &BigInt::from(a)).map(Ordering::reverse),
            (Num::Big(a), Num::Real(b)) => real_cmp_int(b, a).map(Ordering::reverse),
        }
    }

    /// Numeric equality by value.
    #[inline]
    pub(crate) fn value_eq(&self, other: &Num<'_>) -> bool {
        self.value_cmp(other) == Some(Ordering::Equal)
    }
}

/// Exact comparison of a float with an integer: the integral part
/// decides, and on a tie the sign of the fraction does.
fn real_cmp_int(f: f64, i: &BigInt) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f.is_infinite() {
        return Some(if f > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Less
        });
    }
    let whole = BigInt::from_f64(f.trunc())?;
    match whole.cmp(i) {
        Ordering::Equal => f.fract().partial_cmp(&0.0),
        ord => Some(ord),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn real_against_integers() {
        let big = BigInt::from(1u64 << 60);
        assert_eq!(Num::Real(1.0).value_cmp(&Num::Int(1)), Some(Ordering::Equal));
        assert_eq!(Num::Real(1.5).value_cmp(&Num::Int(1)), Some(Ordering::Greater));
        assert_eq!(Num::Real(-1.5).value_cmp(&Num::Int(-1)), Some(Ordering::Less));
        assert_eq!(Num::Int(2).value_cmp(&Num::Real(1.5)), Some(Ordering::Greater));
        assert_eq!(
            Num::Real((1u64 << 60) as f64).value_cmp(&Num::Big(&big)),
            Some(Ordering::Equal)
        );
        assert_eq!(Num::Real(f64::INFINITY).value_cmp(&Num::Big(&big)), Some(Ordering::Greater));
        assert_eq!(Num::Real(f64::NAN).value_cmp(&Num::Int(0)), None);
    }

    #[test]
    fn large_integer_is_not_rounded_through_float() {
        // 2^53 + 1 is not representable as f64
        let n = (1i64 << 53) + 1;
        assert_eq!(Num::Real((1i64 << 53) as f64).value_cmp(&Num::Int(n)), Some(Ordering::Less));
    }

    quickcheck! {
        fn int_and_bigint_agree(a: i64, b: i64) -> bool {
            let (ba, bb) = (BigInt::from(a), BigInt::from(b));
            let expected = Some(a.cmp(&b));
            Num::Int(a).value_cmp(&Num::Big(&bb)) == expected
                && Num::Big(&ba).value_cmp(&Num::Int(b)) == expected
                && Num::Big(&ba).value_cmp(&Num::Big(&bb)) == expected
        }

        fn int_equals_its_float_when_exact(a: i32) -> bool {
            Num::Int(a as i64).value_eq(&Num::Real(a as f64))
        }
    }
}
