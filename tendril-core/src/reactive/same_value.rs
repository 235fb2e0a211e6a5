//! SameValue equality.
//!
//! Signal writes are dropped when the new value is the *same value* as the
//! current one. "Same" follows `Object.is`: floats compare by identity of
//! their representation (`NaN` is the same as `NaN`, `+0.0` is not the same
//! as `-0.0`), shared pointers compare by address, and everything else
//! compares structurally.

use std::rc::Rc;
use std::sync::Arc;

/// Equality used to short-circuit signal writes.
pub trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

/// Implement [`SameValue`] through `PartialEq` for the listed types.
///
/// ```rust,ignore
/// #[derive(Clone, PartialEq)]
/// struct Point { x: i32, y: i32 }
/// same_value_by_eq!(Point);
/// ```
#[macro_export]
macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::reactive::SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    String,
    &'static str,
    std::time::Duration,
);

macro_rules! same_value_float {
    ($($ty:ty),*) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    if self.is_nan() && other.is_nan() {
                        return true;
                    }
                    self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

same_value_float!(f32, f64);

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: SameValue> SameValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<T: SameValue + ?Sized> SameValue for Box<T> {
    fn same_value(&self, other: &Self) -> bool {
        (**self).same_value(&**other)
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

macro_rules! same_value_tuple {
    ($(($($name:ident : $idx:tt),+)),*) => {
        $(
            impl<$($name: SameValue),+> SameValue for ($($name,)+) {
                fn same_value(&self, other: &Self) -> bool {
                    $(self.$idx.same_value(&other.$idx))&&+
                }
            }
        )*
    };
}

same_value_tuple!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3)
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_same_as_nan() {
        assert!(f64::NAN.same_value(&f64::NAN));
        assert!(f32::NAN.same_value(&f32::NAN));
    }

    #[test]
    fn signed_zeros_differ() {
        assert!(!0.0_f64.same_value(&-0.0));
        assert!(0.0_f64.same_value(&0.0));
    }

    #[test]
    fn rc_compares_by_identity() {
        let a = Rc::new(vec![1, 2]);
        let b = Rc::new(vec![1, 2]);
        assert!(a.same_value(&a.clone()));
        assert!(!a.same_value(&b));
    }

    #[test]
    fn containers_compare_structurally() {
        assert!(Some(f64::NAN).same_value(&Some(f64::NAN)));
        assert!(!Some(1).same_value(&None));
        assert!(vec![1, 2, 3].same_value(&vec![1, 2, 3]));
        assert!(!vec![1, 2].same_value(&vec![1, 2, 3]));
        assert!((1, "a".to_string()).same_value(&(1, "a".to_string())));
        assert!(!(1, 2.0).same_value(&(1, -2.0)));
    }

    #[derive(Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    crate::same_value_by_eq!(Point);

    #[test]
    fn opt_in_through_partial_eq() {
        assert!(Point { x: 1, y: 2 }.same_value(&Point { x: 1, y: 2 }));
        assert!(!Point { x: 1, y: 2 }.same_value(&Point { x: 2, y: 1 }));
    }
}
