//! Null-aware ordering and script equality
//!
//! Ordering comes in two families differing only in null placement:
//! null-smallest (ascending sorts) and null-largest (strict relational
//! operators). Script equality treats one-element collections as transparent
//! wrappers around their element, normalizes numbers, and falls back to
//! string comparison when either side is string-like.

use std::cmp::Ordering;

use itertools::{EitherOrBoth, Itertools};

use crate::runtime::values::Value;

/// Where null sorts relative to every other value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrder {
    Smallest,
    Largest,
}

/// Total order over values under the given null policy.
///
/// Numbers are normalized before comparison (two integrals compare as 64-bit
/// integers, otherwise both widen to double). List-typed keys compare
/// lexicographically element-by-element under the same null policy; a strict
/// prefix is smaller than its extension. Values of mutually incomparable
/// kinds are ordered by a fixed kind rank so sorting mixed lists stays total
/// and deterministic.
pub fn compare_values(a: &Value, b: &Value, nulls: NullOrder) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => match nulls {
            NullOrder::Smallest => Ordering::Less,
            NullOrder::Largest => Ordering::Greater,
        },
        (_, Value::Null) => match nulls {
            NullOrder::Smallest => Ordering::Greater,
            NullOrder::Largest => Ordering::Less,
        },
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (x, y) if x.is_numeric() && y.is_numeric() => {
            numeric(x).total_cmp(&numeric(y))
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (x, y) if x.is_string_like() && y.is_string_like() => text_of(x).cmp(&text_of(y)),
        (x, y) if x.is_collection() && y.is_collection() => {
            compare_elements(&x.elements(), &y.elements(), nulls)
        }
        (Value::Obj(x), Value::Obj(y)) => x.cmp(y),
        (Value::Type(x), Value::Type(y)) => x.cmp(y),
        (Value::Part(x), Value::Part(y)) => x.cmp(y),
        (x, y) => kind_rank(x).cmp(&kind_rank(y)),
    }
}

fn compare_elements(a: &[Value], b: &[Value], nulls: NullOrder) -> Ordering {
    for pair in a.iter().zip_longest(b.iter()) {
        match pair {
            EitherOrBoth::Both(x, y) => {
                let ordering = compare_values(x, y, nulls);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            // A strict prefix is smaller than its extension.
            EitherOrBoth::Left(_) => return Ordering::Greater,
            EitherOrBoth::Right(_) => return Ordering::Less,
        }
    }
    Ordering::Equal
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Date(_) => 3,
        Value::Str(_) | Value::Message(_) => 4,
        Value::List(_) | Value::Set(_) => 5,
        Value::Map(_) => 6,
        Value::Obj(_) => 7,
        Value::Type(_) => 8,
        Value::Part(_) => 9,
        Value::Function(_) => 10,
    }
}

fn numeric(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

/// Script equality.
///
/// One-element collections are identified with their element (to-one
/// relations are frequently represented as one-element collections), empty
/// collections are identified with null, numbers are normalized, and a
/// string-like side forces string comparison. A set and a list of more than
/// one element are never equal, even with identical elements; dependent
/// script behavior relies on this.
pub fn is_equal(a: &Value, b: &Value) -> bool {
    if a.is_collection() || b.is_collection() {
        let size_a = a.collection_len();
        let size_b = b.collection_len();
        if size_a != size_b {
            return false;
        }
        return match size_a {
            0 => true,
            1 => is_equal(&single_of(a), &single_of(b)),
            _ => match (a, b) {
                (Value::Set(x), Value::Set(y)) => {
                    x.iter().all(|e| y.iter().any(|f| is_equal(e, f)))
                        && y.iter().all(|e| x.iter().any(|f| is_equal(e, f)))
                }
                (Value::List(x), Value::List(y)) => {
                    x.iter().zip(y.iter()).all(|(e, f)| is_equal(e, f))
                }
                _ => a == b,
            },
        };
    }

    if a.is_numeric() && b.is_numeric() {
        return match (a, b) {
            (Value::Int(x), Value::Int(y)) => x == y,
            _ => numeric(a) == numeric(b),
        };
    }

    if a.is_string_like() || b.is_string_like() {
        return text_of(a) == text_of(b);
    }

    a == b
}

/// The first element of a one-element collection, or the value itself.
fn single_of(value: &Value) -> Value {
    match value {
        Value::List(l) => l.first().cloned().unwrap_or(Value::Null),
        Value::Set(s) => s.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Plain-text rendering used by string comparison and concatenation: null is
/// empty, strings render unquoted, integral numbers render without a
/// fraction.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Str(s) => s.clone(),
        Value::Message(m) => m.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;
    use proptest::prelude::*;

    fn set_of(values: Vec<Value>) -> Value {
        Value::Set(values.into_iter().collect::<IndexSet<Value>>())
    }

    #[test]
    fn null_placement() {
        let five = Value::Int(5);
        assert_eq!(
            compare_values(&Value::Null, &five, NullOrder::Largest),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&five, &Value::Null, NullOrder::Largest),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&Value::Null, &five, NullOrder::Smallest),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&five, &Value::Null, NullOrder::Smallest),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&Value::Null, &Value::Null, NullOrder::Largest),
            Ordering::Equal
        );
    }

    #[test]
    fn numbers_normalize_across_kinds() {
        assert_eq!(
            compare_values(&Value::Int(1), &Value::Float(1.0), NullOrder::Smallest),
            Ordering::Equal
        );
        assert_eq!(
            compare_values(&Value::Int(1), &Value::Float(0.5), NullOrder::Smallest),
            Ordering::Greater
        );
        assert!(is_equal(&Value::Int(100), &Value::Float(1e2)));
        assert!(!is_equal(&Value::Int(1), &Value::Float(1.1)));
    }

    #[test]
    fn list_keys_compare_lexicographically() {
        let short = Value::List(vec![Value::Int(1)]);
        let long = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            compare_values(&short, &long, NullOrder::Smallest),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&long, &short, NullOrder::Smallest),
            Ordering::Greater
        );

        let a = Value::List(vec![Value::Int(1), Value::Int(3)]);
        let b = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(compare_values(&a, &b, NullOrder::Smallest), Ordering::Greater);
    }

    #[test]
    fn singular_collection_unwrapping() {
        assert!(is_equal(&Value::List(vec![Value::Int(7)]), &Value::Int(7)));
        assert!(is_equal(&Value::Int(7), &Value::List(vec![Value::Int(7)])));
        assert!(!is_equal(
            &Value::List(vec![Value::Int(7), Value::Int(8)]),
            &Value::Int(7)
        ));
        assert!(is_equal(&set_of(vec![Value::Int(7)]), &Value::Int(7)));
        assert!(is_equal(
            &set_of(vec![Value::Int(7)]),
            &Value::List(vec![Value::Int(7)])
        ));
    }

    #[test]
    fn empty_collections_equal_null() {
        assert!(is_equal(&Value::Null, &Value::List(vec![])));
        assert!(is_equal(&Value::List(vec![]), &set_of(vec![])));
        assert!(!is_equal(&Value::Str("a".to_string()), &Value::List(vec![])));
    }

    #[test]
    fn sets_compare_unordered_lists_in_order() {
        assert!(is_equal(
            &set_of(vec![Value::Int(1), Value::Int(2)]),
            &set_of(vec![Value::Int(2), Value::Int(1)])
        ));
        assert!(is_equal(
            &Value::List(vec![Value::Int(1), Value::Int(2)]),
            &Value::List(vec![Value::Int(1), Value::Int(2)])
        ));
        assert!(!is_equal(
            &Value::List(vec![Value::Int(1), Value::Int(2)]),
            &Value::List(vec![Value::Int(2), Value::Int(1)])
        ));
    }

    #[test]
    fn mixed_set_list_equality_stays_false() {
        // Documented fallback: a set and a list of size > 1 are never equal,
        // even as multisets.
        assert!(!is_equal(
            &set_of(vec![Value::Int(1), Value::Int(2)]),
            &Value::List(vec![Value::Int(2), Value::Int(1)])
        ));
    }

    #[test]
    fn string_comparison_stringifies_the_other_side() {
        assert!(is_equal(&Value::Str("2".to_string()), &Value::Int(2)));
        assert!(is_equal(&Value::Float(2.0), &Value::Str("2".to_string())));
        assert!(!is_equal(&Value::Str("2.5".to_string()), &Value::Int(2)));
    }

    proptest! {
        #[test]
        fn compare_is_antisymmetric(x in -1000i64..1000, y in -1000i64..1000) {
            let a = Value::Int(x);
            let b = Value::Int(y);
            prop_assert_eq!(
                compare_values(&a, &b, NullOrder::Smallest),
                compare_values(&b, &a, NullOrder::Smallest).reverse()
            );
        }

        #[test]
        fn null_policies_agree_on_non_null(x in -1000i64..1000, y in proptest::option::of(-1000i64..1000)) {
            let a = Value::Int(x);
            let b = y.map(Value::Int).unwrap_or(Value::Null);
            let smallest = compare_values(&a, &b, NullOrder::Smallest);
            let largest = compare_values(&a, &b, NullOrder::Largest);
            if b.is_null() {
                prop_assert_eq!(smallest, largest.reverse());
            } else {
                prop_assert_eq!(smallest, largest);
            }
        }
    }
}
