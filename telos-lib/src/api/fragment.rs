/*!

Fragment typing for terms.

A *fragment* is a statically known subset of the term variants a value may hold: a set of
[`TermTag`]s represented as bitflags. Every term node caches the union of its own tag and the
fragments of its children, so asking whether a whole tree stays inside a fragment is a constant
time subset test, and converting between fragments succeeds exactly when the source fragment is
a subset of the destination.

The named fragments below carve the term sum along the same lines as the grammar: constants,
names, first-order machinery, boolean connectives, functional constructs, future and past
temporal operators, arithmetic, and comparisons.

*/

use enumflags2::{bitflags, make_bitflags, BitFlags};

/// One tag per term variant.
#[bitflags]
#[repr(u64)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermTag {
  Error,
  Integer,
  Real,
  Boolean,
  Variable,
  Object,
  Equal,
  Distinct,
  Atom,
  Exists,
  Forall,
  Negation,
  Conjunction,
  Disjunction,
  Implication,
  Ite,
  Lambda,
  Tomorrow,
  WTomorrow,
  Eventually,
  Always,
  Until,
  Release,
  Yesterday,
  WYesterday,
  Once,
  Historically,
  Since,
  Triggered,
  Minus,
  Sum,
  Product,
  Difference,
  Division,
  LessThan,
  LessThanEq,
  GreaterThan,
  GreaterThanEq,
}

pub type Fragment = BitFlags<TermTag>;

/// `true` iff every variant allowed by `sub` is also allowed by `sup`.
#[inline(always)]
pub fn is_subfragment(sub: Fragment, sup: Fragment) -> bool {
  sup.contains(sub)
}

pub mod fragments {
  use super::*;

  pub const CONSTANTS: Fragment = make_bitflags!(TermTag::{Integer | Real | Boolean});

  pub const NAMES: Fragment = make_bitflags!(TermTag::{Variable | Object});

  pub const FIRST_ORDER: Fragment =
    make_bitflags!(TermTag::{Equal | Distinct | Atom | Exists | Forall});

  pub const CONNECTIVES: Fragment =
    make_bitflags!(TermTag::{Negation | Conjunction | Disjunction | Implication});

  pub const FUNCTIONAL: Fragment = make_bitflags!(TermTag::{Ite | Lambda});

  pub const FUTURE: Fragment =
    make_bitflags!(TermTag::{Tomorrow | WTomorrow | Eventually | Always | Until | Release});

  pub const PAST: Fragment =
    make_bitflags!(TermTag::{Yesterday | WYesterday | Once | Historically | Since | Triggered});

  pub const TEMPORAL: Fragment = make_bitflags!(TermTag::{
    Tomorrow | WTomorrow | Eventually | Always | Until | Release |
    Yesterday | WYesterday | Once | Historically | Since | Triggered
  });

  pub const ARITHMETIC: Fragment =
    make_bitflags!(TermTag::{Minus | Sum | Product | Difference | Division});

  pub const COMPARISONS: Fragment =
    make_bitflags!(TermTag::{LessThan | LessThanEq | GreaterThan | GreaterThanEq});

  /// The whole term sum.
  pub const EVERYTHING: Fragment = Fragment::ALL;
}

#[cfg(test)]
mod tests {
  use super::{fragments::*, *};

  #[test]
  fn subset_algebra() {
    assert!(is_subfragment(FUTURE, TEMPORAL));
    assert!(is_subfragment(PAST, TEMPORAL));
    assert!(!is_subfragment(TEMPORAL, FUTURE));
    assert!(is_subfragment(CONSTANTS, EVERYTHING));
    assert_eq!(FUTURE | PAST, TEMPORAL);
  }

  #[test]
  fn disjoint_fragments_do_not_contain_each_other() {
    assert!(!is_subfragment(ARITHMETIC, CONNECTIVES));
    assert!((ARITHMETIC & COMPARISONS).is_empty());
  }
}
