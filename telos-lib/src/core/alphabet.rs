/*!

The hash-consing factory behind terms and types.

Every constructed term and type flows through the thread's `Alphabet`. The factory owns two
pools keyed by structural hash, each bucket holding weak references to the live nodes with that
hash. On construction we probe the bucket for a structurally identical node (children compared
by identity, leaf fields by value) and either hand back the existing allocation or register a
new one. Structurally equal values therefore share one allocation, equality on handles is
pointer comparison, and hashing a handle is hashing its address.

The pools hold only weak entries, while every node holds the pool cell strongly. Dropping the
last handle to a node makes its pool entry dead; dead entries are purged when their bucket is
next probed. Nothing outlives the last strong reference to it, and the pool itself lives
exactly as long as some node or `Alphabet` handle does.

One factory exists per thread. Threads never share nodes, which gives the single-threaded
cooperative model its safety: concurrent use is sound exactly when each thread touches a
disjoint set of factories and modules.

*/

use std::rc::{Rc, Weak};

use telos_abs::{HashMap, RcCell, SmallVec};

use crate::{
  api::{
    term::{Term, TermData, TermNode},
    types::{Type, TypeData, TypeNode},
  },
  HashType,
};

pub(crate) type AlphabetCell = RcCell<AlphabetImpl>;

thread_local! {
  static SIGMA: AlphabetCell = RcCell::new(AlphabetImpl::default());
}

/// The thread's factory cell. Leaf constructors start here; composite constructors inherit the
/// cell from their first term argument.
pub(crate) fn sigma() -> AlphabetCell {
  SIGMA.with(|cell| cell.clone())
}

/// Entry point to build terms and types: a handle on the thread's factory.
pub fn alphabet() -> Alphabet {
  Alphabet { cell: sigma() }
}

#[derive(Default)]
pub(crate) struct AlphabetImpl {
  terms: HashMap<HashType, SmallVec<[Weak<TermNode>; 1]>>,
  types: HashMap<HashType, SmallVec<[Weak<TypeNode>; 1]>>,
}

impl AlphabetImpl {
  fn live_count<T>(pool: &HashMap<HashType, SmallVec<[Weak<T>; 1]>>) -> usize {
    pool.values()
        .map(|bucket| bucket.iter().filter(|entry| entry.strong_count() > 0).count())
        .sum()
  }
}

pub struct Alphabet {
  cell: AlphabetCell,
}

impl Alphabet {
  /// The number of live term nodes in the pool.
  pub fn term_pool_size(&self) -> usize {
    AlphabetImpl::live_count(&self.cell.borrow().terms)
  }

  /// The number of live type nodes in the pool.
  pub fn type_pool_size(&self) -> usize {
    AlphabetImpl::live_count(&self.cell.borrow().types)
  }

  pub(crate) fn make_term(cell: AlphabetCell, data: TermData) -> Term {
    let hash = data.structural_hash();

    {
      let mut pool = cell.borrow_mut();
      if let Some(bucket) = pool.terms.get_mut(&hash) {
        bucket.retain(|entry| entry.strong_count() > 0);
        for entry in bucket.iter() {
          if let Some(node) = entry.upgrade() {
            if node.data == data {
              return Term { node };
            }
          }
        }
      }
    }

    let tags = data.fragment_closure();
    let node = Rc::new(TermNode { data, hash, tags, sigma: cell.clone() });
    cell.borrow_mut().terms.entry(hash).or_default().push(Rc::downgrade(&node));

    Term { node }
  }

  pub(crate) fn make_type(cell: AlphabetCell, data: TypeData) -> Type {
    let hash = data.structural_hash();

    {
      let mut pool = cell.borrow_mut();
      if let Some(bucket) = pool.types.get_mut(&hash) {
        bucket.retain(|entry| entry.strong_count() > 0);
        for entry in bucket.iter() {
          if let Some(node) = entry.upgrade() {
            if node.data == data {
              return Type { node };
            }
          }
        }
      }
    }

    let node = Rc::new(TypeNode { data, hash, sigma: cell.clone() });
    cell.borrow_mut().types.entry(hash).or_default().push(Rc::downgrade(&node));

    Type { node }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::label::Label;
  use crate::api::term::{boolean, conjunction, integer, proposition, variable};
  use crate::api::types::{boolean_type, function_type, integer_type};

  #[test]
  fn constants_and_propositions_are_deduplicated() {
    let b1 = boolean(true);
    let b2 = boolean(true);
    assert_eq!(b1, b2);
    assert_eq!(b1.unique_id(), b2.unique_id());

    let p = proposition("p");
    assert_eq!(p.as_variable().unwrap(), &Label::from("p"));
    assert_eq!(p, proposition("p"));
    assert_ne!(p, proposition("q"));
  }

  #[test]
  fn structurally_equal_composites_share_one_allocation() {
    let c = conjunction(vec![boolean(true), variable("x")]);
    let d = conjunction(vec![boolean(true), variable("x")]);
    assert_eq!(c, d);
    assert_eq!(c.unique_id(), d.unique_id());

    let e = conjunction(vec![variable("x"), boolean(true)]);
    assert_ne!(c, e);
  }

  #[test]
  fn types_are_deduplicated_too() {
    assert_eq!(integer_type(), integer_type());
    let f1 = function_type(vec![integer_type(), integer_type()], boolean_type());
    let f2 = function_type(vec![integer_type(), integer_type()], boolean_type());
    assert_eq!(f1, f2);
    assert_ne!(f1, function_type(vec![integer_type()], boolean_type()));
  }

  #[test]
  fn handle_hash_depends_only_on_unique_id() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let hash_of = |t: &crate::api::term::Term| {
      let mut hasher = DefaultHasher::new();
      t.hash(&mut hasher);
      hasher.finish()
    };

    let a = integer(42);
    let b = integer(42);
    assert_eq!(a.unique_id(), b.unique_id());
    assert_eq!(hash_of(&a), hash_of(&b));
  }

  #[test]
  fn dead_pool_entries_are_purged_on_probe() {
    let sigma = alphabet();

    let before = sigma.term_pool_size();
    {
      let _transient = conjunction(vec![integer(123_456), integer(654_321)]);
      assert!(sigma.term_pool_size() >= before + 3);
    }
    // The nodes are dead; the next probe of their buckets drops them. The live count never
    // includes them either way.
    assert_eq!(sigma.term_pool_size(), before);
  }
}
