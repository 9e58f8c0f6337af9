/*!

The term layer of the AST: a hash-consed, strongly typed tree for FO-LTL+P.

A `Term` is a cheap handle to a pooled node. Structurally equal terms share one allocation, so
equality on handles is pointer comparison, hashing is hashing the node address, and terms can be
used freely as map keys. Construction goes through the thread's [`Alphabet`] factory (see
[`crate::core::alphabet`]); composite constructors inherit the factory from their first term
argument.

Three ways to look inside a term:

 * the typed accessors (`argument()`, `left()`, `args()`, `head()`, `binds()`, `body()`, …),
   which return references into the pooled node and `None` on a foreign variant;
 * [`Term::view`], a borrowed enum with one arm per variant and the fields unpacked, for
   exhaustive `match`ing;
 * [`Term::operands`], which flattens nested applications of the same associative connective
   (`Equal`/`Distinct`/`Conjunction`/`Disjunction`) into a single left-to-right sequence.

Construction never fails on well-formed input. Ill-typed combinations surface later, as `Error`
*values* from [`type_of`](crate::api::semantics::type_of), never as panics; the one exception is
the arity requirement on the associative constructors (at least two operands), which is a
programming error and asserts.

*/

use std::{
  hash::{Hash, Hasher},
  rc::{Rc, Weak},
};

use ordered_float::OrderedFloat;
use telos_abs::{join_string, SmallVec};

use crate::{
  api::{
    fragment::{Fragment, TermTag},
    label::Label,
  },
  core::{
    alphabet::{sigma, Alphabet, AlphabetCell},
    format::{FormatStyle, Formattable},
    module::entity::{Decl, Entity},
  },
  impl_display_debug_for_formattable,
  HashType,
};

/// Argument vectors of the n-ary variants.
pub(crate) type Args = SmallVec<[Term; 2]>;

// region ObjectRef

/// A non-owning reference to a resolved [`Entity`]. This is the payload of the `Object` term
/// variant: the entity is owned by its [`Root`](crate::core::module::entity::Root), and the
/// object is valid exactly as long as some root holding the entity is alive.
pub struct ObjectRef(pub(crate) Weak<Entity>);

impl ObjectRef {
  /// The referenced entity, or `None` if its owning root has been dropped.
  pub fn entity(&self) -> Option<Rc<Entity>> {
    self.0.upgrade()
  }

  /// Address-based identity of the referenced entity.
  #[inline(always)]
  pub(crate) fn addr(&self) -> usize {
    self.0.as_ptr() as usize
  }
}

impl Clone for ObjectRef {
  fn clone(&self) -> Self {
    ObjectRef(Weak::clone(&self.0))
  }
}

impl PartialEq for ObjectRef {
  fn eq(&self, other: &Self) -> bool {
    Weak::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_usize(self.addr());
  }
}

// endregion

// region TermData and TermNode

/// The structural payload of a term node. Children are handles, so the derived `PartialEq` is
/// the shallow comparison the pool needs, and the derived `Hash` is the structural hash.
#[derive(PartialEq, Hash)]
pub(crate) enum TermData {
  Error { source: Term, message: String },

  // Constants
  Integer(i64),
  Real(OrderedFloat<f64>),
  Boolean(bool),

  // Names
  Variable(Label),
  Object(ObjectRef),

  // First-order
  Equal(Args),
  Distinct(Args),
  Atom { head: Term, args: Args },
  Exists { binds: Vec<Decl>, body: Term },
  Forall { binds: Vec<Decl>, body: Term },

  // Boolean connectives
  Negation(Term),
  Conjunction(Args),
  Disjunction(Args),
  Implication { left: Term, right: Term },

  // Functional constructs
  Ite { guard: Term, iftrue: Term, iffalse: Term },
  Lambda { vars: Vec<Decl>, body: Term },

  // Future LTL
  Tomorrow(Term),
  WTomorrow(Term),
  Eventually(Term),
  Always(Term),
  Until { left: Term, right: Term },
  Release { left: Term, right: Term },

  // Past LTL
  Yesterday(Term),
  WYesterday(Term),
  Once(Term),
  Historically(Term),
  Since { left: Term, right: Term },
  Triggered { left: Term, right: Term },

  // Arithmetic
  Minus(Term),
  Sum { left: Term, right: Term },
  Product { left: Term, right: Term },
  Difference { left: Term, right: Term },
  Division { left: Term, right: Term },

  // Relational comparisons
  LessThan { left: Term, right: Term },
  LessThanEq { left: Term, right: Term },
  GreaterThan { left: Term, right: Term },
  GreaterThanEq { left: Term, right: Term },
}

impl TermData {
  pub(crate) fn tag(&self) -> TermTag {
    match self {
      TermData::Error { .. } => TermTag::Error,
      TermData::Integer(_) => TermTag::Integer,
      TermData::Real(_) => TermTag::Real,
      TermData::Boolean(_) => TermTag::Boolean,
      TermData::Variable(_) => TermTag::Variable,
      TermData::Object(_) => TermTag::Object,
      TermData::Equal(_) => TermTag::Equal,
      TermData::Distinct(_) => TermTag::Distinct,
      TermData::Atom { .. } => TermTag::Atom,
      TermData::Exists { .. } => TermTag::Exists,
      TermData::Forall { .. } => TermTag::Forall,
      TermData::Negation(_) => TermTag::Negation,
      TermData::Conjunction(_) => TermTag::Conjunction,
      TermData::Disjunction(_) => TermTag::Disjunction,
      TermData::Implication { .. } => TermTag::Implication,
      TermData::Ite { .. } => TermTag::Ite,
      TermData::Lambda { .. } => TermTag::Lambda,
      TermData::Tomorrow(_) => TermTag::Tomorrow,
      TermData::WTomorrow(_) => TermTag::WTomorrow,
      TermData::Eventually(_) => TermTag::Eventually,
      TermData::Always(_) => TermTag::Always,
      TermData::Until { .. } => TermTag::Until,
      TermData::Release { .. } => TermTag::Release,
      TermData::Yesterday(_) => TermTag::Yesterday,
      TermData::WYesterday(_) => TermTag::WYesterday,
      TermData::Once(_) => TermTag::Once,
      TermData::Historically(_) => TermTag::Historically,
      TermData::Since { .. } => TermTag::Since,
      TermData::Triggered { .. } => TermTag::Triggered,
      TermData::Minus(_) => TermTag::Minus,
      TermData::Sum { .. } => TermTag::Sum,
      TermData::Product { .. } => TermTag::Product,
      TermData::Difference { .. } => TermTag::Difference,
      TermData::Division { .. } => TermTag::Division,
      TermData::LessThan { .. } => TermTag::LessThan,
      TermData::LessThanEq { .. } => TermTag::LessThanEq,
      TermData::GreaterThan { .. } => TermTag::GreaterThan,
      TermData::GreaterThanEq { .. } => TermTag::GreaterThanEq,
    }
  }

  /// The term children of this node, in field order.
  pub(crate) fn children(&self) -> SmallVec<[&Term; 4]> {
    use TermData::*;
    match self {
      Error { source, .. } => smallvec_from(&[source]),

      Integer(_) | Real(_) | Boolean(_) | Variable(_) | Object(_) => SmallVec::new(),

      Equal(args) | Distinct(args) | Conjunction(args) | Disjunction(args) => {
        args.iter().collect()
      }

      Atom { head, args } => {
        let mut children: SmallVec<[&Term; 4]> = smallvec_from(&[head]);
        children.extend(args.iter());
        children
      }

      Exists { body, .. } | Forall { body, .. } | Lambda { body, .. } => smallvec_from(&[body]),

      Negation(argument)
      | Tomorrow(argument)
      | WTomorrow(argument)
      | Eventually(argument)
      | Always(argument)
      | Yesterday(argument)
      | WYesterday(argument)
      | Once(argument)
      | Historically(argument)
      | Minus(argument) => smallvec_from(&[argument]),

      Implication { left, right }
      | Until { left, right }
      | Release { left, right }
      | Since { left, right }
      | Triggered { left, right }
      | Sum { left, right }
      | Product { left, right }
      | Difference { left, right }
      | Division { left, right }
      | LessThan { left, right }
      | LessThanEq { left, right }
      | GreaterThan { left, right }
      | GreaterThanEq { left, right } => smallvec_from(&[left, right]),

      Ite { guard, iftrue, iffalse } => smallvec_from(&[guard, iftrue, iffalse]),
    }
  }

  pub(crate) fn structural_hash(&self) -> HashType {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    self.hash(&mut hasher);
    hasher.finish()
  }

  /// The fragment of this node: its own tag plus everything its children may hold.
  pub(crate) fn fragment_closure(&self) -> Fragment {
    let mut tags = Fragment::from(self.tag());
    for child in self.children() {
      tags |= child.node.tags;
    }
    tags
  }
}

fn smallvec_from<'a>(items: &[&'a Term]) -> SmallVec<[&'a Term; 4]> {
  items.iter().copied().collect()
}

pub(crate) struct TermNode {
  pub(crate) data: TermData,
  #[allow(dead_code)] // Keyed by the pool; kept for diagnostics.
  pub(crate) hash: HashType,
  pub(crate) tags: Fragment,
  pub(crate) sigma: AlphabetCell,
}

// endregion

// region Term handle

/// A handle to a pooled term. Cheap to clone; compared and hashed by node identity.
pub struct Term {
  pub(crate) node: Rc<TermNode>,
}

/// A borrowed, fully unpacked view of a term, for exhaustive `match`ing. The field values seen
/// through a view are the same references the typed accessors return.
pub enum TermView<'a> {
  Error { source: &'a Term, message: &'a str },
  Integer(i64),
  Real(f64),
  Boolean(bool),
  Variable(&'a Label),
  Object(&'a ObjectRef),
  Equal(&'a [Term]),
  Distinct(&'a [Term]),
  Atom { head: &'a Term, args: &'a [Term] },
  Exists { binds: &'a [Decl], body: &'a Term },
  Forall { binds: &'a [Decl], body: &'a Term },
  Negation(&'a Term),
  Conjunction(&'a [Term]),
  Disjunction(&'a [Term]),
  Implication { left: &'a Term, right: &'a Term },
  Ite { guard: &'a Term, iftrue: &'a Term, iffalse: &'a Term },
  Lambda { vars: &'a [Decl], body: &'a Term },
  Tomorrow(&'a Term),
  WTomorrow(&'a Term),
  Eventually(&'a Term),
  Always(&'a Term),
  Until { left: &'a Term, right: &'a Term },
  Release { left: &'a Term, right: &'a Term },
  Yesterday(&'a Term),
  WYesterday(&'a Term),
  Once(&'a Term),
  Historically(&'a Term),
  Since { left: &'a Term, right: &'a Term },
  Triggered { left: &'a Term, right: &'a Term },
  Minus(&'a Term),
  Sum { left: &'a Term, right: &'a Term },
  Product { left: &'a Term, right: &'a Term },
  Difference { left: &'a Term, right: &'a Term },
  Division { left: &'a Term, right: &'a Term },
  LessThan { left: &'a Term, right: &'a Term },
  LessThanEq { left: &'a Term, right: &'a Term },
  GreaterThan { left: &'a Term, right: &'a Term },
  GreaterThanEq { left: &'a Term, right: &'a Term },
}

macro_rules! tag_predicates {
  ($($variant:ident),* $(,)?) => {
    paste::paste! { $(
      #[inline(always)]
      pub fn [<is_ $variant:snake>](&self) -> bool {
        self.tag() == TermTag::$variant
      }
    )* }
  };
}

impl Term {
  pub fn view(&self) -> TermView<'_> {
    use TermData as D;
    use TermView as V;
    match &self.node.data {
      D::Error { source, message } => V::Error { source, message },
      D::Integer(value) => V::Integer(*value),
      D::Real(value) => V::Real(value.into_inner()),
      D::Boolean(value) => V::Boolean(*value),
      D::Variable(name) => V::Variable(name),
      D::Object(entity) => V::Object(entity),
      D::Equal(args) => V::Equal(args),
      D::Distinct(args) => V::Distinct(args),
      D::Atom { head, args } => V::Atom { head, args },
      D::Exists { binds, body } => V::Exists { binds, body },
      D::Forall { binds, body } => V::Forall { binds, body },
      D::Negation(argument) => V::Negation(argument),
      D::Conjunction(args) => V::Conjunction(args),
      D::Disjunction(args) => V::Disjunction(args),
      D::Implication { left, right } => V::Implication { left, right },
      D::Ite { guard, iftrue, iffalse } => V::Ite { guard, iftrue, iffalse },
      D::Lambda { vars, body } => V::Lambda { vars, body },
      D::Tomorrow(argument) => V::Tomorrow(argument),
      D::WTomorrow(argument) => V::WTomorrow(argument),
      D::Eventually(argument) => V::Eventually(argument),
      D::Always(argument) => V::Always(argument),
      D::Until { left, right } => V::Until { left, right },
      D::Release { left, right } => V::Release { left, right },
      D::Yesterday(argument) => V::Yesterday(argument),
      D::WYesterday(argument) => V::WYesterday(argument),
      D::Once(argument) => V::Once(argument),
      D::Historically(argument) => V::Historically(argument),
      D::Since { left, right } => V::Since { left, right },
      D::Triggered { left, right } => V::Triggered { left, right },
      D::Minus(argument) => V::Minus(argument),
      D::Sum { left, right } => V::Sum { left, right },
      D::Product { left, right } => V::Product { left, right },
      D::Difference { left, right } => V::Difference { left, right },
      D::Division { left, right } => V::Division { left, right },
      D::LessThan { left, right } => V::LessThan { left, right },
      D::LessThanEq { left, right } => V::LessThanEq { left, right },
      D::GreaterThan { left, right } => V::GreaterThan { left, right },
      D::GreaterThanEq { left, right } => V::GreaterThanEq { left, right },
    }
  }

  /// The node address. Stable for the node's lifetime; the basis of equality and hashing.
  #[inline(always)]
  pub fn unique_id(&self) -> usize {
    Rc::as_ptr(&self.node) as usize
  }

  #[inline(always)]
  pub fn tag(&self) -> TermTag {
    self.node.data.tag()
  }

  /// The fragment this term inhabits: the set of variants reachable anywhere in the tree.
  #[inline(always)]
  pub fn fragment(&self) -> Fragment {
    self.node.tags
  }

  /// Does the whole tree stay inside `fragment`? O(1) thanks to the cached closure.
  #[inline(always)]
  pub fn in_fragment(&self, fragment: Fragment) -> bool {
    fragment.contains(self.node.tags)
  }

  /// Runtime-checked downcast into a fragment. `Some` iff the tree fits.
  pub fn cast(&self, fragment: Fragment) -> Option<Term> {
    if self.in_fragment(fragment) {
      Some(self.clone())
    } else {
      None
    }
  }

  /// The term children of this node, in field order.
  pub fn children(&self) -> SmallVec<[&Term; 4]> {
    self.node.data.children()
  }

  /// `true` iff any subterm is an `Error`.
  #[inline(always)]
  pub fn has_errors(&self) -> bool {
    self.node.tags.contains(TermTag::Error)
  }

  tag_predicates!(
    Error, Integer, Real, Boolean, Variable, Object, Equal, Distinct, Atom, Exists, Forall,
    Negation, Conjunction, Disjunction, Implication, Ite, Lambda, Tomorrow, WTomorrow,
    Eventually, Always, Until, Release, Yesterday, WYesterday, Once, Historically, Since,
    Triggered, Minus, Sum, Product, Difference, Division, LessThan, LessThanEq, GreaterThan,
    GreaterThanEq,
  );

  // region Typed accessors

  /// The argument of a unary operator (`Negation`, the unary temporal operators, `Minus`).
  pub fn argument(&self) -> Option<&Term> {
    use TermData::*;
    match &self.node.data {
      Negation(argument) | Tomorrow(argument) | WTomorrow(argument) | Eventually(argument)
      | Always(argument) | Yesterday(argument) | WYesterday(argument) | Once(argument)
      | Historically(argument) | Minus(argument) => Some(argument),
      _ => None,
    }
  }

  /// The left operand of a binary operator.
  pub fn left(&self) -> Option<&Term> {
    use TermData::*;
    match &self.node.data {
      Implication { left, .. } | Until { left, .. } | Release { left, .. }
      | Since { left, .. } | Triggered { left, .. } | Sum { left, .. } | Product { left, .. }
      | Difference { left, .. } | Division { left, .. } | LessThan { left, .. }
      | LessThanEq { left, .. } | GreaterThan { left, .. } | GreaterThanEq { left, .. } => {
        Some(left)
      }
      _ => None,
    }
  }

  /// The right operand of a binary operator.
  pub fn right(&self) -> Option<&Term> {
    use TermData::*;
    match &self.node.data {
      Implication { right, .. } | Until { right, .. } | Release { right, .. }
      | Since { right, .. } | Triggered { right, .. } | Sum { right, .. }
      | Product { right, .. } | Difference { right, .. } | Division { right, .. }
      | LessThan { right, .. } | LessThanEq { right, .. } | GreaterThan { right, .. }
      | GreaterThanEq { right, .. } => Some(right),
      _ => None,
    }
  }

  /// The argument vector of an n-ary variant, or of an `Atom`.
  pub fn args(&self) -> Option<&[Term]> {
    use TermData::*;
    match &self.node.data {
      Equal(args) | Distinct(args) | Conjunction(args) | Disjunction(args) => Some(args),
      Atom { args, .. } => Some(args),
      _ => None,
    }
  }

  /// The applied term of an `Atom`.
  pub fn head(&self) -> Option<&Term> {
    match &self.node.data {
      TermData::Atom { head, .. } => Some(head),
      _ => None,
    }
  }

  /// The bound declarations of an `Exists`/`Forall`/`Lambda`.
  pub fn binds(&self) -> Option<&[Decl]> {
    use TermData::*;
    match &self.node.data {
      Exists { binds, .. } | Forall { binds, .. } => Some(binds),
      Lambda { vars, .. } => Some(vars),
      _ => None,
    }
  }

  /// The body of an `Exists`/`Forall`/`Lambda`.
  pub fn body(&self) -> Option<&Term> {
    use TermData::*;
    match &self.node.data {
      Exists { body, .. } | Forall { body, .. } | Lambda { body, .. } => Some(body),
      _ => None,
    }
  }

  pub fn guard(&self) -> Option<&Term> {
    match &self.node.data {
      TermData::Ite { guard, .. } => Some(guard),
      _ => None,
    }
  }

  pub fn as_variable(&self) -> Option<&Label> {
    match &self.node.data {
      TermData::Variable(name) => Some(name),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&ObjectRef> {
    match &self.node.data {
      TermData::Object(entity) => Some(entity),
      _ => None,
    }
  }

  pub fn as_boolean(&self) -> Option<bool> {
    match &self.node.data {
      TermData::Boolean(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_integer(&self) -> Option<i64> {
    match &self.node.data {
      TermData::Integer(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_real(&self) -> Option<f64> {
    match &self.node.data {
      TermData::Real(value) => Some(value.into_inner()),
      _ => None,
    }
  }

  pub fn error_message(&self) -> Option<&str> {
    match &self.node.data {
      TermData::Error { message, .. } => Some(message),
      _ => None,
    }
  }

  // endregion

  /// Iterates the operands of an associative connective, flattening nested applications of the
  /// same connective: for `b ∧ ((p ∧ (b ∧ p)) ∧ b)` the sequence is `b, p, b, p, b`. On any
  /// other variant the iterator yields the immediate children.
  pub fn operands(&self) -> Operands {
    Operands::new(self)
  }
}

impl Clone for Term {
  fn clone(&self) -> Self {
    Term { node: Rc::clone(&self.node) }
  }
}

impl PartialEq for Term {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.node, &other.node)
  }
}

impl Eq for Term {}

impl Hash for Term {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_usize(self.unique_id());
  }
}

// endregion

// region Operands iterator

const ASSOCIATIVE: Fragment =
  enumflags2::make_bitflags!(TermTag::{Equal | Distinct | Conjunction | Disjunction});

pub struct Operands {
  tag: Option<TermTag>,
  stack: Vec<Term>,
}

impl Operands {
  fn new(term: &Term) -> Operands {
    if ASSOCIATIVE.contains(term.tag()) {
      Operands { tag: Some(term.tag()), stack: vec![term.clone()] }
    } else {
      let mut stack: Vec<Term> = term.children().into_iter().cloned().collect();
      stack.reverse();
      Operands { tag: None, stack }
    }
  }
}

impl Iterator for Operands {
  type Item = Term;

  fn next(&mut self) -> Option<Term> {
    while let Some(term) = self.stack.pop() {
      if self.tag == Some(term.tag()) {
        if let Some(args) = term.args() {
          for arg in args.iter().rev() {
            self.stack.push(arg.clone());
          }
          continue;
        }
      }
      return Some(term);
    }
    None
  }
}

// endregion

// region Constructors

/// A constant boolean value.
pub fn boolean(value: bool) -> Term {
  Alphabet::make_term(sigma(), TermData::Boolean(value))
}

/// A constant integer value.
pub fn integer(value: i64) -> Term {
  Alphabet::make_term(sigma(), TermData::Integer(value))
}

/// A constant real value.
pub fn real(value: f64) -> Term {
  Alphabet::make_term(sigma(), TermData::Real(OrderedFloat(value)))
}

/// An unresolved variable.
pub fn variable(name: impl Into<Label>) -> Term {
  Alphabet::make_term(sigma(), TermData::Variable(name.into()))
}

/// A boolean-intended variable. There is no separate proposition variant in the term sum, so
/// this is [`variable`] under a name that reads well at use sites.
pub fn proposition(name: impl Into<Label>) -> Term {
  variable(name)
}

/// A resolved object referring to `entity`.
pub fn object(entity: &Rc<Entity>) -> Term {
  Alphabet::make_term(sigma(), TermData::Object(ObjectRef(Rc::downgrade(entity))))
}

/// A logically erroneous term. Errors are values: they propagate through constructors and are
/// reported by [`type_of`](crate::api::semantics::type_of) and the encoder, never thrown.
pub fn error_term(source: Term, message: impl Into<String>) -> Term {
  let cell = source.node.sigma.clone();
  Alphabet::make_term(cell, TermData::Error { source, message: message.into() })
}

macro_rules! unary_constructor {
  ($(#[$doc:meta])* $name:ident, $variant:ident) => {
    $(#[$doc])*
    pub fn $name(argument: Term) -> Term {
      let cell = argument.node.sigma.clone();
      Alphabet::make_term(cell, TermData::$variant(argument))
    }
  };
}

macro_rules! binary_constructor {
  ($(#[$doc:meta])* $name:ident, $variant:ident) => {
    $(#[$doc])*
    pub fn $name(left: Term, right: Term) -> Term {
      let cell = left.node.sigma.clone();
      Alphabet::make_term(cell, TermData::$variant { left, right })
    }
  };
}

macro_rules! nary_constructor {
  ($(#[$doc:meta])* $name:ident, $variant:ident) => {
    $(#[$doc])*
    pub fn $name(arguments: Vec<Term>) -> Term {
      assert!(
        arguments.len() >= 2,
        concat!(stringify!($name), " requires at least two operands")
      );
      let cell = arguments[0].node.sigma.clone();
      Alphabet::make_term(cell, TermData::$variant(arguments.into_iter().collect()))
    }
  };
}

nary_constructor!(
  /// An equality constraint between two or more terms.
  equal, Equal
);
nary_constructor!(
  /// A pairwise-distinctness constraint between two or more terms.
  distinct, Distinct
);
nary_constructor!(
  /// A logical conjunction of two or more terms.
  conjunction, Conjunction
);
nary_constructor!(
  /// A logical disjunction of two or more terms.
  disjunction, Disjunction
);

/// An atomic first-order term, `head(args…)`.
pub fn atom(head: Term, args: Vec<Term>) -> Term {
  let cell = head.node.sigma.clone();
  Alphabet::make_term(cell, TermData::Atom { head, args: args.into_iter().collect() })
}

/// An existentially quantified term.
pub fn exists(binds: Vec<Decl>, body: Term) -> Term {
  let cell = body.node.sigma.clone();
  Alphabet::make_term(cell, TermData::Exists { binds, body })
}

/// A universally quantified term.
pub fn forall(binds: Vec<Decl>, body: Term) -> Term {
  let cell = body.node.sigma.clone();
  Alphabet::make_term(cell, TermData::Forall { binds, body })
}

unary_constructor!(
  /// A logical negation.
  negation, Negation
);
binary_constructor!(
  /// A logical implication.
  implication, Implication
);

/// An if/then/else selection construct.
pub fn ite(guard: Term, iftrue: Term, iffalse: Term) -> Term {
  let cell = guard.node.sigma.clone();
  Alphabet::make_term(cell, TermData::Ite { guard, iftrue, iffalse })
}

/// A lambda abstraction.
pub fn lambda(vars: Vec<Decl>, body: Term) -> Term {
  let cell = body.node.sigma.clone();
  Alphabet::make_term(cell, TermData::Lambda { vars, body })
}

unary_constructor!(
  /// The *tomorrow* LTL operator.
  tomorrow, Tomorrow
);
unary_constructor!(
  /// The *weak tomorrow* LTL operator.
  w_tomorrow, WTomorrow
);
unary_constructor!(
  /// The *eventually* LTL operator.
  eventually, Eventually
);
unary_constructor!(
  /// The *always* LTL operator.
  always, Always
);
binary_constructor!(
  /// The *until* LTL operator.
  until, Until
);
binary_constructor!(
  /// The *release* LTL operator.
  release, Release
);

unary_constructor!(
  /// The *yesterday* past LTL operator.
  yesterday, Yesterday
);
unary_constructor!(
  /// The *weak yesterday* past LTL operator.
  w_yesterday, WYesterday
);
unary_constructor!(
  /// The *once* past LTL operator.
  once, Once
);
unary_constructor!(
  /// The *historically* past LTL operator.
  historically, Historically
);
binary_constructor!(
  /// The *since* past LTL operator.
  since, Since
);
binary_constructor!(
  /// The *triggered* past LTL operator.
  triggered, Triggered
);

unary_constructor!(
  /// The unary arithmetic minus.
  minus, Minus
);
binary_constructor!(
  /// An arithmetic sum.
  sum, Sum
);
binary_constructor!(
  /// An arithmetic product.
  product, Product
);
binary_constructor!(
  /// An arithmetic difference.
  difference, Difference
);
binary_constructor!(
  /// An arithmetic division.
  division, Division
);
binary_constructor!(
  /// A less-than comparison.
  less_than, LessThan
);
binary_constructor!(
  /// A less-than-or-equal comparison.
  less_than_eq, LessThanEq
);
binary_constructor!(
  /// A greater-than comparison.
  greater_than, GreaterThan
);
binary_constructor!(
  /// A greater-than-or-equal comparison.
  greater_than_eq, GreaterThanEq
);

/// Rebuilds `t` with every term child replaced by `f(child)`, preserving the variant and the
/// non-term fields. Leaves and `Error` terms come back unchanged. Binder variants keep their
/// declarations and map only the body; callers that care about scoping intercept those variants
/// before falling back to this.
pub(crate) fn map_children<F: FnMut(&Term) -> Term>(t: &Term, f: &mut F) -> Term {
  use TermView as V;

  match t.view() {
    V::Error { .. }
    | V::Integer(_)
    | V::Real(_)
    | V::Boolean(_)
    | V::Variable(_)
    | V::Object(_) => t.clone(),

    V::Equal(args) => equal(args.iter().map(|a| f(a)).collect()),
    V::Distinct(args) => distinct(args.iter().map(|a| f(a)).collect()),
    V::Conjunction(args) => conjunction(args.iter().map(|a| f(a)).collect()),
    V::Disjunction(args) => disjunction(args.iter().map(|a| f(a)).collect()),

    V::Atom { head, args } => {
      let head = f(head);
      atom(head, args.iter().map(|a| f(a)).collect())
    }

    V::Exists { binds, body } => exists(binds.to_vec(), f(body)),
    V::Forall { binds, body } => forall(binds.to_vec(), f(body)),
    V::Lambda { vars, body } => lambda(vars.to_vec(), f(body)),

    V::Negation(a) => negation(f(a)),
    V::Implication { left, right } => {
      let (l, r) = (f(left), f(right));
      implication(l, r)
    }

    V::Ite { guard, iftrue, iffalse } => {
      let (g, a, b) = (f(guard), f(iftrue), f(iffalse));
      ite(g, a, b)
    }

    V::Tomorrow(a) => tomorrow(f(a)),
    V::WTomorrow(a) => w_tomorrow(f(a)),
    V::Eventually(a) => eventually(f(a)),
    V::Always(a) => always(f(a)),
    V::Until { left, right } => {
      let (l, r) = (f(left), f(right));
      until(l, r)
    }
    V::Release { left, right } => {
      let (l, r) = (f(left), f(right));
      release(l, r)
    }

    V::Yesterday(a) => yesterday(f(a)),
    V::WYesterday(a) => w_yesterday(f(a)),
    V::Once(a) => once(f(a)),
    V::Historically(a) => historically(f(a)),
    V::Since { left, right } => {
      let (l, r) = (f(left), f(right));
      since(l, r)
    }
    V::Triggered { left, right } => {
      let (l, r) = (f(left), f(right));
      triggered(l, r)
    }

    V::Minus(a) => minus(f(a)),
    V::Sum { left, right } => {
      let (l, r) = (f(left), f(right));
      sum(l, r)
    }
    V::Product { left, right } => {
      let (l, r) = (f(left), f(right));
      product(l, r)
    }
    V::Difference { left, right } => {
      let (l, r) = (f(left), f(right));
      difference(l, r)
    }
    V::Division { left, right } => {
      let (l, r) = (f(left), f(right));
      division(l, r)
    }
    V::LessThan { left, right } => {
      let (l, r) = (f(left), f(right));
      less_than(l, r)
    }
    V::LessThanEq { left, right } => {
      let (l, r) = (f(left), f(right));
      less_than_eq(l, r)
    }
    V::GreaterThan { left, right } => {
      let (l, r) = (f(left), f(right));
      greater_than(l, r)
    }
    V::GreaterThanEq { left, right } => {
      let (l, r) = (f(left), f(right));
      greater_than_eq(l, r)
    }
  }
}

// endregion

// region Operator sugar

impl std::ops::BitAnd for Term {
  type Output = Term;

  fn bitand(self, rhs: Term) -> Term {
    conjunction(vec![self, rhs])
  }
}

impl std::ops::BitOr for Term {
  type Output = Term;

  fn bitor(self, rhs: Term) -> Term {
    disjunction(vec![self, rhs])
  }
}

impl std::ops::Not for Term {
  type Output = Term;

  fn not(self) -> Term {
    negation(self)
  }
}

impl std::ops::Add for Term {
  type Output = Term;

  fn add(self, rhs: Term) -> Term {
    sum(self, rhs)
  }
}

impl std::ops::Sub for Term {
  type Output = Term;

  fn sub(self, rhs: Term) -> Term {
    difference(self, rhs)
  }
}

impl std::ops::Mul for Term {
  type Output = Term;

  fn mul(self, rhs: Term) -> Term {
    product(self, rhs)
  }
}

impl std::ops::Div for Term {
  type Output = Term;

  fn div(self, rhs: Term) -> Term {
    division(self, rhs)
  }
}

impl std::ops::Neg for Term {
  type Output = Term;

  fn neg(self) -> Term {
    minus(self)
  }
}

// endregion

// region Formatting

fn repr_infix(
  out: &mut dyn std::fmt::Write,
  args: &[&Term],
  op: &str,
  style: FormatStyle,
) -> std::fmt::Result {
  write!(out, "(")?;
  for (i, arg) in args.iter().enumerate() {
    if i > 0 {
      write!(out, " {} ", op)?;
    }
    arg.repr(out, style)?;
  }
  write!(out, ")")
}

fn repr_prefix(
  out: &mut dyn std::fmt::Write,
  op: &str,
  argument: &Term,
  style: FormatStyle,
) -> std::fmt::Result {
  write!(out, "{}(", op)?;
  argument.repr(out, style)?;
  write!(out, ")")
}

fn repr_binder(
  out: &mut dyn std::fmt::Write,
  keyword: &str,
  binds: &[Decl],
  body: &Term,
  style: FormatStyle,
) -> std::fmt::Result {
  let decls = join_string(binds.iter().map(|d| format!("{}: {}", d.name, d.ty)), ", ");
  write!(out, "{} {} . ", keyword, decls)?;
  body.repr(out, style)
}

impl Formattable for Term {
  fn repr(&self, out: &mut dyn std::fmt::Write, style: FormatStyle) -> std::fmt::Result {
    use TermView as V;
    match self.view() {
      V::Error { message, .. } => write!(out, "⟨error: {}⟩", message),
      V::Integer(value) => write!(out, "{}", value),
      V::Real(value) => write!(out, "{}", value),
      V::Boolean(value) => write!(out, "{}", value),
      V::Variable(name) => name.repr(out, style),

      V::Object(entity) => match entity.entity() {
        Some(e) => e.name.repr(out, style),
        None => write!(out, "⟨dangling object⟩"),
      },

      V::Equal(args) => repr_infix(out, &args.iter().collect::<Vec<_>>(), "=", style),
      V::Distinct(args) => {
        write!(out, "distinct(")?;
        write!(out, "{}", join_string(args.iter(), ", "))?;
        write!(out, ")")
      }

      V::Atom { head, args } => {
        head.repr(out, style)?;
        write!(out, "({})", join_string(args.iter(), ", "))
      }

      V::Exists { binds, body } => repr_binder(out, "∃", binds, body, style),
      V::Forall { binds, body } => repr_binder(out, "∀", binds, body, style),

      V::Negation(argument) => {
        write!(out, "¬")?;
        argument.repr(out, style)
      }
      V::Conjunction(args) => repr_infix(out, &args.iter().collect::<Vec<_>>(), "∧", style),
      V::Disjunction(args) => repr_infix(out, &args.iter().collect::<Vec<_>>(), "∨", style),
      V::Implication { left, right } => repr_infix(out, &[left, right], "→", style),

      V::Ite { guard, iftrue, iffalse } => {
        write!(out, "ite({}, {}, {})", guard, iftrue, iffalse)
      }
      V::Lambda { vars, body } => repr_binder(out, "λ", vars, body, style),

      V::Tomorrow(argument) => repr_prefix(out, "X", argument, style),
      V::WTomorrow(argument) => repr_prefix(out, "wX", argument, style),
      V::Eventually(argument) => repr_prefix(out, "F", argument, style),
      V::Always(argument) => repr_prefix(out, "G", argument, style),
      V::Until { left, right } => repr_infix(out, &[left, right], "U", style),
      V::Release { left, right } => repr_infix(out, &[left, right], "R", style),

      V::Yesterday(argument) => repr_prefix(out, "Y", argument, style),
      V::WYesterday(argument) => repr_prefix(out, "Z", argument, style),
      V::Once(argument) => repr_prefix(out, "O", argument, style),
      V::Historically(argument) => repr_prefix(out, "H", argument, style),
      V::Since { left, right } => repr_infix(out, &[left, right], "S", style),
      V::Triggered { left, right } => repr_infix(out, &[left, right], "T", style),

      V::Minus(argument) => {
        write!(out, "-")?;
        argument.repr(out, style)
      }
      V::Sum { left, right } => repr_infix(out, &[left, right], "+", style),
      V::Product { left, right } => repr_infix(out, &[left, right], "*", style),
      V::Difference { left, right } => repr_infix(out, &[left, right], "-", style),
      V::Division { left, right } => repr_infix(out, &[left, right], "/", style),
      V::LessThan { left, right } => repr_infix(out, &[left, right], "<", style),
      V::LessThanEq { left, right } => repr_infix(out, &[left, right], "<=", style),
      V::GreaterThan { left, right } => repr_infix(out, &[left, right], ">", style),
      V::GreaterThanEq { left, right } => repr_infix(out, &[left, right], ">=", style),
    }
  }
}

impl_display_debug_for_formattable!(Term);

// endregion
