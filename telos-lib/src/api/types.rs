/*!

The type layer of the AST: a hash-consed handle over the sum of `Integer`, `Real`, `Boolean`,
`Function`, the `Inferred` placeholder filled in by type inference, and the `Error` type that
ill-typed terms propagate.

Handles have value-based identity: structurally equal types share one allocation, so `==` is a
pointer comparison and hashing is cheap. See the [`alphabet`](crate::core::alphabet) module for
the pooling machinery.

*/

use std::{
  hash::{Hash, Hasher},
  rc::Rc,
};

use telos_abs::{join_string, SmallVec};

use crate::{
  api::term::Term,
  core::{
    alphabet::{sigma, Alphabet, AlphabetCell},
    format::{FormatStyle, Formattable},
  },
  impl_display_debug_for_formattable,
  HashType,
};

#[derive(PartialEq, Hash)]
pub(crate) enum TypeData {
  Integer,
  Real,
  Boolean,
  Function {
    parameters: SmallVec<[Type; 2]>,
    range: Type,
  },
  Inferred,
  Error {
    source: Term,
    message: String,
  },
}

impl TypeData {
  pub(crate) fn structural_hash(&self) -> HashType {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    self.hash(&mut hasher);
    hasher.finish()
  }
}

pub(crate) struct TypeNode {
  pub(crate) data: TypeData,
  #[allow(dead_code)] // Keyed by the pool; kept for diagnostics.
  pub(crate) hash: HashType,
  pub(crate) sigma: AlphabetCell,
}

/// A handle to a pooled type. Cheap to clone; compared and hashed by node identity.
pub struct Type {
  pub(crate) node: Rc<TypeNode>,
}

/// A borrowed, fully unpacked view of a type, for exhaustive `match`ing.
pub enum TypeView<'a> {
  Integer,
  Real,
  Boolean,
  Function { parameters: &'a [Type], range: &'a Type },
  Inferred,
  Error { source: &'a Term, message: &'a str },
}

impl Type {
  pub fn view(&self) -> TypeView<'_> {
    match &self.node.data {
      TypeData::Integer => TypeView::Integer,
      TypeData::Real => TypeView::Real,
      TypeData::Boolean => TypeView::Boolean,
      TypeData::Function { parameters, range } => TypeView::Function { parameters, range },
      TypeData::Inferred => TypeView::Inferred,
      TypeData::Error { source, message } => TypeView::Error { source, message },
    }
  }

  /// The node address. Stable for the node's lifetime; the basis of equality and hashing.
  #[inline(always)]
  pub fn unique_id(&self) -> usize {
    Rc::as_ptr(&self.node) as usize
  }

  #[inline(always)]
  pub fn is_boolean(&self) -> bool {
    matches!(self.node.data, TypeData::Boolean)
  }

  #[inline(always)]
  pub fn is_arithmetic(&self) -> bool {
    matches!(self.node.data, TypeData::Integer | TypeData::Real)
  }

  #[inline(always)]
  pub fn is_inferred(&self) -> bool {
    matches!(self.node.data, TypeData::Inferred)
  }

  #[inline(always)]
  pub fn is_error(&self) -> bool {
    matches!(self.node.data, TypeData::Error { .. })
  }

  pub fn as_function(&self) -> Option<(&[Type], &Type)> {
    match &self.node.data {
      TypeData::Function { parameters, range } => Some((parameters, range)),
      _ => None,
    }
  }
}

impl Clone for Type {
  fn clone(&self) -> Self {
    Type { node: Rc::clone(&self.node) }
  }
}

impl PartialEq for Type {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.node, &other.node)
  }
}

impl Eq for Type {}

impl Hash for Type {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_usize(self.unique_id());
  }
}

// region Constructors

/// The type of integer numbers.
pub fn integer_type() -> Type {
  Alphabet::make_type(sigma(), TypeData::Integer)
}

/// The type of real numbers.
pub fn real_type() -> Type {
  Alphabet::make_type(sigma(), TypeData::Real)
}

/// The type of boolean values.
pub fn boolean_type() -> Type {
  Alphabet::make_type(sigma(), TypeData::Boolean)
}

/// The placeholder for types filled in by type inference.
pub fn inferred_type() -> Type {
  Alphabet::make_type(sigma(), TypeData::Inferred)
}

/// The type of functions from `parameters` to `range`.
pub fn function_type(parameters: Vec<Type>, range: Type) -> Type {
  let cell = range.node.sigma.clone();
  Alphabet::make_type(
    cell,
    TypeData::Function { parameters: parameters.into_iter().collect(), range },
  )
}

/// The type of a logically erroneous term.
pub fn error_type(source: Term, message: impl Into<String>) -> Type {
  Alphabet::make_type(sigma(), TypeData::Error { source, message: message.into() })
}

// endregion

impl Formattable for Type {
  fn repr(&self, out: &mut dyn std::fmt::Write, _style: FormatStyle) -> std::fmt::Result {
    match self.view() {
      TypeView::Integer => write!(out, "Int"),
      TypeView::Real => write!(out, "Real"),
      TypeView::Boolean => write!(out, "Bool"),
      TypeView::Function { parameters, range } => {
        write!(out, "({}) -> {}", join_string(parameters.iter(), ", "), range)
      }
      TypeView::Inferred => write!(out, "?"),
      TypeView::Error { message, .. } => write!(out, "⟨type error: {}⟩", message),
    }
  }
}

impl_display_debug_for_formattable!(Type);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn view_matches_accessors() {
    let f = function_type(vec![integer_type()], boolean_type());
    let (params, range) = f.as_function().unwrap();
    match f.view() {
      TypeView::Function { parameters, range: r } => {
        assert_eq!(parameters, params);
        assert_eq!(r, range);
      }
      _ => panic!("function type viewed as something else"),
    }
  }

  #[test]
  fn predicates() {
    assert!(integer_type().is_arithmetic());
    assert!(real_type().is_arithmetic());
    assert!(!boolean_type().is_arithmetic());
    assert!(boolean_type().is_boolean());
    assert!(inferred_type().is_inferred());
  }

  #[test]
  fn display() {
    let f = function_type(vec![integer_type(), real_type()], boolean_type());
    assert_eq!(f.to_string(), "(Int, Real) -> Bool");
  }
}
