/*!

Structural semantics of terms: `type_of` and `free_vars`.

Both are pure functions over the tree. Typing never throws: an ill-typed term gets the `Error`
type, carrying the offending term and a message, and error types propagate outward through
enclosing constructors. Unresolved variables type as `Inferred`, which behaves as a wildcard;
typing is not the place where resolution misses are reported.

*/

use telos_abs::PSet;

use crate::api::{
  label::Label,
  term::{Term, TermView},
  types::{boolean_type, error_type, function_type, inferred_type, integer_type, real_type, Type},
};

/// The type of `t`. Ill-typed terms get an `Error` type; unresolved variables type as
/// `Inferred`.
pub fn type_of(t: &Term) -> Type {
  use TermView as V;

  match t.view() {
    V::Error { message, .. } => error_type(t.clone(), message.to_string()),

    V::Integer(_) => integer_type(),
    V::Real(_) => real_type(),
    V::Boolean(_) => boolean_type(),

    V::Variable(_) => inferred_type(),

    V::Object(entity) => match entity.entity() {
      Some(e) => e.ty(),
      None => error_type(t.clone(), "dangling object: its owning root has been dropped"),
    },

    V::Equal(args) | V::Distinct(args) => {
      let mut common: Option<Type> = None;
      for arg in args {
        let ty = type_of(arg);
        if ty.is_error() {
          return ty;
        }
        if ty.is_inferred() {
          continue;
        }
        match &common {
          Some(seen) if *seen != ty => {
            return error_type(t.clone(), "operands of an equality must have equal types");
          }
          None => common = Some(ty),
          _ => {}
        }
      }
      boolean_type()
    }

    V::Atom { head, args } => {
      let head_ty = type_of(head);
      if head_ty.is_error() {
        return head_ty;
      }
      if head_ty.is_inferred() {
        return inferred_type();
      }
      let Some((parameters, range)) = head_ty.as_function() else {
        return error_type(t.clone(), "head of an atom must have a function type");
      };
      if parameters.len() != args.len() {
        return error_type(
          t.clone(),
          format!("atom expects {} arguments, {} given", parameters.len(), args.len()),
        );
      }
      for (arg, expected) in args.iter().zip(parameters) {
        let ty = type_of(arg);
        if ty.is_error() {
          return ty;
        }
        if !ty.is_inferred() && !expected.is_inferred() && ty != *expected {
          return error_type(t.clone(), "atom argument has the wrong type");
        }
      }
      range.clone()
    }

    V::Exists { body, .. } | V::Forall { body, .. } => match boolean_operands(t, &[body]) {
      Ok(ty) => ty,
      Err(err) => err,
    },

    V::Negation(argument) => match boolean_operands(t, &[argument]) {
      Ok(ty) => ty,
      Err(err) => err,
    },

    V::Conjunction(args) | V::Disjunction(args) => {
      let operands: Vec<&Term> = args.iter().collect();
      match boolean_operands(t, &operands) {
        Ok(ty) => ty,
        Err(err) => err,
      }
    }

    V::Implication { left, right } => match boolean_operands(t, &[left, right]) {
      Ok(ty) => ty,
      Err(err) => err,
    },

    V::Ite { guard, iftrue, iffalse } => {
      if let Err(err) = boolean_operands(t, &[guard]) {
        return err;
      }
      let then_ty = type_of(iftrue);
      let else_ty = type_of(iffalse);
      if then_ty.is_error() {
        return then_ty;
      }
      if else_ty.is_error() {
        return else_ty;
      }
      join(t, then_ty, else_ty)
    }

    V::Lambda { vars, body } => {
      let body_ty = type_of(body);
      if body_ty.is_error() {
        return body_ty;
      }
      function_type(vars.iter().map(|d| d.ty.clone()).collect(), body_ty)
    }

    // The temporal operators are boolean connectives over time.
    V::Tomorrow(argument)
    | V::WTomorrow(argument)
    | V::Eventually(argument)
    | V::Always(argument)
    | V::Yesterday(argument)
    | V::WYesterday(argument)
    | V::Once(argument)
    | V::Historically(argument) => match boolean_operands(t, &[argument]) {
      Ok(ty) => ty,
      Err(err) => err,
    },

    V::Until { left, right }
    | V::Release { left, right }
    | V::Since { left, right }
    | V::Triggered { left, right } => match boolean_operands(t, &[left, right]) {
      Ok(ty) => ty,
      Err(err) => err,
    },

    V::Minus(argument) => {
      let ty = type_of(argument);
      if ty.is_error() || ty.is_arithmetic() || ty.is_inferred() {
        ty
      } else {
        error_type(t.clone(), "arithmetic operator applied to a non-arithmetic term")
      }
    }

    V::Sum { left, right } | V::Product { left, right } | V::Difference { left, right } => {
      promote(t, left, right)
    }

    // Division is real-valued regardless of the operand types.
    V::Division { left, right } => match arithmetic_operands(t, left, right) {
      Ok(()) => real_type(),
      Err(err) => err,
    },

    V::LessThan { left, right }
    | V::LessThanEq { left, right }
    | V::GreaterThan { left, right }
    | V::GreaterThanEq { left, right } => match arithmetic_operands(t, left, right) {
      Ok(()) => boolean_type(),
      Err(err) => err,
    },
  }
}

/// Checks that every operand types as boolean (or `Inferred`); the result is `Boolean`.
fn boolean_operands(whole: &Term, operands: &[&Term]) -> Result<Type, Type> {
  for operand in operands {
    let ty = type_of(operand);
    if ty.is_error() {
      return Err(ty);
    }
    if !ty.is_boolean() && !ty.is_inferred() {
      return Err(error_type(
        whole.clone(),
        "boolean connective applied to a non-boolean term",
      ));
    }
  }
  Ok(boolean_type())
}

fn arithmetic_operands(whole: &Term, left: &Term, right: &Term) -> Result<(), Type> {
  for operand in [left, right] {
    let ty = type_of(operand);
    if ty.is_error() {
      return Err(ty);
    }
    if !ty.is_arithmetic() && !ty.is_inferred() {
      return Err(error_type(
        whole.clone(),
        "arithmetic operator applied to a non-arithmetic term",
      ));
    }
  }
  Ok(())
}

/// `Int` op `Int` is `Int`; mixing `Int` and `Real` promotes to `Real`.
fn promote(whole: &Term, left: &Term, right: &Term) -> Type {
  if let Err(err) = arithmetic_operands(whole, left, right) {
    return err;
  }
  let left_ty = type_of(left);
  let right_ty = type_of(right);
  if left_ty.is_inferred() {
    return right_ty;
  }
  if right_ty.is_inferred() || left_ty == right_ty {
    return left_ty;
  }
  real_type()
}

/// The common supertype of two branch types.
fn join(whole: &Term, a: Type, b: Type) -> Type {
  if a == b || b.is_inferred() {
    return a;
  }
  if a.is_inferred() {
    return b;
  }
  if a.is_arithmetic() && b.is_arithmetic() {
    return real_type();
  }
  error_type(whole.clone(), "branches of an ite must have compatible types")
}

/// The free variables of `t`: deduplicated, in order of first sight. Variables bound by an
/// enclosing `Exists`/`Forall`/`Lambda` are not free in its body.
pub fn free_vars(t: &Term) -> Vec<Label> {
  let mut found = Vec::new();
  collect_free_vars(t, &PSet::new(), &mut found);
  found
}

fn collect_free_vars(t: &Term, bound: &PSet<Label>, found: &mut Vec<Label>) {
  match t.view() {
    TermView::Variable(name) => {
      if !bound.contains(name) && !found.contains(name) {
        found.push(name.clone());
      }
    }

    TermView::Exists { binds, body } | TermView::Forall { binds, body } => {
      let nested = bound.extended(binds.iter().map(|d| d.name.clone()));
      collect_free_vars(body, &nested, found);
    }

    TermView::Lambda { vars, body } => {
      let nested = bound.extended(vars.iter().map(|d| d.name.clone()));
      collect_free_vars(body, &nested, found);
    }

    _ => {
      for child in t.children() {
        collect_free_vars(child, bound, found);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::term::*;
  use crate::core::module::entity::Decl;

  #[test]
  fn constants_and_connectives() {
    assert_eq!(type_of(&integer(3)), integer_type());
    assert_eq!(type_of(&real(0.5)), real_type());
    assert_eq!(type_of(&boolean(true)), boolean_type());
    assert_eq!(type_of(&conjunction(vec![boolean(true), proposition("p")])), boolean_type());
  }

  #[test]
  fn arithmetic_promotion() {
    assert_eq!(type_of(&sum(integer(1), integer(2))), integer_type());
    assert_eq!(type_of(&sum(integer(1), real(2.0))), real_type());
    assert_eq!(type_of(&division(integer(1), integer(2))), real_type());
    assert_eq!(type_of(&less_than(integer(1), real(2.0))), boolean_type());
  }

  #[test]
  fn ill_typed_terms_get_error_types() {
    let bad = sum(boolean(true), integer(1));
    assert!(type_of(&bad).is_error());

    // Errors propagate through enclosing constructors.
    let nested = conjunction(vec![equal(vec![bad, integer(1)]), boolean(true)]);
    assert!(type_of(&nested).is_error());
  }

  #[test]
  fn lambda_types_as_function() {
    let body = sum(variable("x"), integer(1));
    let l = lambda(vec![Decl::new("x", integer_type())], body);
    let ty = type_of(&l);
    let (params, range) = ty.as_function().unwrap();
    assert_eq!(params, &[integer_type()]);
    assert_eq!(*range, integer_type());
  }

  #[test]
  fn free_vars_respect_binders_and_order() {
    // (y > z) ∧ ∃ y . (y > z)
    let open = greater_than(variable("y"), variable("z"));
    let closed = exists(vec![Decl::new("y", integer_type())], open.clone());
    let t = conjunction(vec![open, closed]);

    assert_eq!(free_vars(&t), vec![Label::from("y"), Label::from("z")]);

    let fully_bound = exists(
      vec![Decl::new("y", integer_type()), Decl::new("z", integer_type())],
      greater_than(variable("y"), variable("z")),
    );
    assert!(free_vars(&fully_bound).is_empty());
  }

  #[test]
  fn free_vars_are_deduplicated_in_first_sight_order() {
    let t = conjunction(vec![
      equal(vec![variable("b"), variable("a")]),
      equal(vec![variable("a"), variable("c")]),
    ]);
    assert_eq!(free_vars(&t), vec![Label::from("b"), Label::from("a"), Label::from("c")]);
  }
}
