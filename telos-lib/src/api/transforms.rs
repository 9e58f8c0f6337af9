/*!

Structural term transforms: negation normal form and the future-to-past rotation.

`to_nnf` eliminates implications and pushes negations down to the literals, dualizing the
temporal operators on the way (`F`/`G`, `U`/`R`, `X`/`wX`, `O`/`H`, `S`/`T`, `Y`/`Z`). The
automaton encoder runs it as the first half of its stepped-normal-form pass, but it is useful on
its own.

`future_to_past` mirrors a pure-future formula into the corresponding pure-past one. Meeting a
past operator on the way is a misuse: the transform produces an `Error` term carrying the
offending subterm and propagates it outward, as all domain errors here are values rather than
exceptions.

*/

use crate::api::term::*;

/// Negation normal form: no implications, negations only on literals.
pub fn to_nnf(t: &Term) -> Term {
  use TermView as V;

  match t.view() {
    // A negation is pushed inside its argument.
    V::Negation(argument) => push_negation(argument),

    // Implication is eliminated: `l → r` becomes `¬l ∨ r`.
    V::Implication { left, right } => disjunction(vec![push_negation(left), to_nnf(right)]),

    V::Error { .. }
    | V::Integer(_)
    | V::Real(_)
    | V::Boolean(_)
    | V::Variable(_)
    | V::Object(_)
    | V::Equal(_)
    | V::Distinct(_)
    | V::Atom { .. }
    | V::Minus(_)
    | V::Sum { .. }
    | V::Product { .. }
    | V::Difference { .. }
    | V::Division { .. }
    | V::LessThan { .. }
    | V::LessThanEq { .. }
    | V::GreaterThan { .. }
    | V::GreaterThanEq { .. }
    | V::Ite { .. }
    | V::Lambda { .. } => t.clone(),

    V::Exists { binds, body } => exists(binds.to_vec(), to_nnf(body)),
    V::Forall { binds, body } => forall(binds.to_vec(), to_nnf(body)),

    V::Conjunction(args) => conjunction(args.iter().map(to_nnf).collect()),
    V::Disjunction(args) => disjunction(args.iter().map(to_nnf).collect()),

    V::Tomorrow(argument) => tomorrow(to_nnf(argument)),
    V::WTomorrow(argument) => w_tomorrow(to_nnf(argument)),
    V::Eventually(argument) => eventually(to_nnf(argument)),
    V::Always(argument) => always(to_nnf(argument)),
    V::Until { left, right } => until(to_nnf(left), to_nnf(right)),
    V::Release { left, right } => release(to_nnf(left), to_nnf(right)),

    V::Yesterday(argument) => yesterday(to_nnf(argument)),
    V::WYesterday(argument) => w_yesterday(to_nnf(argument)),
    V::Once(argument) => once(to_nnf(argument)),
    V::Historically(argument) => historically(to_nnf(argument)),
    V::Since { left, right } => since(to_nnf(left), to_nnf(right)),
    V::Triggered { left, right } => triggered(to_nnf(left), to_nnf(right)),
  }
}

/// The negation normal form of `¬t`.
pub fn push_negation(t: &Term) -> Term {
  use TermView as V;

  match t.view() {
    V::Error { .. } => t.clone(),

    V::Boolean(value) => boolean(!value),

    // Literals: the negation stays put.
    V::Variable(_) | V::Object(_) | V::Atom { .. } | V::Equal(_) | V::Distinct(_) => {
      negation(t.clone())
    }

    V::Negation(argument) => to_nnf(argument),

    V::Conjunction(args) => disjunction(args.iter().map(push_negation).collect()),
    V::Disjunction(args) => conjunction(args.iter().map(push_negation).collect()),
    V::Implication { left, right } => conjunction(vec![to_nnf(left), push_negation(right)]),

    V::Exists { binds, body } => forall(binds.to_vec(), push_negation(body)),
    V::Forall { binds, body } => exists(binds.to_vec(), push_negation(body)),

    // Temporal dualities.
    V::Tomorrow(argument) => w_tomorrow(push_negation(argument)),
    V::WTomorrow(argument) => tomorrow(push_negation(argument)),
    V::Eventually(argument) => always(push_negation(argument)),
    V::Always(argument) => eventually(push_negation(argument)),
    V::Until { left, right } => release(push_negation(left), push_negation(right)),
    V::Release { left, right } => until(push_negation(left), push_negation(right)),

    V::Yesterday(argument) => w_yesterday(push_negation(argument)),
    V::WYesterday(argument) => yesterday(push_negation(argument)),
    V::Once(argument) => historically(push_negation(argument)),
    V::Historically(argument) => once(push_negation(argument)),
    V::Since { left, right } => triggered(push_negation(left), push_negation(right)),
    V::Triggered { left, right } => since(push_negation(left), push_negation(right)),

    // Comparisons flip instead of negating.
    V::LessThan { left, right } => greater_than_eq(left.clone(), right.clone()),
    V::LessThanEq { left, right } => greater_than(left.clone(), right.clone()),
    V::GreaterThan { left, right } => less_than_eq(left.clone(), right.clone()),
    V::GreaterThanEq { left, right } => less_than(left.clone(), right.clone()),

    // Anything else under a negation is left for typing to reject.
    V::Integer(_)
    | V::Real(_)
    | V::Minus(_)
    | V::Sum { .. }
    | V::Product { .. }
    | V::Difference { .. }
    | V::Division { .. }
    | V::Ite { .. }
    | V::Lambda { .. } => negation(t.clone()),
  }
}

/// Rewrites a pure-future formula into its past mirror image: `X`→`Y`, `wX`→`Z`, `F`→`O`,
/// `G`→`H`, `U`→`S`, `R`→`T`. Encountering a past operator produces an `Error` term.
pub fn future_to_past(t: &Term) -> Term {
  use TermView as V;

  // Error children poison the rebuilt term; checking once here keeps the arms below direct.
  let rotate = |child: &Term| future_to_past(child);

  match t.view() {
    V::Error { .. }
    | V::Integer(_)
    | V::Real(_)
    | V::Boolean(_)
    | V::Variable(_)
    | V::Object(_) => t.clone(),

    V::Yesterday(_)
    | V::WYesterday(_)
    | V::Once(_)
    | V::Historically(_)
    | V::Since { .. }
    | V::Triggered { .. } => {
      error_term(t.clone(), "future-to-past transformation applied to a past operator")
    }

    V::Tomorrow(argument) => propagate1(rotate(argument), yesterday),
    V::WTomorrow(argument) => propagate1(rotate(argument), w_yesterday),
    V::Eventually(argument) => propagate1(rotate(argument), once),
    V::Always(argument) => propagate1(rotate(argument), historically),
    V::Until { left, right } => propagate2(rotate(left), rotate(right), since),
    V::Release { left, right } => propagate2(rotate(left), rotate(right), triggered),

    V::Negation(argument) => propagate1(rotate(argument), negation),
    V::Minus(argument) => propagate1(rotate(argument), minus),

    V::Conjunction(args) => propagate_n(args.iter().map(rotate).collect(), conjunction),
    V::Disjunction(args) => propagate_n(args.iter().map(rotate).collect(), disjunction),
    V::Equal(args) => propagate_n(args.iter().map(rotate).collect(), equal),
    V::Distinct(args) => propagate_n(args.iter().map(rotate).collect(), distinct),

    V::Implication { left, right } => propagate2(rotate(left), rotate(right), implication),
    V::Sum { left, right } => propagate2(rotate(left), rotate(right), sum),
    V::Product { left, right } => propagate2(rotate(left), rotate(right), product),
    V::Difference { left, right } => propagate2(rotate(left), rotate(right), difference),
    V::Division { left, right } => propagate2(rotate(left), rotate(right), division),
    V::LessThan { left, right } => propagate2(rotate(left), rotate(right), less_than),
    V::LessThanEq { left, right } => propagate2(rotate(left), rotate(right), less_than_eq),
    V::GreaterThan { left, right } => propagate2(rotate(left), rotate(right), greater_than),
    V::GreaterThanEq { left, right } => {
      propagate2(rotate(left), rotate(right), greater_than_eq)
    }

    V::Atom { head, args } => {
      let rotated: Vec<Term> = args.iter().map(rotate).collect();
      if let Some(err) = rotated.iter().find(|a| a.has_errors()) {
        return err.clone();
      }
      atom(head.clone(), rotated)
    }

    V::Exists { binds, body } => {
      let rotated = rotate(body);
      if rotated.has_errors() {
        return rotated;
      }
      exists(binds.to_vec(), rotated)
    }
    V::Forall { binds, body } => {
      let rotated = rotate(body);
      if rotated.has_errors() {
        return rotated;
      }
      forall(binds.to_vec(), rotated)
    }
    V::Lambda { vars, body } => {
      let rotated = rotate(body);
      if rotated.has_errors() {
        return rotated;
      }
      lambda(vars.to_vec(), rotated)
    }

    V::Ite { guard, iftrue, iffalse } => {
      let parts = [rotate(guard), rotate(iftrue), rotate(iffalse)];
      if let Some(err) = parts.iter().find(|a| a.has_errors()) {
        return err.clone();
      }
      let [g, a, b] = parts;
      ite(g, a, b)
    }
  }
}

fn propagate1(child: Term, rebuild: fn(Term) -> Term) -> Term {
  if child.has_errors() {
    child
  } else {
    rebuild(child)
  }
}

fn propagate2(left: Term, right: Term, rebuild: fn(Term, Term) -> Term) -> Term {
  if left.has_errors() {
    return left;
  }
  if right.has_errors() {
    return right;
  }
  rebuild(left, right)
}

fn propagate_n(args: Vec<Term>, rebuild: fn(Vec<Term>) -> Term) -> Term {
  if let Some(err) = args.iter().find(|a| a.has_errors()) {
    return err.clone();
  }
  rebuild(args)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::module::entity::Decl;
  use crate::api::types::integer_type;

  #[test]
  fn double_negation_cancels() {
    let p = proposition("p");
    let t = negation(negation(p.clone()));
    assert_eq!(to_nnf(&t), p);
  }

  #[test]
  fn negation_dualizes_temporal_operators() {
    let p = proposition("p");

    // ¬F G p  ⇒  G F ¬p
    let t = negation(eventually(always(p.clone())));
    assert_eq!(to_nnf(&t), always(eventually(negation(p.clone()))));

    // ¬(p U q)  ⇒  (¬p R ¬q)
    let u = negation(until(p.clone(), proposition("q")));
    assert_eq!(to_nnf(&u), release(negation(p), negation(proposition("q"))));
  }

  #[test]
  fn implication_is_eliminated() {
    let p = proposition("p");
    let q = proposition("q");
    let t = implication(p.clone(), q.clone());
    assert_eq!(to_nnf(&t), disjunction(vec![negation(p), q]));
  }

  #[test]
  fn negated_quantifiers_flip() {
    let body = greater_than(variable("y"), variable("z"));
    let t = negation(exists(vec![Decl::new("y", integer_type())], body.clone()));
    // ¬∃y.(y > z)  ⇒  ∀y.(y <= z)
    assert_eq!(
      to_nnf(&t),
      forall(vec![Decl::new("y", integer_type())], less_than_eq(variable("y"), variable("z")))
    );
  }

  #[test]
  fn nnf_is_a_fixpoint() {
    let p = proposition("p");
    let q = proposition("q");
    let t = to_nnf(&negation(until(p, negation(q))));
    assert_eq!(to_nnf(&t), t);
  }

  #[test]
  fn future_rotates_to_past() {
    let p = proposition("p");
    let q = proposition("q");
    let t = until(tomorrow(p.clone()), eventually(q.clone()));
    assert_eq!(future_to_past(&t), since(yesterday(p), once(q)));
  }

  #[test]
  fn past_operators_are_a_misuse() {
    let p = proposition("p");
    let t = conjunction(vec![eventually(p.clone()), once(p.clone())]);
    let rotated = future_to_past(&t);
    assert!(rotated.is_error());

    // The error propagates from the offending subterm.
    assert!(future_to_past(&once(p)).is_error());
  }
}
