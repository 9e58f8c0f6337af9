/*!

The automaton stage: rewrites each `Requirement` statement into a symbolic transition system.

Given a requirement `φ`, the stage emits to its downstream consumer a set of fresh *surrogate*
predicates, one per temporal subformula of `φ`, together with `Init`/`Transition`/`Final`
state equations over them, so that the runs of the emitted automaton are exactly the models of
`φ`. All other statements, imports, and push/pop events pass through unchanged.

The encoding works on the stepped normal form of `φ`:

 1. `φ` is first brought to negation normal form (implications eliminated, negations pushed to
    literals);
 2. `Tomorrow`/`WTomorrow` over a resolved object of boolean or arithmetic type become a fresh
    *step copy* of the object: `c == obj` is emitted as a `Transition`, and the occurrence is
    replaced by the primed copy;
 3. every remaining temporal subformula `ψ` gets a surrogate predicate `x_ψ(fv(ψ))` with
    `Role::State`, declared with delayed resolution in the stage-local module `Γ`, and the
    fixpoint expansion equations of `ψ` are emitted under a universal closure over `fv(ψ)`.

`prime(t)` replaces every free object leaf by its next-state twin, declaring the twin in `Γ` on
first use; one twin exists per entity per encoding pass, and twins prime to themselves. The
types of free variables are tracked in a second stage-local module, `AUX`, which receives the
binders of every quantifier on the way down.

After the traversal, a propositional anchor ties the top-level truth of `φ` to the initial
state (or, for pure past/present requirements, to the final state), `Γ` is resolved and its
root adopted downstream, and the three closing statements are emitted.

Any `Error` subterm suppresses the emissions for its subtree and propagates upward; a
requirement that encodes to an error is dropped with a warning and produces no statements.

*/

use std::rc::Rc;

use telos_abs::{warning, HashMap, HashSet};

use crate::api::{
  consumer::{Consumer, StatementKind},
  label::Label,
  pipeline::Stage,
  semantics::type_of,
  term::{
    atom, conjunction, disjunction, equal, error_term, exists, forall, implication, ite, lambda,
    map_children, negation, variable, Term, TermView,
  },
  transforms::to_nnf,
  types::{boolean_type, function_type, inferred_type, Type},
};
use crate::core::module::{
  entity::{Decl, Entity, Recursion, Resolution, Role, Root},
  Module,
};

/// The stage constructor for [`Pipeline::then`](crate::api::pipeline::Pipeline::then).
pub fn automaton() -> Box<dyn Stage> {
  Box::new(Automaton)
}

pub struct Automaton;

impl Stage for Automaton {
  fn instantiate(self: Box<Self>, next: Box<dyn Consumer>) -> Box<dyn Consumer> {
    Box::new(AutomatonConsumer::new(next))
  }
}

pub struct AutomatonConsumer {
  next: Box<dyn Consumer>,
}

impl AutomatonConsumer {
  pub fn new(next: Box<dyn Consumer>) -> AutomatonConsumer {
    AutomatonConsumer { next }
  }
}

impl Consumer for AutomatonConsumer {
  fn import(&mut self, module: Module) {
    self.next.import(module);
  }

  // Roots are absorbed: every entity the downstream needs resurfaces inside the emitted
  // statements, and the surrogate root is adopted explicitly per requirement.
  fn adopt(&mut self, _root: Rc<Root>) {}

  fn state(&mut self, term: Term, kind: StatementKind) {
    if kind == StatementKind::Requirement {
      encode_requirement(term, self.next.as_mut());
    } else {
      self.next.state(term, kind);
    }
  }

  fn push(&mut self) {
    self.next.push();
  }

  fn pop(&mut self, count: usize) {
    self.next.pop(count);
  }
}

/// The result of encoding one subformula: its stepped form and its free variables in order of
/// first sight.
struct Snf {
  term: Term,
  free: Vec<Label>,
}

impl Snf {
  fn closed(term: Term) -> Snf {
    Snf { term, free: Vec::new() }
  }
}

fn union(into: &mut Vec<Label>, from: Vec<Label>) {
  for v in from {
    if !into.contains(&v) {
      into.push(v);
    }
  }
}

struct Encoding<'a> {
  next: &'a mut dyn Consumer,
  /// Γ: accumulates the surrogate predicates, step copies, and primed twins.
  gamma: Module,
  /// AUX: tracks the types of quantified variables for the surrogate signatures.
  aux: Module,
  future: bool,
  surrogate_count: i64,
  /// Primed twins, one per entity per pass, keyed by entity address.
  primes: HashMap<usize, Term>,
  /// Entities that *are* twins; priming them is the identity.
  twins: HashSet<usize>,
  /// Step copies for `Tomorrow`/`WTomorrow` over objects, keyed by entity address.
  next_copies: HashMap<usize, Term>,
  weak_copies: HashMap<usize, Term>,
}

fn encode_requirement(phi: Term, next: &mut dyn Consumer) {
  let mut enc = Encoding {
    next,
    gamma: Module::new(),
    aux: Module::new(),
    future: false,
    surrogate_count: 0,
    primes: HashMap::new(),
    twins: HashSet::new(),
    next_copies: HashMap::new(),
    weak_copies: HashMap::new(),
  };

  let snf = enc.encode(&to_nnf(&phi));
  if snf.term.has_errors() {
    warning!(1, "requirement dropped: its encoding contains errors: {}", snf.term);
    return;
  }

  // The anchor ties the truth of φ to a fresh propositional state variable.
  let anchor_name = if enc.future { "xs_phi" } else { "xy_phi" };
  let anchor = enc.gamma.declare(
    Decl::with_role(anchor_name, boolean_type(), Role::State),
    Resolution::Delayed,
  );

  // Closing terms are built before Γ is resolved, since prime() may still declare twins.
  let closing = if enc.future {
    let primed = enc.prime(&snf.term);
    [
      (anchor.clone(), StatementKind::Init),
      (equal(vec![anchor.clone(), primed]), StatementKind::Transition),
      (negation(anchor), StatementKind::Final),
    ]
  } else {
    let primed_anchor = enc.prime(&anchor);
    [
      (negation(anchor.clone()), StatementKind::Init),
      (equal(vec![primed_anchor, snf.term]), StatementKind::Transition),
      (anchor, StatementKind::Final),
    ]
  };

  let root = enc.gamma.resolve(Recursion::Forbidden);
  enc.next.adopt(root);
  for (t, kind) in closing {
    enc.next.state(t, kind);
  }
}

impl<'a> Encoding<'a> {
  fn encode(&mut self, t: &Term) -> Snf {
    use TermView as V;

    match t.view() {
      V::Error { .. } | V::Integer(_) | V::Real(_) | V::Boolean(_) | V::Object(_) => {
        Snf::closed(t.clone())
      }

      V::Variable(x) => Snf { term: t.clone(), free: vec![x.clone()] },

      // Quantifiers declare their binders in a copy of AUX and hide them from the free list.
      V::Exists { binds, body } | V::Forall { binds, body } | V::Lambda { vars: binds, body } => {
        let saved = self.aux.clone();
        for d in binds {
          self.aux.declare(d.clone(), Resolution::Immediate);
        }
        let rec = self.encode(body);
        self.aux = saved;
        if rec.term.has_errors() {
          return rec;
        }

        let free = rec
            .free
            .into_iter()
            .filter(|v| !binds.iter().any(|d| d.name == *v))
            .collect();
        let term = match t.view() {
          V::Exists { .. } => exists(binds.to_vec(), rec.term),
          V::Forall { .. } => forall(binds.to_vec(), rec.term),
          _ => lambda(binds.to_vec(), rec.term),
        };
        Snf { term, free }
      }

      V::Atom { head, args } => match self.encode_all(args) {
        Ok((encoded, free)) => Snf { term: atom(head.clone(), encoded), free },
        Err(err) => err,
      },

      V::Equal(args) => self.nary(args, equal),
      V::Distinct(args) => self.nary(args, crate::api::term::distinct),
      V::Conjunction(args) => self.nary(args, conjunction),
      V::Disjunction(args) => self.nary(args, disjunction),

      V::Negation(argument) => self.unary(argument, negation),
      V::Minus(argument) => self.unary(argument, crate::api::term::minus),

      V::Implication { left, right } => self.binary(left, right, implication),
      V::Sum { left, right } => self.binary(left, right, crate::api::term::sum),
      V::Product { left, right } => self.binary(left, right, crate::api::term::product),
      V::Difference { left, right } => self.binary(left, right, crate::api::term::difference),
      V::Division { left, right } => self.binary(left, right, crate::api::term::division),
      V::LessThan { left, right } => self.binary(left, right, crate::api::term::less_than),
      V::LessThanEq { left, right } => self.binary(left, right, crate::api::term::less_than_eq),
      V::GreaterThan { left, right } => self.binary(left, right, crate::api::term::greater_than),
      V::GreaterThanEq { left, right } => {
        self.binary(left, right, crate::api::term::greater_than_eq)
      }

      V::Ite { guard, iftrue, iffalse } => {
        match self.encode_all(&[guard.clone(), iftrue.clone(), iffalse.clone()]) {
          Ok((mut encoded, free)) => {
            let c = encoded.pop().unwrap();
            let b = encoded.pop().unwrap();
            let a = encoded.pop().unwrap();
            Snf { term: ite(a, b, c), free }
          }
          Err(err) => err,
        }
      }

      // region Temporal operators

      V::Tomorrow(argument) => self.step(t, argument, true),
      V::WTomorrow(argument) => self.step(t, argument, false),

      V::Eventually(argument) => {
        self.future = true;
        let rec = self.encode(argument);
        if rec.term.has_errors() {
          return rec;
        }
        let (surr, decls) = self.surrogate("xs", &rec.free);
        let expansion = disjunction(vec![rec.term, surr.clone()]);
        let primed = self.prime(&expansion);
        self.emit(&decls, equal(vec![surr.clone(), primed]), StatementKind::Transition);
        self.emit(&decls, negation(surr), StatementKind::Final);
        Snf { term: expansion, free: rec.free }
      }

      V::Always(argument) => {
        self.future = true;
        let rec = self.encode(argument);
        if rec.term.has_errors() {
          return rec;
        }
        let (surr, decls) = self.surrogate("xw", &rec.free);
        let expansion = conjunction(vec![rec.term, surr.clone()]);
        let primed = self.prime(&expansion);
        self.emit(&decls, equal(vec![surr.clone(), primed]), StatementKind::Transition);
        self.emit(&decls, surr, StatementKind::Final);
        Snf { term: expansion, free: rec.free }
      }

      V::Yesterday(argument) => {
        let rec = self.encode(argument);
        if rec.term.has_errors() {
          return rec;
        }
        let (surr, decls) = self.surrogate("xy", &rec.free);
        let primed = self.prime(&surr);
        self.emit(&decls, equal(vec![primed, rec.term]), StatementKind::Transition);
        self.emit(&decls, negation(surr.clone()), StatementKind::Init);
        Snf { term: surr, free: rec.free }
      }

      V::WYesterday(argument) => {
        let rec = self.encode(argument);
        if rec.term.has_errors() {
          return rec;
        }
        let (surr, decls) = self.surrogate("xz", &rec.free);
        let primed = self.prime(&surr);
        self.emit(&decls, equal(vec![primed, rec.term]), StatementKind::Transition);
        self.emit(&decls, surr.clone(), StatementKind::Init);
        Snf { term: surr, free: rec.free }
      }

      V::Once(argument) => {
        let rec = self.encode(argument);
        if rec.term.has_errors() {
          return rec;
        }
        let (surr, decls) = self.surrogate("xy", &rec.free);
        let expansion = disjunction(vec![rec.term, surr.clone()]);
        let primed = self.prime(&surr);
        self.emit(&decls, equal(vec![primed, expansion.clone()]), StatementKind::Transition);
        self.emit(&decls, negation(surr), StatementKind::Init);
        Snf { term: expansion, free: rec.free }
      }

      V::Historically(argument) => {
        let rec = self.encode(argument);
        if rec.term.has_errors() {
          return rec;
        }
        let (surr, decls) = self.surrogate("xz", &rec.free);
        let expansion = conjunction(vec![rec.term, surr.clone()]);
        let primed = self.prime(&surr);
        self.emit(&decls, equal(vec![primed, expansion.clone()]), StatementKind::Transition);
        self.emit(&decls, surr, StatementKind::Init);
        Snf { term: expansion, free: rec.free }
      }

      V::Until { left, right } => {
        self.future = true;
        let (l, r, free) = match self.encode_pair(left, right) {
          Ok(ok) => ok,
          Err(err) => return err,
        };
        let (surr, decls) = self.surrogate("xs", &free);
        let expansion = disjunction(vec![r, conjunction(vec![l, surr.clone()])]);
        let primed = self.prime(&expansion);
        self.emit(&decls, equal(vec![surr.clone(), primed]), StatementKind::Transition);
        self.emit(&decls, negation(surr), StatementKind::Final);
        Snf { term: expansion, free }
      }

      V::Release { left, right } => {
        self.future = true;
        let (l, r, free) = match self.encode_pair(left, right) {
          Ok(ok) => ok,
          Err(err) => return err,
        };
        let (surr, decls) = self.surrogate("xw", &free);
        let expansion = conjunction(vec![r, disjunction(vec![l, surr.clone()])]);
        let primed = self.prime(&expansion);
        self.emit(&decls, equal(vec![surr.clone(), primed]), StatementKind::Transition);
        self.emit(&decls, surr, StatementKind::Final);
        Snf { term: expansion, free }
      }

      V::Since { left, right } => {
        let (l, r, free) = match self.encode_pair(left, right) {
          Ok(ok) => ok,
          Err(err) => return err,
        };
        let (surr, decls) = self.surrogate("xy", &free);
        let expansion = disjunction(vec![r, conjunction(vec![l, surr.clone()])]);
        let primed = self.prime(&surr);
        self.emit(&decls, equal(vec![primed, expansion.clone()]), StatementKind::Transition);
        self.emit(&decls, negation(surr), StatementKind::Init);
        Snf { term: expansion, free }
      }

      V::Triggered { left, right } => {
        let (l, r, free) = match self.encode_pair(left, right) {
          Ok(ok) => ok,
          Err(err) => return err,
        };
        let (surr, decls) = self.surrogate("xz", &free);
        let expansion = conjunction(vec![r, disjunction(vec![l, surr.clone()])]);
        let primed = self.prime(&surr);
        self.emit(&decls, equal(vec![primed, expansion.clone()]), StatementKind::Transition);
        self.emit(&decls, surr, StatementKind::Init);
        Snf { term: expansion, free }
      }

      // endregion
    }
  }

  /// `Tomorrow`/`WTomorrow`. Over a resolved object of boolean or arithmetic type the operator
  /// is pushed onto a step copy of the object; anything else takes the surrogate path.
  fn step(&mut self, t: &Term, argument: &Term, strong: bool) -> Snf {
    self.future = true;

    if let Some(entry) = argument.as_object() {
      let Some(e) = entry.entity() else {
        return Snf::closed(error_term(t.clone(), "dangling object under a step operator"));
      };
      let ty = e.ty();
      if ty.is_boolean() || ty.is_arithmetic() {
        let copy = self.step_copy(argument, &e, strong);
        let primed = self.prime(&copy);
        return Snf::closed(primed);
      }
    }

    let rec = self.encode(argument);
    if rec.term.has_errors() {
      return rec;
    }
    let (surr, decls) = self.surrogate(if strong { "xs" } else { "ws" }, &rec.free);
    let primed = self.prime(&rec.term);
    self.emit(&decls, equal(vec![surr.clone(), primed]), StatementKind::Transition);
    if strong {
      self.emit(&decls, negation(surr.clone()), StatementKind::Final);
    } else {
      self.emit(&decls, surr.clone(), StatementKind::Final);
    }
    Snf { term: surr, free: rec.free }
  }

  /// The step copy of an object: a fresh state variable `c` with `c == obj` in the transition
  /// relation. One copy per object per pass (separately for strong and weak steps).
  fn step_copy(&mut self, obj_term: &Term, e: &Rc<Entity>, strong: bool) -> Term {
    let key = Rc::as_ptr(e) as usize;
    let existing = if strong {
      self.next_copies.get(&key).cloned()
    } else {
      self.weak_copies.get(&key).cloned()
    };
    if let Some(copy) = existing {
      return copy;
    }

    let prefix = if strong { "xc" } else { "wc" };
    let name = Label::tuple([Label::name(prefix), e.name.clone()]);
    let copy = self
        .gamma
        .declare(Decl::with_role(name, e.ty(), Role::State), Resolution::Delayed);

    if strong {
      self.next_copies.insert(key, copy.clone());
    } else {
      self.weak_copies.insert(key, copy.clone());
    }

    self.next.state(equal(vec![copy.clone(), obj_term.clone()]), StatementKind::Transition);
    copy
  }

  /// Declares the surrogate predicate for one temporal subformula: `x_ψ : (fv types) -> Bool`
  /// with `Role::State` and delayed resolution, or a plain boolean when `fv` is empty. Returns
  /// the applied surrogate and the universal closure declarations.
  fn surrogate(&mut self, prefix: &str, free: &[Label]) -> (Term, Vec<Decl>) {
    self.surrogate_count += 1;
    let name = Label::indexed(prefix, self.surrogate_count);

    if free.is_empty() {
      let obj = self
          .gamma
          .declare(Decl::with_role(name, boolean_type(), Role::State), Resolution::Delayed);
      return (obj, Vec::new());
    }

    let types: Vec<Type> = free.iter().map(|v| self.aux_type(v)).collect();
    let decls: Vec<Decl> = free
        .iter()
        .zip(types.iter())
        .map(|(v, ty)| Decl::new(v.clone(), ty.clone()))
        .collect();

    let head = self.gamma.declare(
      Decl::with_role(name, function_type(types, boolean_type()), Role::State),
      Resolution::Delayed,
    );
    let args = free.iter().map(|v| variable(v.clone())).collect();
    (atom(head, args), decls)
  }

  fn aux_type(&self, v: &Label) -> Type {
    match self.aux.lookup(v) {
      Some(obj) => type_of(&obj),
      None => inferred_type(),
    }
  }

  /// Emits `t` under a universal closure over `decls` (none when the subformula is closed).
  fn emit(&mut self, decls: &[Decl], t: Term, kind: StatementKind) {
    let closed = if decls.is_empty() { t } else { forall(decls.to_vec(), t) };
    self.next.state(closed, kind);
  }

  /// Replaces every free object leaf of `t` by its primed twin, declaring the twin in Γ on
  /// first use. Twins prime to themselves, so the operation is idempotent.
  fn prime(&mut self, t: &Term) -> Term {
    match t.view() {
      TermView::Error { .. } => t.clone(),

      TermView::Object(entry) => match entry.entity() {
        Some(e) => self.prime_of(&e),
        None => error_term(t.clone(), "dangling object under prime"),
      },

      _ => map_children(t, &mut |child| self.prime(child)),
    }
  }

  fn prime_of(&mut self, e: &Rc<Entity>) -> Term {
    let key = Rc::as_ptr(e) as usize;
    if self.twins.contains(&key) {
      return crate::api::term::object(e);
    }
    if let Some(twin) = self.primes.get(&key) {
      return twin.clone();
    }

    let twin = self.gamma.declare(
      Decl::with_role(e.name.primed(), e.ty(), Role::State),
      Resolution::Delayed,
    );
    if let Some(twin_entity) = twin.as_object().and_then(|o| o.entity()) {
      self.twins.insert(Rc::as_ptr(&twin_entity) as usize);
    }
    self.primes.insert(key, twin.clone());
    twin
  }

  // region Structural recursion helpers

  fn encode_all(&mut self, args: &[Term]) -> Result<(Vec<Term>, Vec<Label>), Snf> {
    let mut free = Vec::new();
    let mut encoded = Vec::new();
    for a in args {
      let rec = self.encode(a);
      if rec.term.has_errors() {
        return Err(rec);
      }
      union(&mut free, rec.free);
      encoded.push(rec.term);
    }
    Ok((encoded, free))
  }

  fn encode_pair(&mut self, left: &Term, right: &Term) -> Result<(Term, Term, Vec<Label>), Snf> {
    let l = self.encode(left);
    if l.term.has_errors() {
      return Err(l);
    }
    let r = self.encode(right);
    if r.term.has_errors() {
      return Err(r);
    }
    let mut free = l.free;
    union(&mut free, r.free);
    Ok((l.term, r.term, free))
  }

  fn nary(&mut self, args: &[Term], rebuild: fn(Vec<Term>) -> Term) -> Snf {
    match self.encode_all(args) {
      Ok((encoded, free)) => Snf { term: rebuild(encoded), free },
      Err(err) => err,
    }
  }

  fn unary(&mut self, argument: &Term, rebuild: fn(Term) -> Term) -> Snf {
    let rec = self.encode(argument);
    if rec.term.has_errors() {
      return rec;
    }
    Snf { term: rebuild(rec.term), free: rec.free }
  }

  fn binary(&mut self, left: &Term, right: &Term, rebuild: fn(Term, Term) -> Term) -> Snf {
    match self.encode_pair(left, right) {
      Ok((l, r, free)) => Snf { term: rebuild(l, r), free },
      Err(err) => err,
    }
  }

  // endregion
}

#[cfg(test)]
mod tests;
