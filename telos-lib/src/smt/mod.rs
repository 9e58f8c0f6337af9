/*!

The bridge from resolved terms and state equations to an external SMT solver.

The solver itself is an opaque collaborator behind the [`SmtSolver`] oracle trait: it receives
entity declarations and term assertions, answers `check_sat`, and evaluates objects in the last
model. Concrete back-ends live outside this crate; they are expected to support first-order
logic with quantifiers and linear integer/real arithmetic.

[`SmtBridge`] sits at the end of a pipeline. It maintains the one-to-one correspondence between
resolved entities and solver-side declarations: every object reachable from an adopted root or
an incoming statement is declared on first use, exactly once, keyed by entity identity. Adopted
roots declare their entities eagerly (and the objects inside their defining values,
recursively); statements declare whatever else they mention before being recorded.

`Requirement` statements are asserted on the spot. `Init`/`Transition`/`Final` statements are
recorded per kind and left to the search loop built on top of the bridge; their temporal
indexing (the unrolling of the transition relation) is that loop's business, not the bridge's.

Consumer methods cannot return errors, so operational solver failures are logged and collected;
`take_errors` hands them to the caller. The query surface (`assert_term`, `check_sat`,
`value_of`) reports errors directly.

*/

use std::rc::Rc;

use telos_abs::{warning, HashSet};

use crate::{
  api::{
    consumer::{Consumer, StatementKind},
    term::Term,
  },
  core::module::{
    entity::{Entity, Root},
    Module,
  },
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SatResult {
  Sat,
  Unsat,
  Unknown,
}

#[derive(Debug)]
pub enum SolverError {
  /// The bridge or the back-end cannot express the given input.
  Unsupported(String),
  /// The back-end failed on its own terms.
  Backend(String),
}

impl std::fmt::Display for SolverError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SolverError::Unsupported(message) => write!(f, "unsupported input: {}", message),
      SolverError::Backend(message) => write!(f, "solver backend error: {}", message),
    }
  }
}

impl std::error::Error for SolverError {}

/// The oracle contract a concrete solver back-end implements.
pub trait SmtSolver {
  /// Allocates a solver-side constant or function for `entity`. Called at most once per
  /// entity by the bridge.
  fn declare(&mut self, entity: &Rc<Entity>) -> Result<(), SolverError>;

  fn assert_term(&mut self, term: &Term) -> Result<(), SolverError>;

  fn push(&mut self) -> Result<(), SolverError>;

  fn pop(&mut self, count: usize) -> Result<(), SolverError>;

  fn check_sat(&mut self) -> Result<SatResult, SolverError>;

  /// The value of a resolved object in the last satisfying model, if any.
  fn value_of(&mut self, object: &Term) -> Result<Option<Term>, SolverError>;
}

pub struct SmtBridge<S: SmtSolver> {
  solver: S,
  declared: HashSet<usize>,
  statements: Vec<(Term, StatementKind)>,
  errors: Vec<SolverError>,
}

impl<S: SmtSolver> SmtBridge<S> {
  pub fn new(solver: S) -> SmtBridge<S> {
    SmtBridge { solver, declared: HashSet::new(), statements: Vec::new(), errors: Vec::new() }
  }

  pub fn solver(&mut self) -> &mut S {
    &mut self.solver
  }

  /// The recorded statements of the given kind, in arrival order.
  pub fn statements(&self, kind: StatementKind) -> Vec<Term> {
    self
        .statements
        .iter()
        .filter(|(_, k)| *k == kind)
        .map(|(t, _)| t.clone())
        .collect()
  }

  /// Errors accumulated by the consumer-side methods since the last call.
  pub fn take_errors(&mut self) -> Vec<SolverError> {
    std::mem::take(&mut self.errors)
  }

  // region Queries

  pub fn assert_term(&mut self, term: &Term) -> Result<(), SolverError> {
    self.declare_objects(term)?;
    self.solver.assert_term(term)
  }

  pub fn check_sat(&mut self) -> Result<SatResult, SolverError> {
    self.solver.check_sat()
  }

  pub fn value_of(&mut self, object: &Term) -> Result<Option<Term>, SolverError> {
    self.solver.value_of(object)
  }

  // endregion

  fn declare_entity(&mut self, entity: &Rc<Entity>) -> Result<(), SolverError> {
    let key = Rc::as_ptr(entity) as usize;
    if !self.declared.insert(key) {
      return Ok(());
    }

    self.solver.declare(entity)?;

    // A definition's value may mention objects of other roots; those are part of the
    // entity's meaning and must exist solver-side too.
    if let Some(value) = entity.value() {
      self.declare_objects(&value)?;
    }
    Ok(())
  }

  fn declare_objects(&mut self, term: &Term) -> Result<(), SolverError> {
    if let Some(entry) = term.as_object() {
      match entry.entity() {
        Some(e) => self.declare_entity(&e)?,
        None => {
          return Err(SolverError::Unsupported(
            "a dangling object reached the solver bridge".into(),
          ));
        }
      }
    }

    for child in term.children() {
      self.declare_objects(child)?;
    }
    Ok(())
  }

  fn report(&mut self, result: Result<(), SolverError>) {
    if let Err(error) = result {
      warning!(1, "solver bridge: {}", error);
      self.errors.push(error);
    }
  }
}

impl<S: SmtSolver> Consumer for SmtBridge<S> {
  fn import(&mut self, module: Module) {
    // Unfold the module into its primitive events and feed them back to ourselves.
    module.replay(&Module::new(), self);
  }

  fn adopt(&mut self, root: Rc<Root>) {
    for entity in &root.entities {
      let result = self.declare_entity(entity);
      self.report(result);
    }
  }

  fn state(&mut self, term: Term, kind: StatementKind) {
    let declared = self.declare_objects(&term);
    let ok = declared.is_ok();
    self.report(declared);

    if ok && kind == StatementKind::Requirement {
      let result = self.solver.assert_term(&term);
      self.report(result);
    }
    self.statements.push((term, kind));
  }

  fn push(&mut self) {
    let result = self.solver.push();
    self.report(result);
  }

  fn pop(&mut self, count: usize) {
    let result = self.solver.pop(count);
    self.report(result);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{
    label::Label,
    term::{boolean, conjunction, equal, integer, sum, variable, Term},
    types::{boolean_type, integer_type},
  };
  use crate::core::module::entity::{Decl, Def, Resolution, Role};

  #[derive(Default)]
  struct MockSolver {
    declarations: Vec<Label>,
    assertions: Vec<Term>,
    scope_depth: usize,
    result: Option<SatResult>,
  }

  impl SmtSolver for MockSolver {
    fn declare(&mut self, entity: &Rc<Entity>) -> Result<(), SolverError> {
      self.declarations.push(entity.name.clone());
      Ok(())
    }

    fn assert_term(&mut self, term: &Term) -> Result<(), SolverError> {
      self.assertions.push(term.clone());
      Ok(())
    }

    fn push(&mut self) -> Result<(), SolverError> {
      self.scope_depth += 1;
      Ok(())
    }

    fn pop(&mut self, count: usize) -> Result<(), SolverError> {
      self.scope_depth = self.scope_depth.saturating_sub(count);
      Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, SolverError> {
      self.result.ok_or_else(|| SolverError::Backend("no scripted result".into()))
    }

    fn value_of(&mut self, _object: &Term) -> Result<Option<Term>, SolverError> {
      Ok(Some(boolean(true)))
    }
  }

  #[test]
  fn objects_are_declared_on_first_use_exactly_once() {
    let mut m = crate::core::module::Module::new();
    let p = m.declare(Decl::with_role("p", boolean_type(), Role::State), Resolution::Immediate);
    let q = m.declare(Decl::with_role("q", boolean_type(), Role::State), Resolution::Immediate);

    let mut bridge = SmtBridge::new(MockSolver::default());
    bridge.state(conjunction(vec![p.clone(), q.clone()]), StatementKind::Requirement);
    bridge.state(conjunction(vec![q, p]), StatementKind::Requirement);

    assert_eq!(bridge.solver().declarations, vec![Label::from("p"), Label::from("q")]);
    assert_eq!(bridge.solver().assertions.len(), 2);
    assert!(bridge.take_errors().is_empty());
  }

  #[test]
  fn adopt_declares_the_whole_root_and_its_definition_values() {
    let mut m = crate::core::module::Module::new();
    let a = m.declare(Decl::new("a", integer_type()), Resolution::Immediate);
    m.define(Def::new("b", integer_type(), sum(a, integer(1))), Resolution::Delayed);
    let root = m.resolve(crate::core::module::entity::Recursion::Forbidden);

    let mut bridge = SmtBridge::new(MockSolver::default());
    bridge.adopt(root);

    // `b` is declared, and the object `a` inside its value follows.
    assert_eq!(bridge.solver().declarations, vec![Label::from("b"), Label::from("a")]);
  }

  #[test]
  fn non_requirement_statements_are_recorded_not_asserted() {
    let mut m = crate::core::module::Module::new();
    let p = m.declare(Decl::with_role("p", boolean_type(), Role::State), Resolution::Immediate);

    let mut bridge = SmtBridge::new(MockSolver::default());
    bridge.state(p.clone(), StatementKind::Init);
    bridge.state(p.clone(), StatementKind::Transition);
    bridge.state(p.clone(), StatementKind::Requirement);

    assert_eq!(bridge.solver().assertions, vec![p.clone()]);
    assert_eq!(bridge.statements(StatementKind::Init), vec![p.clone()]);
    assert_eq!(bridge.statements(StatementKind::Transition), vec![p]);
  }

  #[test]
  fn importing_a_module_unfolds_it() {
    let mut m = crate::core::module::Module::new();
    let p = m.declare(Decl::with_role("p", boolean_type(), Role::State), Resolution::Immediate);
    m.require(p);

    let mut bridge = SmtBridge::new(MockSolver::default());
    bridge.import(m);

    assert_eq!(bridge.solver().declarations, vec![Label::from("p")]);
    assert_eq!(bridge.solver().assertions.len(), 1);
  }

  #[test]
  fn queries_delegate_to_the_oracle() {
    let mut bridge = SmtBridge::new(MockSolver { result: Some(SatResult::Sat), ..MockSolver::default() });

    bridge.assert_term(&equal(vec![variable("x"), integer(3)])).unwrap();
    assert_eq!(bridge.check_sat().unwrap(), SatResult::Sat);

    let mut m = crate::core::module::Module::new();
    let x = m.declare(Decl::new("x", integer_type()), Resolution::Immediate);
    assert_eq!(bridge.value_of(&x).unwrap(), Some(boolean(true)));
  }

  #[test]
  fn dangling_objects_are_reported_as_errors() {
    let orphan: Term = {
      let mut m = crate::core::module::Module::new();
      m.declare(Decl::new("p", boolean_type()), Resolution::Immediate)
    };

    let mut bridge = SmtBridge::new(MockSolver::default());
    bridge.state(orphan, StatementKind::Requirement);

    let errors = bridge.take_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], SolverError::Unsupported(_)));
    assert!(bridge.solver().assertions.is_empty());
  }

  #[test]
  fn scopes_follow_push_and_pop() {
    let mut bridge = SmtBridge::new(MockSolver::default());
    bridge.push();
    bridge.push();
    bridge.pop(1);
    assert_eq!(bridge.solver().scope_depth, 1);
  }
}
