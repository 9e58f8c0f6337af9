use std::{cell::RefCell, rc::Rc};

use super::*;
use crate::api::{
  consumer::{Event, Recorder},
  term::{boolean, integer, less_than, object, tomorrow},
  types::integer_type,
};

/// A recorder that can be handed to the stage as a boxed consumer while the test keeps a
/// handle for inspection.
#[derive(Clone, Default)]
struct SharedRecorder(Rc<RefCell<Recorder>>);

impl SharedRecorder {
  fn statements(&self, kind: StatementKind) -> Vec<Term> {
    self.0.borrow().statements(kind)
  }

  fn roots(&self) -> Vec<Rc<Root>> {
    self.0.borrow().roots()
  }

  fn event_count(&self) -> usize {
    self.0.borrow().events.len()
  }
}

impl Consumer for SharedRecorder {
  fn import(&mut self, module: Module) {
    self.0.borrow_mut().import(module);
  }
  fn adopt(&mut self, root: Rc<Root>) {
    self.0.borrow_mut().adopt(root);
  }
  fn state(&mut self, term: Term, kind: StatementKind) {
    self.0.borrow_mut().state(term, kind);
  }
  fn push(&mut self) {
    self.0.borrow_mut().push();
  }
  fn pop(&mut self, count: usize) {
    self.0.borrow_mut().pop(count);
  }
}

fn stage_over_recorder() -> (AutomatonConsumer, SharedRecorder) {
  let recorder = SharedRecorder::default();
  (AutomatonConsumer::new(Box::new(recorder.clone())), recorder)
}

fn declared_bool(m: &mut Module, name: &str) -> Term {
  m.declare(Decl::with_role(name, boolean_type(), Role::State), Resolution::Immediate)
}

fn entity_object(root: &Rc<Root>, name: &Label) -> Term {
  object(root.entity(name).unwrap_or_else(|| panic!("no entity named {}", name)))
}

#[test]
fn eventually_emits_the_fixpoint_equations() {
  let mut m = Module::new();
  let p = declared_bool(&mut m, "p");

  let (mut stage, recorder) = stage_over_recorder();
  stage.state(crate::api::term::eventually(p.clone()), StatementKind::Requirement);

  let roots = recorder.roots();
  assert_eq!(roots.len(), 1);
  let root = &roots[0];

  let surr_name = Label::indexed("xs", 1);
  let surr = entity_object(root, &surr_name);
  let surr_entity = root.entity(&surr_name).unwrap();
  assert_eq!(surr_entity.role, Some(Role::State));
  assert!(surr_entity.ty().is_boolean());

  let anchor = entity_object(root, &"xs_phi".into());
  let p_prime = entity_object(root, &Label::name("p").primed());
  let surr_prime = entity_object(root, &surr_name.primed());
  let primed_expansion = disjunction(vec![p_prime, surr_prime]);

  assert_eq!(
    recorder.statements(StatementKind::Transition),
    vec![
      equal(vec![surr.clone(), primed_expansion.clone()]),
      equal(vec![anchor.clone(), primed_expansion]),
    ]
  );
  assert_eq!(
    recorder.statements(StatementKind::Final),
    vec![negation(surr), negation(anchor.clone())]
  );
  assert_eq!(recorder.statements(StatementKind::Init), vec![anchor]);
}

#[test]
fn always_emits_the_dual_equations() {
  let mut m = Module::new();
  let p = declared_bool(&mut m, "p");

  let (mut stage, recorder) = stage_over_recorder();
  stage.state(crate::api::term::always(p.clone()), StatementKind::Requirement);

  let root = &recorder.roots()[0];
  let surr_name = Label::indexed("xw", 1);
  let surr = entity_object(root, &surr_name);
  let anchor = entity_object(root, &"xs_phi".into());
  let p_prime = entity_object(root, &Label::name("p").primed());
  let surr_prime = entity_object(root, &surr_name.primed());
  let primed_expansion = conjunction(vec![p_prime, surr_prime]);

  assert_eq!(
    recorder.statements(StatementKind::Transition),
    vec![
      equal(vec![surr.clone(), primed_expansion.clone()]),
      equal(vec![anchor.clone(), primed_expansion]),
    ]
  );
  // G is a greatest fixpoint: the surrogate must hold at the end of the trace.
  assert_eq!(
    recorder.statements(StatementKind::Final),
    vec![surr, negation(anchor.clone())]
  );
  assert_eq!(recorder.statements(StatementKind::Init), vec![anchor]);
}

#[test]
fn historically_is_pure_past() {
  let mut m = Module::new();
  let p = declared_bool(&mut m, "p");

  let (mut stage, recorder) = stage_over_recorder();
  stage.state(crate::api::term::historically(p.clone()), StatementKind::Requirement);

  let root = &recorder.roots()[0];
  let surr_name = Label::indexed("xz", 1);
  let surr = entity_object(root, &surr_name);
  let surr_prime = entity_object(root, &surr_name.primed());
  let anchor = entity_object(root, &"xy_phi".into());
  let anchor_prime = entity_object(root, &Label::name("xy_phi").primed());
  let expansion = conjunction(vec![p.clone(), surr.clone()]);

  assert_eq!(
    recorder.statements(StatementKind::Transition),
    vec![
      equal(vec![surr_prime, expansion.clone()]),
      equal(vec![anchor_prime, expansion]),
    ]
  );
  assert_eq!(
    recorder.statements(StatementKind::Init),
    vec![surr, negation(anchor.clone())]
  );
  assert_eq!(recorder.statements(StatementKind::Final), vec![anchor]);
}

#[test]
fn each_temporal_subformula_gets_exactly_one_surrogate() {
  let mut m = Module::new();
  let p = declared_bool(&mut m, "p");
  let q = declared_bool(&mut m, "q");

  let (mut stage, recorder) = stage_over_recorder();
  let phi = conjunction(vec![
    crate::api::term::eventually(p.clone()),
    crate::api::term::always(q.clone()),
  ]);
  stage.state(phi, StatementKind::Requirement);

  let root = &recorder.roots()[0];
  assert!(root.entity(&Label::indexed("xs", 1)).is_some());
  assert!(root.entity(&Label::indexed("xw", 2)).is_some());

  // One fixpoint equation pair per subformula, one anchor triple, nothing else.
  assert_eq!(recorder.statements(StatementKind::Transition).len(), 3);
  assert_eq!(recorder.statements(StatementKind::Final).len(), 3);
  assert_eq!(recorder.statements(StatementKind::Init).len(), 1);
  assert_eq!(recorder.roots().len(), 1);
}

#[test]
fn free_variables_become_surrogate_parameters() {
  let mut m = Module::new();
  let pred = m.declare(
    Decl::with_role("P", function_type(vec![integer_type()], boolean_type()), Role::State),
    Resolution::Immediate,
  );

  let binds = vec![Decl::new("x", integer_type())];
  let phi = forall(
    binds.clone(),
    crate::api::term::eventually(atom(pred.clone(), vec![variable("x")])),
  );

  let (mut stage, recorder) = stage_over_recorder();
  stage.state(phi, StatementKind::Requirement);

  let root = &recorder.roots()[0];
  let surr_entity = root.entity(&Label::indexed("xs", 1)).unwrap();
  let (params, range) = surr_entity.ty().as_function().map(|(p, r)| (p.to_vec(), r.clone())).unwrap();
  assert_eq!(params, vec![integer_type()]);
  assert!(range.is_boolean());

  // The fixpoint equations are universally closed over the free variable.
  for statement in recorder.statements(StatementKind::Transition) {
    assert!(statement.is_forall());
    assert_eq!(statement.binds().unwrap(), binds.as_slice());
  }
  let finals = recorder.statements(StatementKind::Final);
  assert!(finals[0].is_forall());
}

#[test]
fn tomorrow_over_an_object_becomes_a_step_copy() {
  let mut m = Module::new();
  let p = declared_bool(&mut m, "p");

  let (mut stage, recorder) = stage_over_recorder();
  stage.state(tomorrow(p.clone()), StatementKind::Requirement);

  let root = &recorder.roots()[0];
  let copy_name = Label::tuple([Label::name("xc"), Label::name("p")]);
  let copy = entity_object(root, &copy_name);
  let copy_prime = entity_object(root, &copy_name.primed());
  let anchor = entity_object(root, &"xs_phi".into());

  assert_eq!(
    recorder.statements(StatementKind::Transition),
    vec![equal(vec![copy.clone(), p.clone()]), equal(vec![anchor.clone(), copy_prime])]
  );
  assert_eq!(recorder.statements(StatementKind::Init), vec![anchor.clone()]);
  assert_eq!(recorder.statements(StatementKind::Final), vec![negation(anchor)]);

  // No surrogate predicate was introduced for the pushed-down step.
  assert!(root.entity(&Label::indexed("xs", 1)).is_none());
}

#[test]
fn arithmetic_steps_are_pushed_to_the_leaves() {
  let mut m = Module::new();
  let c = m.declare(
    Decl::with_role("c", integer_type(), Role::State),
    Resolution::Immediate,
  );

  let (mut stage, recorder) = stage_over_recorder();
  stage.state(less_than(tomorrow(c.clone()), integer(5)), StatementKind::Requirement);

  let root = &recorder.roots()[0];
  let copy_name = Label::tuple([Label::name("xc"), Label::name("c")]);
  let copy = entity_object(root, &copy_name);
  let copy_prime = entity_object(root, &copy_name.primed());
  let anchor = entity_object(root, &"xs_phi".into());

  assert_eq!(
    recorder.statements(StatementKind::Transition),
    vec![
      equal(vec![copy, c.clone()]),
      equal(vec![anchor, less_than(copy_prime, integer(5))]),
    ]
  );
}

#[test]
fn errors_suppress_all_emissions() {
  let (mut stage, recorder) = stage_over_recorder();

  stage.state(
    crate::api::term::eventually(error_term(boolean(true), "broken subterm")),
    StatementKind::Requirement,
  );

  assert_eq!(recorder.event_count(), 0);
}

#[test]
fn non_requirement_events_are_forwarded_and_adopts_absorbed() {
  let mut m = Module::new();
  let p = declared_bool(&mut m, "p");
  let root = p.as_object().unwrap().entity().unwrap().root().unwrap();

  let (mut stage, recorder) = stage_over_recorder();

  stage.adopt(root);
  assert_eq!(recorder.event_count(), 0);

  stage.push();
  stage.state(p.clone(), StatementKind::Init);
  stage.pop(1);

  let events = recorder.0.borrow();
  assert!(matches!(events.events[0], Event::Push));
  assert!(matches!(events.events[1], Event::State(_, StatementKind::Init)));
  assert!(matches!(events.events[2], Event::Pop(1)));
}
