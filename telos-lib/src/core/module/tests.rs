use std::rc::Rc;

use super::*;
use crate::api::{
  consumer::{Recorder, StatementKind},
  semantics::type_of,
  term::{conjunction, integer, sum, variable, Term},
  types::{boolean_type, inferred_type, integer_type},
};
use crate::core::module::entity::{Decl, Def, FunctionDef, Recursion, Resolution, Role};

fn declared_type(m: &Module, name: &str) -> crate::api::types::Type {
  let obj = m.lookup(&name.into()).expect("name not in scope");
  type_of(&obj)
}

#[test]
fn module_equals_its_clone() {
  let mut m = Module::new();
  let p = m.declare(Decl::new("p", boolean_type()), Resolution::Immediate);
  m.require(p);

  let copy = m.clone();
  assert_eq!(m, copy);

  let mut edited = copy.clone();
  edited.require(crate::api::term::boolean(true));
  assert_ne!(m, edited);
}

#[test]
fn clone_does_not_carry_pending_entities() {
  let mut m = Module::new();
  m.declare(Decl::new("p", boolean_type()), Resolution::Delayed);
  assert!(m.has_pending());

  let mut copy = m.clone();
  assert!(!copy.has_pending());
  assert_eq!(copy.resolve(Recursion::Forbidden).entities.len(), 0);

  let root = m.resolve(Recursion::Forbidden);
  assert_eq!(root.entities.len(), 1);
}

#[test]
fn name_shadowing_follows_the_frame_stack() {
  let mut m = Module::new();
  m.declare(Decl::new("x", integer_type()), Resolution::Immediate);
  assert_eq!(declared_type(&m, "x"), integer_type());

  m.push();
  m.declare(Decl::new("x", boolean_type()), Resolution::Immediate);
  assert_eq!(declared_type(&m, "x"), boolean_type());

  m.pop(1);
  assert_eq!(declared_type(&m, "x"), integer_type());
}

#[test]
fn pop_restores_the_module_before_push() {
  let mut m = Module::new();
  m.declare(Decl::new("p", boolean_type()), Resolution::Immediate);
  let before = m.clone();

  m.push();
  m.state(crate::api::term::boolean(true), StatementKind::Init);
  assert_ne!(m, before);

  m.pop(1);
  assert_eq!(m, before);
}

#[test]
fn popping_past_the_bottom_resets_to_one_empty_frame() {
  let mut m = Module::new();
  m.declare(Decl::new("p", boolean_type()), Resolution::Immediate);
  m.push();
  m.pop(7);

  assert_eq!(m.depth(), 1);
  assert_eq!(m, Module::new());
}

#[test]
fn lookup_prefers_locals_then_recent_imports() {
  let mut exporter_a = Module::new();
  exporter_a.declare(Decl::new("x", integer_type()), Resolution::Immediate);

  let mut exporter_b = Module::new();
  exporter_b.declare(Decl::new("x", boolean_type()), Resolution::Immediate);

  let mut m = Module::new();
  m.import(exporter_a);
  m.import(exporter_b);

  // Most recently imported wins among imports.
  assert_eq!(declared_type(&m, "x"), boolean_type());

  // A local declaration shadows every import.
  m.declare(Decl::new("x", integer_type()), Resolution::Immediate);
  assert_eq!(declared_type(&m, "x"), integer_type());
}

#[test]
fn import_resolves_the_pending_entities_of_the_imported_module() {
  let mut exporter = Module::new();
  exporter.declare(Decl::new("y", integer_type()), Resolution::Delayed);

  let mut m = Module::new();
  m.import(exporter);

  assert!(m.lookup(&"y".into()).is_some());
}

#[test]
fn delayed_groups_resolve_forward_references_in_recursive_mode() {
  let mut m = Module::new();
  m.define(Def::new("f", integer_type(), sum(variable("g"), integer(1))), Resolution::Delayed);
  m.declare(Decl::new("g", integer_type()), Resolution::Delayed);

  let root = m.resolve(Recursion::Allowed);

  // The forward reference was found, so the group is recursive.
  assert_eq!(root.mode(), Recursion::Allowed);

  let f = root.entity(&"f".into()).unwrap();
  let value = f.value().unwrap();
  // `g` resolved to an object, not a variable.
  assert!(value.left().unwrap().is_object() || value.right().unwrap().is_object());
}

#[test]
fn non_recursive_groups_stay_forbidden() {
  let mut m = Module::new();
  m.declare(Decl::new("p", boolean_type()), Resolution::Delayed);
  m.declare(Decl::new("q", boolean_type()), Resolution::Delayed);

  let root = m.resolve(Recursion::Allowed);
  assert_eq!(root.mode(), Recursion::Forbidden);
  assert_eq!(root.entities.len(), 2);
}

#[test]
fn resolution_records_foreign_roots_as_dependencies() {
  let mut exporter = Module::new();
  let a = exporter.declare(Decl::new("a", integer_type()), Resolution::Immediate);
  let root_a = a.as_object().unwrap().entity().unwrap().root().unwrap();

  let mut m = Module::new();
  m.define(Def::new("b", integer_type(), sum(a, integer(1))), Resolution::Delayed);
  let root_b = m.resolve(Recursion::Forbidden);

  assert!(root_b.dependencies().iter().any(|d| Rc::ptr_eq(d, &root_a)));
}

#[test]
fn resolution_leaves_unknown_variables_alone() {
  let m = Module::new();
  let t = variable("unbound");
  assert_eq!(m.resolved(&t), t);
}

#[test]
fn resolved_respects_binders() {
  let mut m = Module::new();
  m.declare(Decl::new("x", integer_type()), Resolution::Immediate);

  // The bound `x` is hidden from resolution; the free `y` is left as a variable.
  let t = crate::api::term::exists(
    vec![Decl::new("x", integer_type())],
    crate::api::term::less_than(variable("x"), variable("y")),
  );
  let resolved = m.resolved(&t);

  let body = resolved.body().unwrap();
  assert!(body.left().unwrap().is_variable());
  assert!(body.right().unwrap().is_variable());

  // Outside the binder the same name resolves.
  assert!(m.resolved(&variable("x")).is_object());
}

#[test]
fn definition_types_are_inferred() {
  let mut m = Module::new();
  m.define(Def::inferred("c", integer(3)), Resolution::Immediate);
  assert_eq!(declared_type(&m, "c"), integer_type());
}

#[test]
fn function_ranges_are_inferred_from_the_body() {
  let mut m = Module::new();
  m.define_function(
    FunctionDef::inferred(
      "inc",
      vec![Decl::new("x", integer_type())],
      sum(variable("x"), integer(1)),
    ),
    Resolution::Immediate,
  );

  let ty = declared_type(&m, "inc");
  let (params, range) = ty.as_function().expect("inc should have function type");
  assert_eq!(params, &[integer_type()]);
  assert_eq!(*range, integer_type());
}

#[test]
fn recursive_definitions_are_not_inferred() {
  let mut m = Module::new();
  m.define(Def::new("f", inferred_type(), sum(variable("f"), integer(1))), Resolution::Delayed);

  let root = m.resolve(Recursion::Allowed);
  assert_eq!(root.mode(), Recursion::Allowed);

  let f = root.entity(&"f".into()).unwrap();
  assert!(f.ty().is_inferred());
  assert!(f.value().unwrap().is_error());
}

#[test]
fn resolution_is_deterministic() {
  let build = || {
    let mut m = Module::new();
    m.declare(Decl::with_role("s", boolean_type(), Role::State), Resolution::Delayed);
    m.define(Def::inferred("c", integer(7)), Resolution::Delayed);
    m.resolve(Recursion::Forbidden)
  };

  let (a, b) = (build(), build());
  assert_eq!(a.mode(), b.mode());
  assert_eq!(a.entities.len(), b.entities.len());
  for (x, y) in a.entities.iter().zip(b.entities.iter()) {
    assert_eq!(x.name, y.name);
    assert_eq!(x.ty(), y.ty());
    assert_eq!(x.role, y.role);
  }
}

#[test]
fn dangling_objects_surface_as_error_values() {
  let orphan: Term = {
    let mut m = Module::new();
    m.declare(Decl::new("p", boolean_type()), Resolution::Immediate)
    // `m` and the root owning `p` die here.
  };

  assert!(orphan.as_object().unwrap().entity().is_none());
  assert!(type_of(&orphan).is_error());
}

// region Replay

#[test]
fn replay_from_empty_rebuilds_the_module() {
  let mut m = Module::new();
  let p = m.declare(Decl::new("p", boolean_type()), Resolution::Immediate);
  let q = m.declare(Decl::new("q", boolean_type()), Resolution::Immediate);
  m.require(conjunction(vec![p, q]));
  m.push();
  let r = m.declare(Decl::new("r", boolean_type()), Resolution::Immediate);
  m.require(r);

  let mut target = Module::new();
  m.replay(&Module::new(), &mut target);

  assert_eq!(target, m);
}

#[test]
fn replay_from_a_prefix_appends_only_the_tail() {
  let mut from = Module::new();
  from.declare(Decl::new("p", boolean_type()), Resolution::Immediate);

  let mut m = from.clone();
  m.require(crate::api::term::boolean(true));
  m.push();
  m.declare(Decl::new("q", boolean_type()), Resolution::Immediate);

  let mut replayer = from.clone();
  m.replay(&from, &mut replayer);
  assert_eq!(replayer, m);

  // The tail really was a tail: no pops were needed.
  let mut recorder = Recorder::new();
  m.replay(&from, &mut recorder);
  assert!(!recorder.events.iter().any(|e| matches!(e, crate::api::consumer::Event::Pop(_))));
}

#[test]
fn replay_between_equal_modules_is_a_no_op() {
  let mut m = Module::new();
  m.declare(Decl::new("p", boolean_type()), Resolution::Immediate);
  m.push();
  m.require(crate::api::term::boolean(true));

  let mut recorder = Recorder::new();
  m.replay(&m.clone(), &mut recorder);
  assert!(recorder.events.is_empty());

  let mut replayer = m.clone();
  m.replay(&m.clone(), &mut replayer);
  assert_eq!(replayer, m);
}

#[test]
fn replay_pops_frames_the_source_has_and_the_target_lacks() {
  let mut m = Module::new();
  m.declare(Decl::new("p", boolean_type()), Resolution::Immediate);

  let mut from = m.clone();
  from.push();
  from.require(crate::api::term::boolean(true));
  from.push();

  let mut replayer = from.clone();
  m.replay(&from, &mut replayer);
  assert_eq!(replayer, m);
}

#[test]
fn replay_rebuilds_a_diverged_top_frame() {
  let mut common = Module::new();
  common.declare(Decl::new("p", boolean_type()), Resolution::Immediate);
  common.push();

  let mut from = common.clone();
  from.require(crate::api::term::boolean(false));

  let mut m = common.clone();
  m.require(crate::api::term::boolean(true));
  m.declare(Decl::new("q", boolean_type()), Resolution::Immediate);

  let mut replayer = from.clone();
  m.replay(&from, &mut replayer);
  assert_eq!(replayer, m);
}

#[test]
fn replay_survives_divergence_at_the_bottom_frame() {
  let mut from = Module::new();
  from.require(crate::api::term::boolean(false));

  let mut m = Module::new();
  m.declare(Decl::new("p", boolean_type()), Resolution::Immediate);
  m.push();
  m.require(crate::api::term::boolean(true));

  let mut replayer = from.clone();
  m.replay(&from, &mut replayer);
  assert_eq!(replayer, m);
}

#[test]
fn replayed_operations_commute_with_fresh_operations() {
  let mut m = Module::new();
  m.declare(Decl::new("p", boolean_type()), Resolution::Immediate);

  let apply = |module: &mut Module| {
    module.push();
    module.state(crate::api::term::boolean(true), StatementKind::Init);
  };

  let mut expected = m.clone();
  apply(&mut expected);

  let mut target = Module::new();
  m.replay(&Module::new(), &mut target);
  apply(&mut target);

  assert_eq!(target, expected);
}

#[test]
fn replay_round_trips_from_random_divergence_points() {
  use rand::{rngs::StdRng, Rng, SeedableRng};

  let mut rng = StdRng::seed_from_u64(0xB1AC);

  for round in 0..32 {
    let mut m = Module::new();
    let mut snapshot = None;

    let ops = rng.gen_range(3..12);
    for i in 0..ops {
      match rng.gen_range(0..4) {
        0 => {
          m.declare(Decl::new(format!("v{}_{}", round, i), integer_type()), Resolution::Immediate);
        }
        1 => m.push(),
        2 => m.pop(1),
        _ => m.state(crate::api::term::boolean(rng.gen_bool(0.5)), StatementKind::Requirement),
      }
      if snapshot.is_none() && rng.gen_bool(0.3) {
        snapshot = Some(m.clone());
      }
    }

    // `from` is an arbitrary earlier point of the history, possibly diverged from by pops.
    let from = snapshot.unwrap_or_else(Module::new);
    let mut replayer = from.clone();
    m.replay(&from, &mut replayer);
    assert_eq!(replayer, m);
  }
}

// endregion

#[test]
fn statement_sugar_tags_the_right_kinds() {
  let mut m = Module::new();
  let t = crate::api::term::boolean(true);
  m.require(t.clone());
  m.init(t.clone());
  m.transition(t.clone());
  m.final_(t.clone());

  let mut recorder = Recorder::new();
  m.replay(&Module::new(), &mut recorder);

  for kind in [
    StatementKind::Requirement,
    StatementKind::Init,
    StatementKind::Transition,
    StatementKind::Final,
  ] {
    assert_eq!(recorder.statements(kind), vec![t.clone()]);
  }
}
