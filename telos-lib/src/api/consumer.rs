/*!

The streaming protocol between modules, pipeline stages, and solver back-ends.

A `Consumer` is a sink for the five events a module can replay: importing another module,
adopting a root of resolved entities, stating a term with a statement kind, and pushing/popping
scope frames. [`Module`](crate::core::module::Module) is itself a consumer, which is what makes
`Module::replay` work: the difference between two modules is expressed as a sequence of consumer
calls that any sink can receive: another module, a transformation stage, or an SMT bridge.

Calls are totally ordered per pipeline, and stages must forward events in the order they receive
them.

*/

use std::rc::Rc;

use crate::{
  api::term::Term,
  core::module::{entity::Root, Module},
};

/// Kinds of statements that can be given to `Module::state()` and `Consumer::state()`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum StatementKind {
  /// A requirement to hold over the whole execution.
  Requirement,
  /// A constraint on the initial state.
  Init,
  /// A constraint on the transition relation.
  Transition,
  /// A constraint on the final state.
  Final,
}

pub trait Consumer {
  fn import(&mut self, module: Module);

  fn adopt(&mut self, root: Rc<Root>);

  fn state(&mut self, term: Term, kind: StatementKind);

  fn push(&mut self);

  fn pop(&mut self, count: usize);
}

/// A consumer that records every event it receives, in order. Useful as a pipeline sink in
/// tests and diagnostics.
#[derive(Default)]
pub struct Recorder {
  pub events: Vec<Event>,
}

#[derive(Clone)]
pub enum Event {
  Import(Module),
  Adopt(Rc<Root>),
  State(Term, StatementKind),
  Push,
  Pop(usize),
}

impl Recorder {
  pub fn new() -> Recorder {
    Recorder::default()
  }

  /// The recorded `state` events of the given kind, in order.
  pub fn statements(&self, kind: StatementKind) -> Vec<Term> {
    self
        .events
        .iter()
        .filter_map(|event| match event {
          Event::State(term, k) if *k == kind => Some(term.clone()),
          _ => None,
        })
        .collect()
  }

  /// The adopted roots, in order.
  pub fn roots(&self) -> Vec<Rc<Root>> {
    self
        .events
        .iter()
        .filter_map(|event| match event {
          Event::Adopt(root) => Some(root.clone()),
          _ => None,
        })
        .collect()
  }
}

impl Consumer for Recorder {
  fn import(&mut self, module: Module) {
    self.events.push(Event::Import(module));
  }

  fn adopt(&mut self, root: Rc<Root>) {
    self.events.push(Event::Adopt(root));
  }

  fn state(&mut self, term: Term, kind: StatementKind) {
    self.events.push(Event::State(term, kind));
  }

  fn push(&mut self) {
    self.events.push(Event::Push);
  }

  fn pop(&mut self, count: usize) {
    self.events.push(Event::Pop(count));
  }
}
