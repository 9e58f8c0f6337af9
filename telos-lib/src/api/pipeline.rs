/*!

Pipelines of consumer stages.

A *stage* is a consumer that wraps a downstream consumer: it receives events, transforms them
(or not), and forwards the result. A [`Pipeline`] is a list of stage constructors threaded onto a
terminal sink, right to left, so that

```ignore
Pipeline::new().then(automaton()).connect(sink)
```

builds the automaton stage with `sink` as its downstream and hands back a single consumer for
the whole chain.

*/

use crate::api::consumer::Consumer;

/// A stage constructor: consumes its configuration and wraps the downstream consumer.
pub trait Stage {
  fn instantiate(self: Box<Self>, next: Box<dyn Consumer>) -> Box<dyn Consumer>;
}

/// A chain of stages awaiting a terminal sink.
#[derive(Default)]
pub struct Pipeline {
  stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
  pub fn new() -> Pipeline {
    Pipeline { stages: Vec::new() }
  }

  /// Appends a stage to the downstream end of the chain.
  pub fn then(mut self, stage: Box<dyn Stage>) -> Pipeline {
    self.stages.push(stage);
    self
  }

  /// Threads the chain onto `sink` and returns the upstream end.
  pub fn connect(self, sink: Box<dyn Consumer>) -> Box<dyn Consumer> {
    self
        .stages
        .into_iter()
        .rev()
        .fold(sink, |next, stage| stage.instantiate(next))
  }
}

/// The identity stage: forwards every event unchanged. Occasionally useful to keep a pipeline
/// shape uniform.
pub struct Forward;

impl Stage for Forward {
  fn instantiate(self: Box<Self>, next: Box<dyn Consumer>) -> Box<dyn Consumer> {
    Box::new(ForwardConsumer { next })
  }
}

struct ForwardConsumer {
  next: Box<dyn Consumer>,
}

impl Consumer for ForwardConsumer {
  fn import(&mut self, module: crate::core::module::Module) {
    self.next.import(module);
  }

  fn adopt(&mut self, root: std::rc::Rc<crate::core::module::entity::Root>) {
    self.next.adopt(root);
  }

  fn state(&mut self, term: crate::api::term::Term, kind: crate::api::consumer::StatementKind) {
    self.next.state(term, kind);
  }

  fn push(&mut self) {
    self.next.push();
  }

  fn pop(&mut self, count: usize) {
    self.next.pop(count);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::consumer::{Recorder, StatementKind};
  use crate::api::term::proposition;

  #[test]
  fn forward_stage_preserves_order() {
    let mut chain =
      Pipeline::new().then(Box::new(Forward)).then(Box::new(Forward)).connect(Box::new(
        Recorder::new(),
      ));

    chain.push();
    chain.state(proposition("p"), StatementKind::Requirement);
    chain.pop(1);
  }

  #[test]
  fn events_reach_the_sink() {
    // A recorder boxed behind the chain is consumed by `connect`, so observe through a stage
    // that counts instead.
    struct Counter {
      seen: std::rc::Rc<std::cell::Cell<usize>>,
      next: Box<dyn Consumer>,
    }

    impl Consumer for Counter {
      fn import(&mut self, module: crate::core::module::Module) {
        self.seen.set(self.seen.get() + 1);
        self.next.import(module);
      }
      fn adopt(&mut self, root: std::rc::Rc<crate::core::module::entity::Root>) {
        self.seen.set(self.seen.get() + 1);
        self.next.adopt(root);
      }
      fn state(&mut self, term: crate::api::term::Term, kind: StatementKind) {
        self.seen.set(self.seen.get() + 1);
        self.next.state(term, kind);
      }
      fn push(&mut self) {
        self.seen.set(self.seen.get() + 1);
        self.next.push();
      }
      fn pop(&mut self, count: usize) {
        self.seen.set(self.seen.get() + 1);
        self.next.pop(count);
      }
    }

    struct CounterStage {
      seen: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl Stage for CounterStage {
      fn instantiate(self: Box<Self>, next: Box<dyn Consumer>) -> Box<dyn Consumer> {
        Box::new(Counter { seen: self.seen, next })
      }
    }

    let seen = std::rc::Rc::new(std::cell::Cell::new(0));
    let mut chain = Pipeline::new()
        .then(Box::new(CounterStage { seen: seen.clone() }))
        .connect(Box::new(Recorder::new()));

    chain.push();
    chain.state(proposition("p"), StatementKind::Init);
    chain.pop(1);

    assert_eq!(seen.get(), 3);
  }
}
