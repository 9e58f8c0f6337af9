/*!

The scoped symbol table at the heart of the system.

A `Module` is a stack of frames plus a separate list of *pending* entities awaiting resolution.
Each frame holds the modules imported at that level, the roots adopted there, a scope map from
names to entities for lookup, and the statements made at that level. A bottom frame is always
present; popping past the bottom resets the module to a single empty frame.

Modules are value types. Thanks to the structurally shared containers underneath, copying one is
O(1), equality against a copy short-circuits on storage identity, and `replay` can find the
longest common frame prefix of two related modules cheaply. Pending entities are deliberately
**not** carried by copies: a pending declaration belongs to the module that made it until it is
resolved.

## Two-phase resolution

`declare`/`define` with `Resolution::Immediate` resolve on the spot as a one-entity group.
`Resolution::Delayed` queues the entity; the next `resolve()` call collects everything pending
into a fresh [`Root`], rewrites the definitions' values (turning in-scope variables into
objects), infers missing types, records which foreign roots the group depends on, and adopts the
root into the current frame. Delayed groups may reference each other freely, and with
`Recursion::Allowed` the group is made visible to itself before the rewrite, so recursive
definitions resolve without the user having to say so; the root is then marked recursive if any
self-reference was in fact found.

*/

pub mod entity;

use std::rc::Rc;

use telos_abs::{join_string, HashSet, PMap, PSet, PVec};

use crate::{
  api::{
    consumer::{Consumer, StatementKind},
    label::Label,
    semantics::type_of,
    term::{error_term, lambda, map_children, object, ObjectRef, Term, TermView},
    types::function_type,
  },
  core::module::entity::{Decl, Def, Entity, FunctionDef, Recursion, Resolution, Root},
};

// region Frame

#[derive(Clone, Default)]
pub(crate) struct Frame {
  pub(crate) imports: PVec<Module>,
  pub(crate) roots: PVec<Rc<Root>>,
  pub(crate) scope: PMap<Label, ObjectRef>,
  pub(crate) statements: PVec<(Term, StatementKind)>,
}

impl PartialEq for Frame {
  fn eq(&self, other: &Self) -> bool {
    self.imports == other.imports
      && self.roots == other.roots
      && self.statements == other.statements
      && self.scope == other.scope
  }
}

impl Eq for Frame {}

// endregion

/// A scoped symbol table with two-phase name resolution, a push/pop frame stack, and cheap
/// copy/diff/replay. See the module level documentation.
pub struct Module {
  stack: PVec<Frame>,
  pending: Vec<Rc<Entity>>,
}

impl Module {
  pub fn new() -> Module {
    Module { stack: vec![Frame::default()].into(), pending: Vec::new() }
  }

  fn update_top<F: FnOnce(&mut Frame)>(&mut self, f: F) {
    let top = self.stack.len() - 1;
    self.stack.update(top, f);
  }

  /// The number of frames on the stack. At least 1.
  pub fn depth(&self) -> usize {
    self.stack.len()
  }

  /// Whether any declarations or definitions are awaiting resolution.
  pub fn has_pending(&self) -> bool {
    !self.pending.is_empty()
  }

  // region Declarations and definitions

  /// Creates an entity from `d` with no value and returns an object referring to it. With
  /// `Resolution::Immediate` the entity is resolved now as a one-entity group; with
  /// `Resolution::Delayed` it joins the pending list until the next `resolve()`.
  pub fn declare(&mut self, d: Decl, r: Resolution) -> Term {
    let e = Entity::from_decl(d);
    let obj = object(&e);
    match r {
      Resolution::Immediate => {
        self.resolve_group(Recursion::Forbidden, vec![e]);
      }
      Resolution::Delayed => self.pending.push(e),
    }
    obj
  }

  /// Creates an entity from `d` with a defining value. Resolution behaves as in [`declare`].
  ///
  /// [`declare`]: Module::declare
  pub fn define(&mut self, d: Def, r: Resolution) -> Term {
    let e = Entity::from_def(d);
    let obj = object(&e);
    match r {
      Resolution::Immediate => {
        self.resolve_group(Recursion::Forbidden, vec![e]);
      }
      Resolution::Delayed => self.pending.push(e),
    }
    obj
  }

  /// Sugar: wraps a function definition into a `Lambda` value with a `Function` type and
  /// delegates to [`define`](Module::define).
  pub fn define_function(&mut self, f: FunctionDef, r: Resolution) -> Term {
    let parameter_types = f.parameters.iter().map(|d| d.ty.clone()).collect();
    let ty = function_type(parameter_types, f.range);
    let body = lambda(f.parameters, f.body);
    self.define(Def::new(f.name, ty, body), r)
  }

  // endregion

  // region Imports, adoption, lookup

  /// Imports `m`: any pending entities of `m` are resolved first, then `m` joins the current
  /// frame's import list. Lookup consults imports after the local scopes.
  pub fn import(&mut self, mut m: Module) {
    m.resolve(Recursion::Forbidden);
    self.update_top(|top| top.imports.push(m));
  }

  /// Adopts a root into the current frame: the root joins the frame's root list and each of its
  /// entities becomes visible in the frame's scope, shadowing earlier entries with the same
  /// name.
  pub fn adopt(&mut self, root: Rc<Root>) {
    self.update_top(|top| {
      for e in &root.entities {
        top.scope.insert(e.name.clone(), ObjectRef(Rc::downgrade(e)));
      }
      top.roots.push(root);
    });
  }

  /// Finds the entity `name` resolves to, searching every frame's scope from the top down and
  /// then every frame's imports, most recently imported first. Returns an object term.
  pub fn lookup(&self, name: &Label) -> Option<Term> {
    for frame in self.stack.iter().rev() {
      if let Some(entry) = frame.scope.get(name) {
        if let Some(e) = entry.entity() {
          return Some(object(&e));
        }
      }
    }

    for frame in self.stack.iter().rev() {
      for imported in frame.imports.iter().rev() {
        if let Some(found) = imported.lookup(name) {
          return Some(found);
        }
      }
    }

    None
  }

  // endregion

  // region Statements and the frame stack

  /// Appends `(t, kind)` to the current frame's statement list.
  pub fn state(&mut self, t: Term, kind: StatementKind) {
    self.update_top(|top| top.statements.push((t, kind)));
  }

  /// Sugar for `state(t, StatementKind::Requirement)`.
  pub fn require(&mut self, t: Term) {
    self.state(t, StatementKind::Requirement);
  }

  /// Sugar for `state(t, StatementKind::Init)`.
  pub fn init(&mut self, t: Term) {
    self.state(t, StatementKind::Init);
  }

  /// Sugar for `state(t, StatementKind::Transition)`.
  pub fn transition(&mut self, t: Term) {
    self.state(t, StatementKind::Transition);
  }

  /// Sugar for `state(t, StatementKind::Final)`.
  pub fn final_(&mut self, t: Term) {
    self.state(t, StatementKind::Final);
  }

  /// Appends a fresh empty frame.
  pub fn push(&mut self) {
    self.stack.push(Frame::default());
  }

  /// Removes the top `n` frames. Popping past the bottom resets the module to a single empty
  /// frame. Pending entities are untouched.
  pub fn pop(&mut self, n: usize) {
    let remaining = self.stack.len().saturating_sub(n);
    self.stack.truncate(remaining);
    if self.stack.is_empty() {
      self.stack.push(Frame::default());
    }
  }

  // endregion

  // region Resolution

  /// Resolves the pending entities as one group and adopts the resulting root into the current
  /// frame. With `Recursion::Allowed` the group is visible to itself during resolution, so its
  /// definitions may reference each other; the returned root is marked recursive only if such a
  /// self-reference was actually found.
  pub fn resolve(&mut self, r: Recursion) -> Rc<Root> {
    if self.pending.is_empty() {
      // Nothing to do; hand back an empty root rather than polluting the frame with one.
      return Rc::new(Root {
        mode: std::cell::Cell::new(Recursion::Forbidden),
        entities: Vec::new(),
        dependencies: std::cell::RefCell::new(Vec::new()),
      });
    }

    let pending = std::mem::take(&mut self.pending);
    self.resolve_group(r, pending)
  }

  fn resolve_group(&mut self, r: Recursion, pending: Vec<Rc<Entity>>) -> Rc<Root> {
    let names: HashSet<Label> = pending.iter().map(|e| e.name.clone()).collect();

    let root = Rc::new(Root {
      mode: std::cell::Cell::new(Recursion::Forbidden),
      entities: pending,
      dependencies: std::cell::RefCell::new(Vec::new()),
    });
    for e in &root.entities {
      *e.root.borrow_mut() = Rc::downgrade(&root);
    }

    // In recursive mode the root is adopted up front so the pending names are visible to each
    // other. The root's own mode is corrected at the end if recursion was in fact used.
    if r == Recursion::Allowed {
      self.adopt(root.clone());
    }

    let mut mode = Recursion::Forbidden;
    let mut deps: Vec<Rc<Root>> = Vec::new();

    for e in &root.entities {
      let value = e.value();
      if let Some(value) = value {
        let resolved =
          self.resolve_term(&value, &names, &mut mode, Some(&root), &mut deps, &PSet::new());
        *e.value.borrow_mut() = Some(resolved);
      }
    }

    if mode == Recursion::Forbidden {
      for e in &root.entities {
        if e.is_definition() {
          self.infer(e, &root, &mut deps);
        }
      }
    } else {
      // Recursive groups are not type-inferred: their declared types must be explicit. An
      // entity that would have needed inference keeps its declared type and gets an error
      // marker on its value.
      for e in &root.entities {
        let ty = e.ty();
        let needs_inference =
          ty.is_inferred() || ty.as_function().map_or(false, |(_, range)| range.is_inferred());
        if needs_inference {
          if let Some(value) = e.value() {
            *e.value.borrow_mut() = Some(error_term(
              value,
              "type inference is not available for recursive definitions",
            ));
          }
        }
      }
    }

    *root.dependencies.borrow_mut() = deps;

    if mode == Recursion::Allowed {
      root.mode.set(Recursion::Allowed);
    }
    if r != Recursion::Allowed {
      self.adopt(root.clone());
    }

    root
  }

  /// The name resolution rewrite on terms, without touching the module: in-scope variables
  /// become objects, binder-bound variables are left alone, everything else is rebuilt
  /// structurally.
  pub fn resolved(&self, t: &Term) -> Term {
    let mut mode = Recursion::Forbidden;
    let mut deps = Vec::new();
    self.resolve_term(t, &HashSet::new(), &mut mode, None, &mut deps, &PSet::new())
  }

  /// Main recursive implementation of name resolution in terms. As a secondary outcome, `mode`
  /// is set to `Recursion::Allowed` if any variable from `names` is mentioned outside a binder,
  /// and every foreign root referenced by an object is recorded in `deps`.
  fn resolve_term(
    &self,
    t: &Term,
    names: &HashSet<Label>,
    mode: &mut Recursion,
    ours: Option<&Rc<Root>>,
    deps: &mut Vec<Rc<Root>>,
    hidden: &PSet<Label>,
  ) -> Term {
    use TermView as V;

    match t.view() {
      V::Error { .. } | V::Integer(_) | V::Real(_) | V::Boolean(_) => t.clone(),

      V::Object(entry) => {
        if let Some(r) = entry.entity().and_then(|e| e.root()) {
          let foreign = ours.map_or(true, |o| !Rc::ptr_eq(o, &r));
          if foreign && !deps.iter().any(|d| Rc::ptr_eq(d, &r)) {
            deps.push(r);
          }
        }
        t.clone()
      }

      V::Variable(x) => {
        if hidden.contains(x) {
          return t.clone();
        }
        if names.contains(x) {
          *mode = Recursion::Allowed;
        }
        match self.lookup(x) {
          Some(obj) => obj,
          None => t.clone(),
        }
      }

      V::Exists { binds, body } | V::Forall { binds, body } | V::Lambda { vars: binds, body } => {
        let nested = hidden.extended(binds.iter().map(|d| d.name.clone()));
        let resolved_body = self.resolve_term(body, names, mode, ours, deps, &nested);
        match t.view() {
          V::Exists { .. } => crate::api::term::exists(binds.to_vec(), resolved_body),
          V::Forall { .. } => crate::api::term::forall(binds.to_vec(), resolved_body),
          _ => lambda(binds.to_vec(), resolved_body),
        }
      }

      _ => map_children(t, &mut |child| {
        self.resolve_term(child, names, mode, ours, deps, hidden)
      }),
    }
  }

  /// Type inference for a resolved definition, per the declared type:
  ///  * `Inferred`: the type becomes `type_of` of the resolved value;
  ///  * `Function` with an `Inferred` range and a `Lambda` value: the range is derived from
  ///    the body under a scope declaring the lambda's parameters;
  ///  * anything else is left as declared.
  fn infer(&self, e: &Rc<Entity>, ours: &Rc<Root>, deps: &mut Vec<Rc<Root>>) {
    let ty = e.ty();

    if ty.is_inferred() {
      if let Some(value) = e.value() {
        let inferred = type_of(&value);
        *e.ty.borrow_mut() = inferred;
      }
      return;
    }

    let Some((parameters, range)) = ty.as_function() else {
      return;
    };
    if !range.is_inferred() {
      return;
    }
    let Some(value) = e.value() else {
      return;
    };

    let new_ty = if let TermView::Lambda { vars, body } = value.view() {
      let mut nested = self.clone();
      for d in vars {
        nested.declare(d.clone(), Resolution::Immediate);
      }
      let mut mode = Recursion::Forbidden;
      let resolved_body =
        nested.resolve_term(body, &HashSet::new(), &mut mode, Some(ours), deps, &PSet::new());
      function_type(parameters.to_vec(), type_of(&resolved_body))
    } else {
      return;
    };

    *e.ty.borrow_mut() = new_ty;
  }

  // endregion

  // region Diff and replay

  /// Emits onto `target` the consumer calls that turn a copy of `from` into `self`:
  ///
  ///  1. the longest common frame prefix of the two stacks is found (cheap, thanks to the
  ///     pointer fast path of the persistent containers);
  ///  2. the extra frames of `from` are popped;
  ///  3. if both stacks own a differing frame right above the common prefix, the frame pair is
  ///     diffed: when `from`'s frame is a prefix of ours item-wise, only the tails are
  ///     replayed, otherwise the frame is popped and re-emitted whole;
  ///  4. every remaining frame of `self` is pushed and replayed in order.
  pub fn replay(&self, from: &Module, target: &mut dyn Consumer) {
    let ours = &self.stack;
    let theirs = &from.stack;

    // The index of the first frame where the stacks disagree.
    let common = ours
        .iter()
        .zip(theirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let extra = theirs.len() - common;
    if extra > 1 {
      target.pop(extra - 1);
    }

    if common == ours.len() {
      // `self` is a prefix of `from` (or they are equal): drop what is left and stop.
      if extra >= 1 {
        target.pop(1);
      }
      return;
    }

    let mut start = common;
    if common < theirs.len() {
      // Both stacks own a frame at `common` and the frames differ.
      if let Some(tail) = frame_diff(&theirs[common], &ours[common]) {
        replay_frame(&tail, target);
        start = common + 1;
      } else {
        target.pop(1);
        if common == 0 {
          // The popped frame was the bottom; the reset bottom stands in for it.
          replay_frame(&ours[0], target);
          start = 1;
        }
      }
    }

    for i in start..ours.len() {
      target.push();
      replay_frame(&ours[i], target);
    }
  }

  // endregion
}

/// The item-wise difference `outer - inner`, if `inner`'s imports, roots, and statements are
/// each a prefix of `outer`'s. The scope map is derived from the roots and is not diffed.
fn frame_diff(inner: &Frame, outer: &Frame) -> Option<Frame> {
  if inner.imports.len() > outer.imports.len()
    || inner.roots.len() > outer.roots.len()
    || inner.statements.len() > outer.statements.len()
  {
    return None;
  }

  let prefix_eq = |len: usize, eq: &dyn Fn(usize) -> bool| (0..len).all(eq);

  if !prefix_eq(inner.imports.len(), &|i| inner.imports[i] == outer.imports[i])
    || !prefix_eq(inner.roots.len(), &|i| Rc::ptr_eq(&inner.roots[i], &outer.roots[i]))
    || !prefix_eq(inner.statements.len(), &|i| inner.statements[i] == outer.statements[i])
  {
    return None;
  }

  let mut tail = Frame::default();
  for i in inner.imports.len()..outer.imports.len() {
    tail.imports.push(outer.imports[i].clone());
  }
  for i in inner.roots.len()..outer.roots.len() {
    tail.roots.push(outer.roots[i].clone());
  }
  for i in inner.statements.len()..outer.statements.len() {
    tail.statements.push(outer.statements[i].clone());
  }

  Some(tail)
}

fn replay_frame(frame: &Frame, target: &mut dyn Consumer) {
  for imported in frame.imports.iter() {
    target.import(imported.clone());
  }
  for root in frame.roots.iter() {
    target.adopt(root.clone());
  }
  for (t, kind) in frame.statements.iter() {
    target.state(t.clone(), *kind);
  }
}

impl Default for Module {
  fn default() -> Self {
    Module::new()
  }
}

// Copies are cheap and share the frame stack. Pending entities are not carried by copies.
impl Clone for Module {
  fn clone(&self) -> Self {
    Module { stack: self.stack.clone(), pending: Vec::new() }
  }
}

// Structural equality: the same stack of equal frames, ignoring pending entities.
impl PartialEq for Module {
  fn eq(&self, other: &Self) -> bool {
    self.stack == other.stack
  }
}

impl Eq for Module {}

impl Consumer for Module {
  fn import(&mut self, module: Module) {
    Module::import(self, module);
  }

  fn adopt(&mut self, root: Rc<Root>) {
    Module::adopt(self, root);
  }

  fn state(&mut self, term: Term, kind: StatementKind) {
    Module::state(self, term, kind);
  }

  fn push(&mut self) {
    Module::push(self);
  }

  fn pop(&mut self, count: usize) {
    Module::pop(self, count);
  }
}

impl std::fmt::Debug for Module {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let tab = " ".repeat(crate::DISPLAY_INDENT);
    writeln!(f, "Module {{")?;
    for (level, frame) in self.stack.iter().enumerate() {
      writeln!(f, "{}frame {}:", tab, level)?;
      if !frame.imports.is_empty() {
        writeln!(f, "{}{}imports: {}", tab, tab, frame.imports.len())?;
      }
      for root in frame.roots.iter() {
        let names = join_string(root.entities.iter().map(|e| e.name.clone()), ", ");
        writeln!(f, "{}{}root [{}] ({:?})", tab, tab, names, root.mode())?;
      }
      for (t, kind) in frame.statements.iter() {
        writeln!(f, "{}{}{:?}: {}", tab, tab, kind, t)?;
      }
    }
    write!(f, "}}")
  }
}

#[cfg(test)]
mod tests;
