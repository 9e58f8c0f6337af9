/*!

Entities and the roots that own them.

A module never hands out owning references to what it declares. Instead, each call to
`resolve()`, or to `declare`/`define` with immediate resolution, collects the pending
declarations into one [`Root`], the sole owner of the resulting [`Entity`] group. Everything
else holds weak references: `Object` terms point at entities through
[`ObjectRef`](crate::api::term::ObjectRef)s, entities
point back at their root weakly, and scope maps store weak entries. A root that references
entities of *other* roots keeps those alive through its `dependencies` list, which is what makes
cyclic module graphs (recursive definitions) sound under plain reference counting.

*/

use std::{
  cell::{Cell, RefCell},
  rc::{Rc, Weak},
};

use crate::{
  api::{label::Label, term::Term, types::Type},
  core::format::{FormatStyle, Formattable},
  impl_display_debug_for_formattable,
};

/// The resolution behavior of declarations and definitions in a module: resolve on the spot, or
/// wait for the next call to `Module::resolve()`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Resolution {
  Delayed,
  Immediate,
}

/// The scope resolution mode for `Module::resolve()` and `Root::mode`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Recursion {
  #[default]
  Forbidden,
  Allowed,
}

/// Which role a declaration has in a module. `Rigid` entities are time-invariant; the other
/// roles partition the time-dependent signature of a symbolic transition system.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Role {
  #[default]
  Rigid,
  Input,
  State,
  Output,
}

/// The specification of an entity to be declared in a module.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Decl {
  pub name: Label,
  pub ty: Type,
  pub role: Role,
}

impl Decl {
  /// A declaration with the default role of `Role::Rigid`.
  pub fn new(name: impl Into<Label>, ty: Type) -> Decl {
    Decl { name: name.into(), ty, role: Role::default() }
  }

  pub fn with_role(name: impl Into<Label>, ty: Type, role: Role) -> Decl {
    Decl { name: name.into(), ty, role }
  }
}

/// The specification of an entity to be defined in a module.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Def {
  pub name: Label,
  pub ty: Type,
  pub value: Term,
}

impl Def {
  pub fn new(name: impl Into<Label>, ty: Type, value: Term) -> Def {
    Def { name: name.into(), ty, value }
  }

  /// A definition whose type is to be inferred from its value.
  pub fn inferred(name: impl Into<Label>, value: Term) -> Def {
    Def { name: name.into(), ty: crate::api::types::inferred_type(), value }
  }
}

/// The specification of a function to be defined in a module. Sugar: `Module::define_function`
/// wraps this into a `Lambda` value with a `Function` type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FunctionDef {
  pub name: Label,
  pub parameters: Vec<Decl>,
  pub range: Type,
  pub body: Term,
}

impl FunctionDef {
  pub fn new(name: impl Into<Label>, parameters: Vec<Decl>, range: Type, body: Term) -> Self {
    FunctionDef { name: name.into(), parameters, range, body }
  }

  /// A function definition whose range is to be inferred from the body.
  pub fn inferred(name: impl Into<Label>, parameters: Vec<Decl>, body: Term) -> Self {
    FunctionDef {
      name: name.into(),
      parameters,
      range: crate::api::types::inferred_type(),
      body,
    }
  }
}

/// An entity declared or defined in a module.
///
/// If `value` is absent the entity is a *declaration*, otherwise a *definition*. The `ty` and
/// `value` cells are written exactly once, during the resolution step that moves the entity
/// into its root; afterwards the entity is immutable.
pub struct Entity {
  pub name: Label,
  pub(crate) ty: RefCell<Type>,
  pub(crate) value: RefCell<Option<Term>>,
  pub role: Option<Role>,
  pub(crate) root: RefCell<Weak<Root>>,
}

impl Entity {
  pub(crate) fn from_decl(d: Decl) -> Rc<Entity> {
    Rc::new(Entity {
      name: d.name,
      ty: RefCell::new(d.ty),
      value: RefCell::new(None),
      role: Some(d.role),
      root: RefCell::new(Weak::new()),
    })
  }

  pub(crate) fn from_def(d: Def) -> Rc<Entity> {
    Rc::new(Entity {
      name: d.name,
      ty: RefCell::new(d.ty),
      value: RefCell::new(Some(d.value)),
      role: None,
      root: RefCell::new(Weak::new()),
    })
  }

  pub fn ty(&self) -> Type {
    self.ty.borrow().clone()
  }

  pub fn value(&self) -> Option<Term> {
    self.value.borrow().clone()
  }

  #[inline(always)]
  pub fn is_definition(&self) -> bool {
    self.value.borrow().is_some()
  }

  /// The root owning this entity. `None` before resolution or after the root is dropped.
  pub fn root(&self) -> Option<Rc<Root>> {
    self.root.borrow().upgrade()
  }
}

impl PartialEq for Entity {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
      && *self.ty.borrow() == *other.ty.borrow()
      && *self.value.borrow() == *other.value.borrow()
      && match (self.root(), other.root()) {
        (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
        (None, None) => true,
        _ => false,
      }
  }
}

impl Formattable for Entity {
  fn repr(&self, out: &mut dyn std::fmt::Write, style: FormatStyle) -> std::fmt::Result {
    self.name.repr(out, style)?;
    write!(out, ": {}", self.ty.borrow())?;
    if let Some(value) = &*self.value.borrow() {
      write!(out, " = ")?;
      value.repr(out, style)?;
    }
    Ok(())
  }
}

impl_display_debug_for_formattable!(Entity);

/// A structure collecting instances of [`Entity`] created together by one resolution step.
///
/// This is the root (hence the name) of ownership of entity objects: all other references to
/// them are weak. Roots live in module frames and keep the roots of everything their entities'
/// values reference alive through `dependencies`.
pub struct Root {
  pub(crate) mode: Cell<Recursion>,
  pub entities: Vec<Rc<Entity>>,
  pub(crate) dependencies: RefCell<Vec<Rc<Root>>>,
}

impl Root {
  /// Whether the entities collected by this root are defined recursively.
  pub fn mode(&self) -> Recursion {
    self.mode.get()
  }

  /// The roots owning the entities referenced by this root's definitions.
  pub fn dependencies(&self) -> Vec<Rc<Root>> {
    self.dependencies.borrow().clone()
  }

  /// The entity named `name`, if this root owns one.
  pub fn entity(&self, name: &Label) -> Option<&Rc<Entity>> {
    self.entities.iter().find(|e| &e.name == name)
  }
}

// Roots are identity values: two roots are the same root only when they are the same
// allocation. This is what frame equality and diff/replay compare.
impl PartialEq for Root {
  fn eq(&self, other: &Self) -> bool {
    std::ptr::eq(self, other)
  }
}

impl Eq for Root {}
