/*!

The user-facing surface of the library.

Terms and types are built through the free constructor functions in [`term`] and [`types`]
(backed by the thread's hash-consing [`alphabet`](crate::core::alphabet::alphabet)), registered
in a [`Module`](crate::core::module::Module), and piped through a chain of
[`Consumer`](consumer::Consumer) stages, typically ending in the [`automaton`] encoder and an
[`SmtBridge`](crate::smt::SmtBridge).

*/

pub mod automaton;
pub mod consumer;
pub mod fragment;
pub mod label;
pub mod pipeline;
pub mod semantics;
pub mod term;
pub mod transforms;
pub mod types;

pub use consumer::{Consumer, StatementKind};
pub use fragment::{Fragment, TermTag};
pub use label::Label;
pub use semantics::{free_vars, type_of};
pub use term::{Term, TermView};
pub use transforms::{future_to_past, push_negation, to_nnf};
pub use types::{Type, TypeView};

pub use crate::core::alphabet::{alphabet, Alphabet};
pub use crate::core::module::{
  entity::{Decl, Def, Entity, FunctionDef, Recursion, Resolution, Role, Root},
  Module,
};
