/*!

`telos-lib` is a library for first-order linear temporal logic with past operators (FO-LTL+P),
used to express and solve satisfiability and reachability problems over symbolic transition
systems.

The crate is organized in three layers:

 * [`api`] is the user-facing surface: hash-consed [`Term`](api::term::Term)s and
   [`Type`](api::types::Type)s, the [`Consumer`](api::consumer::Consumer) streaming protocol,
   pipelines, term transforms, and the automaton encoder that rewrites a temporal requirement
   into initial/transition/final constraints over fresh surrogate predicates.
 * [`core`] is the machinery underneath: the hash-consing [`Alphabet`](core::alphabet::Alphabet)
   factory, the scoped [`Module`](core::module::Module) with two-phase name resolution and
   persistent frames, and shared formatting infrastructure.
 * [`smt`] is the bridge from resolved terms and state equations to an external solver oracle.

*/

pub mod api;
pub mod core;
pub mod smt;

/// Type of the structural hashes used by the hash-consing pools.
pub type HashType = u64;

/// Indentation width used by multi-line debug formatting.
pub(crate) const DISPLAY_INDENT: usize = 2;
