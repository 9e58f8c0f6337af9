/*!

Types/type aliases that abstract over the implementing backing type.

# Background and Motivation

A motivating example is the `IString` type, an interned string type. A number of external crates
could provide this functionality. This crate redirects to whatever chosen implementation we want.
To use the [`string_cache` crate](https://crates.io/crates/string_cache), we just define `IString`
as an alias for `string_cache::DefaultAtom`:

```ignore
pub use string_cache::DefaultAtom as IString;
```

For infrastructure with very different backing implementations, we define an abstraction layer
over the implementation. For example, the `log` module could use any of a number of logging
frameworks for its implementation, but its public interface consists only of
`set_global_logging_threshold()`/`get_global_logging_threshold()` and the macros `critical!`,
`error!`, `warning!`, `info!`, `debug!`, and `trace!`. The backing implementation (the `tracing`
ecosystem) is encapsulated in the `log` module.

The `persistent` module plays the same role for structurally shared containers: the rest of the
project manipulates `PVec`/`PMap`/`PSet` and does not care how sharing is achieved.

*/

mod rccell;
mod string_util;

pub mod log;
pub mod persistent;

// region Hashing data structures
pub use std::collections::{HashMap, HashSet};

// For vectors that are expected to have few or zero elements.
pub use smallvec::{smallvec, SmallVec};
// endregion

// Logging
pub use tracing;

// Interned string. `DefaultAtom` is a global cache that can be used across threads.
pub use string_cache::DefaultAtom as IString;

// Reference counted cells with shared mutable state, and complementary weak pointers.
pub use rccell::{RcCell, WeakCell};

// Join sequences with a separator; render small integers as subscripts.
pub use string_util::{int_to_subscript, join_string};

// Structurally shared containers.
pub use persistent::{PMap, PSet, PVec};
