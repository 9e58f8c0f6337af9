/*!

The machinery underneath the public API: the hash-consing factory, the module system, and the
formatting infrastructure.

*/

pub mod alphabet;
pub mod format;
pub mod module;
