/*!

Interned symbolic names.

A `Label` is the identity of a variable or a declared entity: a bag of identifier forms that can
be a plain interned string, an integer, or a product tuple of labels. Tuples are how derived
names are built without string surgery. The automaton encoder, for instance, names its
surrogates `("xs", 3)` and the primed copy of `x` as `(x, "′")`, and the display code renders
those as `xs₃` and `x′`.

Equality and hashing are structural. For the `Name` case both are constant-time after interning,
which is what makes labels suitable as scope-map keys throughout the module system.

*/

use telos_abs::{int_to_subscript, IString};

use crate::{
  core::format::{FormatStyle, Formattable},
  impl_display_debug_for_formattable,
};

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Label {
  Name(IString),
  Number(i64),
  Tuple(Vec<Label>),
}

impl Label {
  pub fn name(text: &str) -> Label {
    Label::Name(IString::from(text))
  }

  pub fn number(value: i64) -> Label {
    Label::Number(value)
  }

  pub fn tuple<I: IntoIterator<Item = Label>>(parts: I) -> Label {
    Label::Tuple(parts.into_iter().collect())
  }

  /// The interned text of a `Name` label.
  pub fn as_name(&self) -> Option<&IString> {
    match self {
      Label::Name(text) => Some(text),
      _ => None,
    }
  }

  /// Derives the label of the next-state copy of `self`.
  pub fn primed(&self) -> Label {
    Label::tuple([self.clone(), Label::name("′")])
  }

  /// Derives an indexed label, e.g. `indexed("xs", 3)` is the label rendered `xs₃`.
  pub fn indexed(prefix: &str, index: i64) -> Label {
    Label::tuple([Label::name(prefix), Label::Number(index)])
  }
}

impl From<&str> for Label {
  fn from(text: &str) -> Label {
    Label::name(text)
  }
}

impl From<String> for Label {
  fn from(text: String) -> Label {
    Label::Name(IString::from(text.as_str()))
  }
}

impl From<IString> for Label {
  fn from(text: IString) -> Label {
    Label::Name(text)
  }
}

impl From<i64> for Label {
  fn from(value: i64) -> Label {
    Label::Number(value)
  }
}

impl PartialEq<&str> for Label {
  fn eq(&self, other: &&str) -> bool {
    matches!(self, Label::Name(text) if &**text == *other)
  }
}

impl Formattable for Label {
  fn repr(&self, out: &mut dyn std::fmt::Write, style: FormatStyle) -> std::fmt::Result {
    match self {
      Label::Name(text) => write!(out, "{}", text),

      Label::Number(value) => {
        if *value >= 0 {
          write!(out, "{}", int_to_subscript(*value as u64))
        } else {
          write!(out, "₋{}", int_to_subscript(value.unsigned_abs()))
        }
      }

      Label::Tuple(parts) => {
        for part in parts {
          part.repr(out, style)?;
        }
        Ok(())
      }
    }
  }
}

impl_display_debug_for_formattable!(Label);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interning_makes_equal_names_equal() {
    assert_eq!(Label::name("p"), Label::from("p"));
    assert_eq!(Label::name("p"), "p");
    assert_ne!(Label::name("p"), Label::name("q"));
    assert_ne!(Label::name("1"), Label::number(1));
  }

  #[test]
  fn tuples_compare_componentwise() {
    assert_eq!(Label::indexed("xs", 3), Label::tuple([Label::name("xs"), Label::number(3)]));
    assert_ne!(Label::indexed("xs", 3), Label::indexed("xs", 4));
  }

  #[test]
  fn display_renders_indices_as_subscripts() {
    assert_eq!(Label::indexed("xs", 3).to_string(), "xs₃");
    assert_eq!(Label::name("x").primed().to_string(), "x′");
  }
}
