use serde::{Deserialize, Deserializer};

use super::card::{Card, CardStatus};

/// Presence marker for a single patchable field.
///
/// An absent JSON key deserializes to `Unchanged` (via `#[serde(default)]`);
/// a present key must carry a value, so `null` is a parse error rather than
/// an accidental "clear".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    #[default]
    Unchanged,
    Set(T),
}

impl<T> Field<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Field::Set(value) => Some(value),
            Field::Unchanged => None,
        }
    }

    /// Writes the value into `target` when set. Returns whether it did.
    fn apply_to(self, target: &mut T) -> bool {
        match self {
            Field::Set(value) => {
                *target = value;
                true
            }
            Field::Unchanged => false,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Field::Set)
    }
}

/// Sparse update of the mutable card fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardPatch {
    #[serde(default)]
    pub status: Field<CardStatus>,
    #[serde(default)]
    pub client_name: Field<String>,
    #[serde(default)]
    pub client_email: Field<String>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        !(self.status.is_set() || self.client_name.is_set() || self.client_email.is_set())
    }

    /// Applies every set field to `card`, leaving the rest untouched.
    /// Returns the number of fields written.
    pub fn apply(self, card: &mut Card) -> usize {
        [
            self.status.apply_to(&mut card.status),
            self.client_name.apply_to(&mut card.client_name),
            self.client_email.apply_to(&mut card.client_email),
        ]
        .into_iter()
        .filter(|written| *written)
        .count()
    }
}
