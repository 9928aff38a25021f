// Models module - card entity and update types

pub mod card;
pub mod patch;

pub use card::{Card, CardStatus, CardholderData};
pub use patch::{CardPatch, Field};
