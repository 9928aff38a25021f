// Services module - Business logic

pub mod bank_validator;
pub mod card_lifecycle;
pub mod identifier;
pub mod secret_hasher;

pub use bank_validator::{BankValidator, HttpBankValidator};
pub use card_lifecycle::{CardError, CardService, CardValidation};
pub use identifier::IdentifierGenerator;
pub use secret_hasher::{Argon2Hasher, SecretHasher};
