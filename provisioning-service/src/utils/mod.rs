pub mod pin;

pub use pin::{hash_pin, verify_pin};
