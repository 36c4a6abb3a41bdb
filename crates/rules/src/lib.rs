//! Redaction policy: which fields are redacted, and how text is masked.

mod mask;
mod selector;

pub use mask::{mask, mask_char};
pub use selector::FieldSelector;
