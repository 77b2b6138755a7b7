//! Document state for Typogram
//!
//! - `model.rs` - the `Gram` snapshot, style choices, fields and patches
//! - `record.rs` - the observable `Record` and its subscriptions

mod model;
mod record;

pub use model::{
    Choice, ColorScheme, Field, FieldValue, FontFamily, FontSize, Gram, GramPatch, TextAlign,
};
pub use record::{Record, Subscription};
