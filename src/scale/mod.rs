//! Preview scaling
//!
//! Keeps the fixed-width paper fitted to the viewport.
//!
//! # Architecture
//!
//! - `clock.rs` - the `Clock` port and the system clock
//! - `debounce.rs` - leading and trailing edge rate limiting
//! - `controller.rs` - scale computation and the two-frame measurement

pub mod clock;
pub mod controller;
pub mod debounce;

pub use clock::{Clock, SystemClock};
pub use controller::{compute_scale, FrameScheduler, ScaleController, ScaleDecision};
pub use debounce::{Debouncer, Trigger};
