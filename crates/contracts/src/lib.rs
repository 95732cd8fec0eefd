//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate: detection results coming in,
//! field mapping and formatter configuration, the outbound sender seam and the reactive
//! settings store seam.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data Flow
//! - The upstream detection pipeline produces batches of `DetectionResult`
//! - `FieldMapping` selects which names are relayed and to which command
//! - `FieldFormatters` shape each value before it is sent through a `CommandSender`

mod blueprint;
mod detection;
mod error;
mod field;
mod sender;
mod store;

pub use blueprint::*;
pub use detection::*;
pub use error::*;
pub use field::*;
pub use sender::*;
pub use store::*;
