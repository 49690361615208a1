//! Ports - abstraction layer.
//!
//! Each trait here is the seam to an external collaborator: the durable
//! record store (filesystem, Mongo, any keyed document store), the wall
//! clock, OS process introspection, and the page extractor. Implementations
//! live in `stores` or in the caller.

pub mod clock;
pub mod extractor;
pub mod process;
pub mod record_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::extractor::Extractor;
pub use self::process::{LeaseProbe, ProcessProbe};
pub use self::record_store::RecordStore;
