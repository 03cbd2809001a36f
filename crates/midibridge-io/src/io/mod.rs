//! Background I/O: one activation loop per direction, each owning the
//! transports of its registered endpoints.

mod input;
mod output;
mod registry;
mod scheduler;

pub(crate) use input::{InputCommand, InputLoop, InputParser, InputSlot};
pub(crate) use output::{OutputCommand, OutputLoop, OutputSlot};
pub use registry::{EndpointId, EndpointRegistry};
pub use scheduler::{Activation, PeriodicTask};
