pub mod event_bus;
pub mod pipeline;
pub mod source;

pub use event_bus::*;
pub use pipeline::*;
pub use source::*;
