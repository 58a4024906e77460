mod agent;
mod contract;
mod error;
mod gut;
mod memory;

pub use agent::*;
pub use contract::*;
pub use error::TraceOsError;
pub use gut::*;
pub use memory::*;
