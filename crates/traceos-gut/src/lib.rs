mod brain;
mod critic;
mod registry;
mod session;

pub use brain::{adjust_creativity, adjust_style_distance, should_route_to_shadow};
pub use critic::GutCritic;
pub use registry::GutRegistry;
pub use session::EventStreamSession;
