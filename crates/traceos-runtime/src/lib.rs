mod lifecycle;

pub use lifecycle::Runtime;
