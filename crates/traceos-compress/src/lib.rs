mod engine;
mod filter;
mod format;
mod parse;
mod prompt;

pub use engine::{CompressionEngine, CompressionOutcome};
pub use filter::{filter_and_rank, TraceEvent, MAX_COMPRESSION_EVENTS};
pub use format::format_events;
pub use parse::{parse_compression_response, CompressionResult};
pub use prompt::{build_prompt, COMPRESSION_SYSTEM_PROMPT};
