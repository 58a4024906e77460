mod db;
mod lock;
mod migration;
mod repository;
mod telemetry;
mod vector;

pub use db::{open_connection, DbHandle};
pub use lock::MigrationLock;
pub use migration::{migrate, table_signature, MigrationOutcome};
pub use repository::TriStateRepository;
pub use telemetry::{default_telemetry_dir, TelemetryWriterPool};
pub use vector::{
    compute_l2_norm, compute_style_dna_checksum, verify_style_dna_checksum, VectorCodecError,
};
