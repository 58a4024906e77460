use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arrow_array::{ArrayRef, Float32Array, Float64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::arrow_writer::ArrowWriter;
use traceos_types::{TelemetrySample, TraceOsError};
use tracing::debug;

fn telemetry_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("x", DataType::Float32, false),
        Field::new("y", DataType::Float32, false),
        Field::new("pressure", DataType::Float32, false),
        Field::new("timestamp", DataType::Float64, false),
        Field::new("tilt", DataType::Float32, false),
        Field::new("tilt_x", DataType::Float32, false),
        Field::new("tilt_y", DataType::Float32, false),
    ]))
}

struct OpenWriter {
    writer: ArrowWriter<File>,
    path: PathBuf,
    total_rows: usize,
}

/// Process-global map of open per-session Parquet writers. One writer stays
/// open per session from its first telemetry append until `close_session` (or
/// process shutdown) is called; each `append` writes a new row group without
/// rereading the file.
pub struct TelemetryWriterPool {
    base_dir: PathBuf,
    open: Mutex<HashMap<String, OpenWriter>>,
}

impl TelemetryWriterPool {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            open: Mutex::new(HashMap::new()),
        }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("session_{session_id}.parquet"))
    }

    /// Append one row group of samples to the session's writer, opening it
    /// on first use. Returns (row count of this chunk, running total).
    pub fn append(
        &self,
        session_id: &str,
        samples: &[TelemetrySample],
    ) -> Result<(usize, usize), TraceOsError> {
        let mut guard = self.open.lock().expect("telemetry writer pool poisoned");

        if !guard.contains_key(session_id) {
            std::fs::create_dir_all(&self.base_dir)?;
            let path = self.path_for(session_id);
            let file = File::create(&path)?;
            let writer = ArrowWriter::try_new(file, telemetry_schema(), None)
                .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))?;
            guard.insert(
                session_id.to_string(),
                OpenWriter {
                    writer,
                    path,
                    total_rows: 0,
                },
            );
            debug!(session_id, "opened telemetry writer");
        }

        let entry = guard.get_mut(session_id).expect("just inserted");
        let batch = samples_to_batch(samples)?;
        entry
            .writer
            .write(&batch)
            .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))?;
        entry
            .writer
            .flush()
            .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))?;
        entry.total_rows += samples.len();

        Ok((samples.len(), entry.total_rows))
    }

    pub fn path_if_open(&self, session_id: &str) -> Option<PathBuf> {
        self.open
            .lock()
            .expect("telemetry writer pool poisoned")
            .get(session_id)
            .map(|w| w.path.clone())
    }

    /// Close and finalize the session's writer, if one is open.
    pub fn close_session(&self, session_id: &str) -> Result<(), TraceOsError> {
        let mut guard = self.open.lock().expect("telemetry writer pool poisoned");
        if let Some(entry) = guard.remove(session_id) {
            entry
                .writer
                .close()
                .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))?;
            debug!(session_id, "closed telemetry writer");
        }
        Ok(())
    }

    /// Close every writer still open. Called on process shutdown so no
    /// Parquet file is left without a finalized footer.
    pub fn close_all(&self) -> Result<(), TraceOsError> {
        let mut guard = self.open.lock().expect("telemetry writer pool poisoned");
        for (session_id, entry) in guard.drain() {
            if let Err(e) = entry.writer.close() {
                tracing::warn!(session_id, error = %e, "failed to close telemetry writer on shutdown");
            }
        }
        Ok(())
    }
}

impl Drop for TelemetryWriterPool {
    fn drop(&mut self) {
        let _ = self.close_all();
    }
}

fn samples_to_batch(samples: &[TelemetrySample]) -> Result<RecordBatch, TraceOsError> {
    let x: ArrayRef = Arc::new(Float32Array::from_iter_values(samples.iter().map(|s| s.x)));
    let y: ArrayRef = Arc::new(Float32Array::from_iter_values(samples.iter().map(|s| s.y)));
    let pressure: ArrayRef = Arc::new(Float32Array::from_iter_values(
        samples.iter().map(|s| s.pressure),
    ));
    let timestamp: ArrayRef = Arc::new(Float64Array::from_iter_values(
        samples.iter().map(|s| s.timestamp),
    ));
    let tilt: ArrayRef = Arc::new(Float32Array::from_iter_values(samples.iter().map(|s| s.tilt)));
    let tilt_x: ArrayRef = Arc::new(Float32Array::from_iter_values(
        samples.iter().map(|s| s.tilt_x),
    ));
    let tilt_y: ArrayRef = Arc::new(Float32Array::from_iter_values(
        samples.iter().map(|s| s.tilt_y),
    ));

    RecordBatch::try_new(
        telemetry_schema(),
        vec![x, y, pressure, timestamp, tilt, tilt_x, tilt_y],
    )
    .map_err(|e| TraceOsError::MigrationFailed(e.to_string()))
}

pub fn default_telemetry_dir(storage_root: &Path) -> PathBuf {
    storage_root.join("telemetry")
}
