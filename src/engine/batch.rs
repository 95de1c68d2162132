//! Fixed-size update batching.
//!
//! One UPDATE per row is buffered and flushed to the executor every
//! `batch_size` rows, plus a final flush for the remainder. The total batch
//! count is derived from the row count up front and used only for progress
//! reporting. A failed batch is recorded with its index and processing
//! continues with the next batch.

use crate::error::MaskError;
use crate::sql::SqlExecutor;

/// Callback invoked after each executed batch with (completed, total).
pub type BatchProgress<'a> = &'a dyn Fn(u64, u64);

pub struct UpdateBatcher<'a> {
    table: String,
    batch_size: u64,
    buffer: Vec<String>,
    batch_index: u64,
    total_batches: u64,
    rows_batched: u64,
    batches_executed: u64,
    failures: Vec<MaskError>,
    dry_run: bool,
    progress: Option<BatchProgress<'a>>,
}

impl<'a> UpdateBatcher<'a> {
    pub fn new(
        table: &str,
        batch_size: u64,
        total_rows: u64,
        dry_run: bool,
        progress: Option<BatchProgress<'a>>,
    ) -> Self {
        Self {
            table: table.to_string(),
            batch_size,
            buffer: Vec::with_capacity(batch_size as usize),
            batch_index: 0,
            total_batches: total_rows.div_ceil(batch_size),
            rows_batched: 0,
            batches_executed: 0,
            failures: Vec::new(),
            dry_run,
            progress,
        }
    }

    pub fn total_batches(&self) -> u64 {
        self.total_batches
    }

    pub fn rows_batched(&self) -> u64 {
        self.rows_batched
    }

    pub fn batches_executed(&self) -> u64 {
        self.batches_executed
    }

    pub fn failures(&self) -> &[MaskError] {
        &self.failures
    }

    pub fn take_failures(&mut self) -> Vec<MaskError> {
        std::mem::take(&mut self.failures)
    }

    /// Buffer one statement, flushing if the batch is full.
    pub fn push(&mut self, statement: String, executor: &mut dyn SqlExecutor) {
        self.buffer.push(statement);
        self.rows_batched += 1;
        if self.buffer.len() as u64 >= self.batch_size {
            self.flush(executor);
        }
    }

    /// Execute whatever is buffered as one multi-statement batch.
    pub fn flush(&mut self, executor: &mut dyn SqlExecutor) {
        if self.buffer.is_empty() {
            return;
        }
        let sql = self.buffer.join("\n");
        self.buffer.clear();
        self.batch_index += 1;

        if !self.dry_run {
            if let Err(e) = executor.execute_batch(&sql) {
                self.failures.push(MaskError::Execution {
                    table: self.table.clone(),
                    batch: self.batch_index,
                    message: e.to_string(),
                });
            }
        }
        self.batches_executed += 1;

        if let Some(progress) = self.progress {
            progress(self.batch_index, self.total_batches);
        }
    }

    /// Flush the remainder after the last row.
    pub fn finish(&mut self, executor: &mut dyn SqlExecutor) {
        self.flush(executor);
    }
}
