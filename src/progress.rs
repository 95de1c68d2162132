//! Shared progress tracking utilities.
//!
//! The engine reports (table, completed batches, total batches) through a
//! plain callback; this wrapper renders those callbacks as an indicatif bar,
//! re-targeted whenever the engine moves on to the next table.

use std::cell::RefCell;

use indicatif::{ProgressBar, ProgressStyle};

pub struct BatchProgressBar {
    bar: ProgressBar,
    current_table: RefCell<String>,
}

impl BatchProgressBar {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} batches {msg}",
            )
            .unwrap()
            .progress_chars("█▓▒░  "),
        );
        Self {
            bar,
            current_table: RefCell::new(String::new()),
        }
    }

    /// Record one executed batch; switches the bar over when a new table
    /// starts reporting.
    pub fn update(&self, table: &str, completed: u64, total: u64) {
        let mut current = self.current_table.borrow_mut();
        if *current != table {
            *current = table.to_string();
            self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            self.bar.set_length(total);
            self.bar.set_message(current.clone());
        }
        self.bar.set_position(completed);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BatchProgressBar {
    fn default() -> Self {
        Self::new()
    }
}
