// file: src/pipeline/progress.rs
// description: progress reporting for embedding and index writes
// reference: uses indicatif for progress bars

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingStats {
    pub chunks_embedded: usize,
    pub batches: usize,
    pub duration: Duration,
}

impl EmbeddingStats {
    pub fn chunks_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.chunks_embedded as f64 / secs
    }
}

pub struct ProgressTracker {
    bar: ProgressBar,
    chunks_embedded: AtomicUsize,
    batches: AtomicUsize,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_chunks: usize, colored: bool) -> Self {
        let bar = ProgressBar::new(total_chunks as u64);
        bar.set_style(progress_style(colored));
        Self::with_bar(bar)
    }

    /// Tracks counts without drawing anything.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            chunks_embedded: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_batch(&self, chunks: usize) {
        self.chunks_embedded.fetch_add(chunks, Ordering::SeqCst);
        let batches = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar.inc(chunks as u64);
        self.bar.set_message(format!("batch {}", batches));
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("embedding complete");
    }

    pub fn abandon(&self, message: impl Into<String>) {
        self.bar.abandon_with_message(message.into());
    }

    pub fn get_stats(&self) -> EmbeddingStats {
        EmbeddingStats {
            chunks_embedded: self.chunks_embedded.load(Ordering::SeqCst),
            batches: self.batches.load(Ordering::SeqCst),
            duration: self.start_time.elapsed(),
        }
    }
}

fn progress_style(colored: bool) -> ProgressStyle {
    let (template, chars) = if colored {
        (
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta}) {msg}",
            "█▓▒░",
        )
    } else {
        (
            "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} chunks ({eta}) {msg}",
            "=>-",
        )
    };

    ProgressStyle::default_bar()
        .template(template)
        .map(|style| style.progress_chars(chars))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
