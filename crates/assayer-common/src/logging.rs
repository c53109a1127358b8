use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tqdm::{tqdm, Tqdm};

/// A thread-safe progress bar over `tqdm`.
///
/// Worker threads call `inc()`; an atomic counter guards against overflow
/// and a channel hands the updates to a background thread that owns the bar.
pub struct Progress {
    total: usize,
    count: AtomicUsize,
    sender: mpsc::Sender<usize>,
    progress_thread: Option<thread::JoinHandle<()>>,
}

impl Progress {
    /// Create a bar with `total` steps and a description shown beside it.
    pub fn new(total: usize, description: &str) -> Self {
        let progress: Arc<Mutex<Tqdm<Range<usize>>>> =
            Arc::new(Mutex::new(tqdm(0..total).desc(Some(description))));
        let (tx, rx) = mpsc::channel();
        let progress_clone = Arc::clone(&progress);

        let handle = thread::spawn(move || {
            for _ in rx {
                let _ = progress_clone.lock().unwrap().pbar.update(1);
            }
        });

        Self {
            total,
            count: AtomicUsize::new(0),
            sender: tx,
            progress_thread: Some(handle),
        }
    }

    /// Record one completed step.
    pub fn inc(&self) {
        let new_count = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        if new_count > self.total {
            log::warn!("progress update past total of {}, skipping", self.total);
            return;
        }
        let _ = self.sender.send(1);
    }

    /// Flush outstanding updates and wait for the bar thread to exit.
    pub fn finish(self) {
        drop(self.sender);
        if let Some(handle) = self.progress_thread {
            let _ = handle.join();
        }
    }
}
