use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use readdb::progress::{ByteNum, ProgressNotifier};

#[derive(Debug)]
struct ReadDbProgressBarState {
    total_bytes: u64,
    initialized: bool,
}

impl ReadDbProgressBarState {
    fn new() -> Self {
        Self {
            total_bytes: 0,
            initialized: false,
        }
    }
}

/// Byte-based progress bar, or a spinner when the input size is unknown
/// (standard input). Processed record count is shown as the message.
#[derive(Debug, Clone)]
pub(crate) struct ReadDbProgressBar {
    bar: ProgressBar,
    state: Arc<Mutex<ReadDbProgressBarState>>,
    records: Arc<AtomicU64>,
}

impl ReadDbProgressBar {
    pub fn new() -> ReadDbProgressBar {
        let init_bar = ProgressBar::hidden();
        init_bar.set_style(ProgressStyle::default_spinner());
        init_bar.enable_steady_tick(Duration::from_millis(50));
        init_bar.set_message("Initializing...");

        Self {
            bar: init_bar,
            state: Arc::new(Mutex::new(ReadDbProgressBarState::new())),
            records: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn show(&self) {
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear()
    }

    #[inline]
    fn init(&self) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.initialized {
            return;
        }

        self.bar.set_position(0);
        self.bar.set_message("");
        if state.total_bytes == 0 {
            self.bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {bytes}/? ({bytes_per_sec}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
        } else {
            self.bar.set_length(state.total_bytes);
            self.bar.set_style(
                ProgressStyle::default_bar()
                    .template("{wide_bar} {bytes}/{total_bytes} [ETA {eta}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
        }
        state.initialized = true;
    }

    pub fn set_total_bytes(&self, length: u64) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        state.initialized = false;
        state.total_bytes = length;
    }

    pub fn println<I: AsRef<str>>(&self, msg: I) {
        self.bar.println(msg);
    }
}

impl ProgressNotifier for ReadDbProgressBar {
    fn processed_bytes(&self, bytes: ByteNum) {
        self.init();
        self.bar.inc(bytes.get() as u64);
    }

    fn inc_records(&self) {
        let records = self.records.fetch_add(1, Ordering::Relaxed) + 1;
        if records % 1000 == 0 {
            self.bar.set_message(format!("{} reads", records));
        }
    }
}
