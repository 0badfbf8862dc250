//! Terminal logging.
//!
//! Everything goes to stderr: `optimize` may be writing the document to
//! stdout.
//!
//! - `log!("module"; ...)` prints a line behind a colored `[module]` prefix
//! - `debug!` does the same only under `--verbose`
//! - [`ProgressLine`] keeps one line of counters updated in place while
//!   `convert` works through a batch
//!
//! ```ignore
//! log!("serve"; "http://{}", addr);
//!
//! let progress = ProgressLine::new("convert", &[("images", files.len())]);
//! progress.inc("images");
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::io::{Write, stderr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set while a [`ProgressLine`] owns the last terminal line.
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(on: bool) {
    VERBOSE.store(on, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

// ============================================================================
// Macros
// ============================================================================

/// Log a message behind a colored module prefix.
///
/// ```ignore
/// log!("pipeline"; "completed in {:.2}ms", ms);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like [`log!`], but only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Output
// ============================================================================

fn prefix(module: &str) -> String {
    let tag = format!("[{module}]");
    let lower = module.to_ascii_lowercase();
    match lower.as_str() {
        "error" => tag.bright_red().bold().to_string(),
        "warning" => tag.yellow().bold().to_string(),
        "pipeline" => tag.bright_cyan().bold().to_string(),
        "serve" | "perf" => tag.bright_blue().bold().to_string(),
        "convert" => tag.bright_green().bold().to_string(),
        _ => tag.bright_magenta().bold().to_string(),
    }
}

pub fn log(module: &str, message: &str) {
    let line = format!("{} {message}", prefix(module));
    let mut err = stderr().lock();
    if PROGRESS_ACTIVE.load(Ordering::Relaxed) {
        // Take over the progress line; the next update redraws it below.
        execute!(err, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
    }
    writeln!(err, "{line}").ok();
    err.flush().ok();
}

// ============================================================================
// Progress Line
// ============================================================================

struct Counter {
    name: &'static str,
    total: usize,
    done: AtomicUsize,
}

/// One line of `name(done/total)` counters, redrawn in place.
///
/// Updates use `try_lock`, so a worker never waits on the terminal; a
/// skipped redraw is caught up by the next one.
pub struct ProgressLine {
    module: &'static str,
    counters: Vec<Counter>,
    draw: Mutex<()>,
}

impl ProgressLine {
    /// Counters with a zero total are left out.
    pub fn new(module: &'static str, items: &[(&'static str, usize)]) -> Self {
        let counters = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|&(name, total)| Counter {
                name,
                total,
                done: AtomicUsize::new(0),
            })
            .collect();
        let progress = Self {
            module,
            counters,
            draw: Mutex::new(()),
        };
        PROGRESS_ACTIVE.store(true, Ordering::Relaxed);
        progress.redraw(false);
        progress
    }

    pub fn inc(&self, name: &str) {
        let Some(counter) = self.counters.iter().find(|c| c.name == name) else {
            return;
        };
        counter.done.fetch_add(1, Ordering::Relaxed);
        if let Some(_guard) = self.draw.try_lock() {
            self.redraw(false);
        }
    }

    fn line(&self) -> String {
        let parts: Vec<String> = self
            .counters
            .iter()
            .map(|c| format!("{}({}/{})", c.name, c.done.load(Ordering::Relaxed), c.total))
            .collect();
        parts.join(" ")
    }

    fn redraw(&self, keep: bool) {
        let text = format!("{} {}", prefix(self.module), self.line());
        let mut err = stderr().lock();
        execute!(err, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        if keep {
            writeln!(err, "{text}").ok();
        } else {
            write!(err, "{text}").ok();
        }
        err.flush().ok();
    }

    /// Leave the final counts on screen.
    pub fn finish(self) {
        let _guard = self.draw.lock();
        self.redraw(true);
        PROGRESS_ACTIVE.store(false, Ordering::Relaxed);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        PROGRESS_ACTIVE.store(false, Ordering::Relaxed);
    }
}
