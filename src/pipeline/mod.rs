//! HTML optimization pipeline.
//!
//! Takes a rendered storefront page and runs it through an ordered list of
//! text-level rewriting stages.
//!
//! # Flow
//!
//! ```text
//! response ─► gate ─► large body? ─► lightweight fixes
//!               │
//!               └──► stage list ─► body + Link header
//!                    ├── always: error guard, CSP
//!                    ├── shell (progressive_loading)
//!                    └── standard (everything else)
//! ```
//!
//! The `shell` and `standard` groups exclude each other. Each stage runs on
//! its own; a stage that fails or panics is logged and its output discarded,
//! so the page always goes out, at worst less optimized.

mod context;
pub mod stage;

pub use context::{DocumentState, StageContext};
pub use stage::{Stage, StageError};

use crate::config::{CspConfig, Flag, Flags, PerfConfig};
use crate::response::HtmlResponse;
use crate::utils::mime;
use crate::{debug, log};
use stage::{
    AboveFold, Analytics, CriticalPath, CspMeta, ErrorGuard, ExtremeShell, ImageLazyLoad,
    JavaScript, LayoutShift, Lightweight, PayloadSplit, Progressive, Streaming, TaskWorker,
    TrackingDeferral,
};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

/// Appended to every optimized page; a body carrying it is not processed
/// again.
pub const OPTIMIZED_MARKER: &str = "<!-- optimized by storefront-perf -->";

// ============================================================================
// Stage list
// ============================================================================

/// Mutual-exclusion group of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// Runs in every mode.
    Always,
    /// Runs only when `progressive_loading` is on.
    Shell,
    /// Runs only when `progressive_loading` is off.
    Standard,
}

/// One entry of the ordered stage list.
pub struct StageEntry {
    pub name: &'static str,
    pub group: Group,
    /// Every flag here must be on for the stage to run.
    pub requires: &'static [Flag],
    pub stage: &'static dyn Stage,
}

impl StageEntry {
    const fn new(name: &'static str, group: Group, stage: &'static dyn Stage) -> Self {
        Self {
            name,
            group,
            requires: &[],
            stage,
        }
    }

    const fn requires(mut self, flags: &'static [Flag]) -> Self {
        self.requires = flags;
        self
    }

    /// Whether this stage runs under `flags`.
    pub fn enabled(&self, flags: Flags) -> bool {
        let group = match self.group {
            Group::Always => true,
            Group::Shell => flags.get(Flag::ProgressiveLoading),
            Group::Standard => !flags.get(Flag::ProgressiveLoading),
        };
        group && self.requires.iter().all(|flag| flags.get(*flag))
    }
}

/// Stages in execution order.
pub static STAGES: &[StageEntry] = &[
    StageEntry::new("error-guard", Group::Always, &ErrorGuard),
    StageEntry::new("csp", Group::Always, &CspMeta),
    StageEntry::new("extreme-shell", Group::Shell, &ExtremeShell),
    StageEntry::new("payload", Group::Standard, &PayloadSplit),
    StageEntry::new("streaming", Group::Standard, &Streaming),
    StageEntry::new("images", Group::Standard, &ImageLazyLoad).requires(&[Flag::ImageOptimization]),
    StageEntry::new("javascript", Group::Standard, &JavaScript).requires(&[Flag::JsOptimization]),
    StageEntry::new("task-worker", Group::Standard, &TaskWorker)
        .requires(&[Flag::JsOptimization, Flag::WebWorker]),
    StageEntry::new("analytics", Group::Standard, &Analytics),
    StageEntry::new("critical-path", Group::Standard, &CriticalPath).requires(&[Flag::CriticalPath]),
    StageEntry::new("tracking", Group::Standard, &TrackingDeferral),
    StageEntry::new("layout-shift", Group::Standard, &LayoutShift),
    StageEntry::new("above-fold", Group::Standard, &AboveFold),
    StageEntry::new("progressive", Group::Standard, &Progressive),
];

// ============================================================================
// Pipeline
// ============================================================================

/// Why a response was passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    PerformanceDisabled,
    AlreadyOptimized,
    NotHtml,
    EmptyBody,
}

/// What the pipeline did with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// Body over the threshold; only the lightweight fixes ran.
    Lightweight,
    /// The stage list ran. `failed` names the stages whose output was
    /// discarded.
    Optimized { failed: Vec<&'static str> },
}

/// Rewritten document plus headers for the host to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimized {
    pub html: String,
    pub headers: Vec<(String, String)>,
    pub failed: Vec<&'static str>,
}

/// The configured pipeline. Cheap to share between request threads.
#[derive(Debug, Clone)]
pub struct OptimizationPipeline {
    flags: Flags,
    csp: CspConfig,
    large_body_threshold: usize,
}

impl OptimizationPipeline {
    pub fn new(config: &PerfConfig) -> Self {
        Self {
            flags: config.flags(),
            csp: config.csp.clone(),
            large_body_threshold: config.optimizer.large_body_threshold,
        }
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Gate, optimize and write back one response.
    pub fn process(&self, response: &mut impl HtmlResponse) -> Outcome {
        if let Some(reason) = self.skip_reason(response) {
            debug!("pipeline"; "skipped: {:?}", reason);
            return Outcome::Skipped(reason);
        }

        let html = response.body().to_string();
        if html.len() > self.large_body_threshold {
            debug!("pipeline"; "large body ({} bytes), lightweight fixes only", html.len());
            let html = self.lightweight(html);
            response.set_body(html);
            return Outcome::Lightweight;
        }

        let optimized = self.optimize(html);
        for (name, value) in optimized.headers {
            response.add_header(&name, value);
        }
        response.set_body(optimized.html);
        Outcome::Optimized {
            failed: optimized.failed,
        }
    }

    fn skip_reason(&self, response: &impl HtmlResponse) -> Option<SkipReason> {
        if !self.flags.get(Flag::Enable) {
            return Some(SkipReason::Disabled);
        }
        if !self.flags.get(Flag::Performance) {
            return Some(SkipReason::PerformanceDisabled);
        }
        if response
            .header("Content-Type")
            .is_some_and(|value| !mime::is_html(value))
        {
            return Some(SkipReason::NotHtml);
        }
        let body = response.body();
        if body.trim().is_empty() {
            return Some(SkipReason::EmptyBody);
        }
        if body.contains(OPTIMIZED_MARKER) {
            return Some(SkipReason::AlreadyOptimized);
        }
        None
    }

    /// Run the stage list over a whole document.
    pub fn optimize(&self, html: String) -> Optimized {
        let started = Instant::now();
        log!("pipeline"; "Performance optimization started");

        let mut ctx = StageContext::new(self.flags, &self.csp, DocumentState::from_document(&html));
        let mut html = html;
        let mut failed = Vec::new();

        for entry in STAGES.iter().filter(|entry| entry.enabled(self.flags)) {
            match run_stage(entry.stage, &html, &mut ctx) {
                Ok(out) => {
                    html = out;
                    debug!("pipeline"; "{} applied", entry.name);
                }
                Err(message) => {
                    log!("error"; "stage {} failed, keeping previous output: {}", entry.name, message);
                    failed.push(entry.name);
                }
            }
        }

        html.push_str(OPTIMIZED_MARKER);
        log!(
            "pipeline";
            "Performance optimization completed in {:.2}ms",
            started.elapsed().as_secs_f64() * 1000.0
        );

        Optimized {
            html,
            headers: ctx.into_headers(),
            failed,
        }
    }

    /// Large-body fast path. Never fails: on error the input comes back.
    pub fn lightweight(&self, html: String) -> String {
        let mut ctx = StageContext::new(self.flags, &self.csp, DocumentState::default());
        let mut out = match run_stage(&Lightweight, &html, &mut ctx) {
            Ok(out) => out,
            Err(message) => {
                log!("error"; "lightweight fixes failed: {}", message);
                html
            }
        };
        out.push_str(OPTIMIZED_MARKER);
        out
    }
}

/// Run one stage on a copy of `html`, turning errors and panics into a
/// message. Headers queued by a failed stage are dropped.
fn run_stage(stage: &dyn Stage, html: &str, ctx: &mut StageContext<'_>) -> Result<String, String> {
    let mark = ctx.headers().len();
    let result = catch_unwind(AssertUnwindSafe(|| stage.apply(html.to_string(), ctx)));
    let message = match result {
        Ok(Ok(out)) => return Ok(out),
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };
    ctx.truncate_headers(mark);
    Err(message)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
