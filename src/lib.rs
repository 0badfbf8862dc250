//! storefront-perf - rewrites rendered storefront HTML for faster page loads.
//!
//! The pipeline is a text-level post-processor: it takes a finished HTML
//! response, runs it through an ordered list of rewriting stages and hands
//! back the rewritten body plus an optional `Link` header.
//!
//! ```ignore
//! let config = PerfConfig::load(None)?;
//! let pipeline = OptimizationPipeline::new(&config);
//! let mut response = BufferedResponse::html(html);
//! pipeline.process(&mut response);
//! ```

pub mod logger;

pub mod cli;
pub mod config;
pub mod embed;
pub mod html;
pub mod image;
pub mod pipeline;
pub mod response;
pub mod utils;

pub use config::PerfConfig;
pub use pipeline::{OptimizationPipeline, Outcome};
pub use response::{BufferedResponse, HtmlResponse};
