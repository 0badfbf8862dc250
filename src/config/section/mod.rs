//! Configuration section definitions.
//!
//! Each module corresponds to a section in `perf.toml`:
//!
//! | Module      | TOML Section    | Purpose                               |
//! |-------------|-----------------|---------------------------------------|
//! | `optimizer` | `[optimizer]`   | Pipeline switches and size threshold  |
//! | `csp`       | `[csp]`         | Content-Security-Policy allowlists    |
//! | `image`     | `[image]`       | Quality search candidates             |
//! | `serve`     | `[serve]`       | Preview server                        |

mod csp;
mod image;
mod optimizer;
mod serve;

pub use csp::CspConfig;
pub use image::ImageConfig;
pub use optimizer::OptimizerConfig;
pub use serve::ServeConfig;
