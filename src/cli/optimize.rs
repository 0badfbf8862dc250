//! `optimize`: run one document through the pipeline.

use super::OptimizeArgs;
use crate::config::PerfConfig;
use crate::log;
use crate::pipeline::{OptimizationPipeline, Outcome};
use crate::response::{BufferedResponse, HtmlResponse};
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut html = String::new();
        io::stdin()
            .read_to_string(&mut html)
            .context("Failed to read stdin")?;
        return Ok(html);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn optimize_file(args: &OptimizeArgs, config: &PerfConfig) -> Result<()> {
    let html = read_input(&args.input)?;
    let mut response = BufferedResponse::html(html);

    let pipeline = OptimizationPipeline::new(config);
    match pipeline.process(&mut response) {
        Outcome::Skipped(reason) => log!("pipeline"; "left unchanged: {:?}", reason),
        Outcome::Lightweight => log!("pipeline"; "large document, applied lightweight fixes only"),
        Outcome::Optimized { failed } if !failed.is_empty() => {
            log!("error"; "skipped failing stages: {}", failed.join(", "));
        }
        Outcome::Optimized { .. } => {}
    }

    if args.headers {
        let extra = response
            .headers()
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        for (name, value) in extra {
            eprintln!("{name}: {value}");
        }
    }

    match &args.output {
        Some(path) => fs::write(path, response.body())
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(response.body().as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::pipeline::OPTIMIZED_MARKER;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_optimize_file_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("page.html");
        let output = dir.path().join("out.html");
        fs::write(
            &input,
            r#"<html><head><link rel="stylesheet" href="a.css"></head><body><img src="x.jpg"></body></html>"#,
        )
        .unwrap();

        let args = OptimizeArgs {
            input,
            output: Some(output.clone()),
            headers: false,
        };
        optimize_file(&args, &test_parse_config("")).unwrap();

        let html = fs::read_to_string(output).unwrap();
        assert!(html.contains(r#"data-src="x.jpg""#));
        assert!(html.ends_with(OPTIMIZED_MARKER));
    }

    #[test]
    fn test_missing_input_is_error() {
        let args = OptimizeArgs {
            input: PathBuf::from("/nonexistent/page.html"),
            output: None,
            headers: false,
        };
        assert!(optimize_file(&args, &test_parse_config("")).is_err());
    }
}
