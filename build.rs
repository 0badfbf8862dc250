//! Build script for minifying the embedded snippet templates.
//!
//! Every `src/embed/{js,static}/*.js` becomes `<stem>.min.js` and every
//! `src/embed/css/*.css` becomes `<stem>.min.css` in `OUT_DIR`.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use std::fs;
use std::path::{Path, PathBuf};

const JS_DIRS: &[&str] = &["src/embed/js", "src/embed/static"];
const CSS_DIR: &str = "src/embed/css";

/// Template placeholders are bare globals; the minifier must leave them intact.
const PLACEHOLDER_PREFIX: &str = "__PERF_";

fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir);

    for dir in JS_DIRS {
        println!("cargo:rerun-if-changed={dir}");
        for input in files_with_extension(dir, "js") {
            let output = out_path.join(minified_name(&input, "js"));
            minify_js_file(&input, &output);
            println!("cargo:rerun-if-changed={}", input.display());
        }
    }

    println!("cargo:rerun-if-changed={CSS_DIR}");
    for input in files_with_extension(CSS_DIR, "css") {
        let output = out_path.join(minified_name(&input, "css"));
        minify_css_file(&input, &output);
        println!("cargo:rerun-if-changed={}", input.display());
    }
}

fn files_with_extension(dir: &str, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("Failed to read {dir}: {e}"))
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();
    files
}

fn minified_name(input: &Path, ext: &str) -> String {
    let stem = input.file_stem().unwrap().to_string_lossy();
    format!("{stem}.min.{ext}")
}

fn minify_js(source: &str) -> String {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();

    let ret = Parser::new(&allocator, source, source_type).parse();
    assert!(ret.errors.is_empty(), "Parse errors: {:?}", ret.errors);

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code
}

fn minify_js_file(input: &Path, output: &Path) {
    let source = fs::read_to_string(input).expect("Failed to read JS file");
    let code = minify_js(&source);

    let expected = placeholders(&source);
    let kept = placeholders(&code);
    assert_eq!(
        expected,
        kept,
        "{}: minifier changed template placeholders",
        input.display()
    );

    fs::write(output, code).expect("Failed to write minified JS");
}

/// Distinct `__PERF_*__` identifiers, sorted.
fn placeholders(source: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut rest = source;
    while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
        let tail = &rest[start..];
        let end = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        let name = &tail[..end];
        if name.ends_with("__") && !found.iter().any(|f| f == name) {
            found.push(name.to_string());
        }
        rest = &tail[end..];
    }
    found.sort();
    found
}

fn minify_css(source: &str) -> String {
    let stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).expect("Failed to parse CSS");
    stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .expect("Failed to minify CSS")
        .code
}

fn minify_css_file(input: &Path, output: &Path) {
    let source = fs::read_to_string(input).expect("Failed to read CSS file");
    let code = minify_css(&source);
    fs::write(output, code).expect("Failed to write minified CSS");
}
