//! OCR to Markdown - batch image conversion through a local vision model.
//!
//! This crate provides:
//! - Image discovery over files and directory trees
//! - Request building for the native generate API and the OpenAI-compatible chat API
//! - An async OCR client with optional streamed replies
//! - Removal of grounding markup from model output
//! - Combined or per-image Markdown output
//!
//! # Example
//!
//! ```rust,no_run
//! use ocr_md::{OcrClient, OcrConfig, OutputLayout, expand_paths, run_batch, write_results};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OcrConfig::new("http://127.0.0.1:11434");
//! let images = expand_paths(&["./scans"])?;
//! let client = OcrClient::new(&config)?;
//! let pages = run_batch(&client, &config, &images).await;
//! write_results(&OutputLayout::PerImage, &pages, |p| println!("Wrote {}", p.display()))?;
//! # Ok(())
//! # }
//! ```

pub mod clean;
pub mod config;
pub mod ocr;
pub mod output;
pub mod runner;
pub mod scan;

// Re-export configuration
pub use config::OcrConfig;

// Re-export discovery types
pub use scan::{ImagePath, ImageWalker, ScanError, expand_paths, iter_images};

// Re-export OCR client
pub use ocr::{
    OcrClient, OcrError, OcrProgress, OcrResult, Protocol, RequestPayload, build_prompt,
    build_request, guess_image_type,
};

// Re-export pipeline and output
pub use clean::clean_grounding;
pub use output::{OutputLayout, render_combined, write_results};
pub use runner::{OcrPage, failure_marker, process_image, run_batch};
