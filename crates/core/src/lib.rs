//! Core library for pdftxt
//!
//! This crate implements the **Functional Core** of the pdftxt application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The pdftxt project uses a three-crate architecture:
//!
//! - **`pdftxt_core`** (this crate): Pure transformation functions with zero I/O
//! - **`pdf`**: PDF content-stream access and layout text extraction
//! - **`pdftxt`**: I/O operations and orchestration (the Imperative Shell): the
//!   CLI, the rasterizer and OCR engine invocations, zip packaging and the
//!   upload form
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Testable**: Can be tested with simple fixture data, no mocking required
//!
//! # Module Organization
//!
//! - [`lines`]: Rebuilds text lines from word-level OCR detections
//! - [`tsv`]: Parses the OCR engine's TSV output into detections
//! - [`input`]: Detects whether uploaded bytes are a PDF or an image
//! - [`pages`]: Page text assembly, page file names and extraction reports
//! - [`cache`]: Content-addressed cache keys and a bounded LRU cache
//!
//! # Example Usage
//!
//! ```rust
//! use pdftxt_core::lines::{reconstruct_lines, BoundingBox, Detection};
//!
//! let word = |top: f64, text: &str| {
//!     Detection::new(BoundingBox::from_rect(0.0, top, 40.0, 12.0), text, 0.9)
//! };
//! let detections = vec![
//!     word(94.0, "Hello"),
//!     word(96.0, "World"),
//!     word(124.0, "Second"),
//!     word(125.0, "Line"),
//! ];
//!
//! assert_eq!(reconstruct_lines(&detections), vec!["Hello World", "Second Line"]);
//! ```

pub mod cache;
pub mod input;
pub mod lines;
pub mod pages;
pub mod tsv;
