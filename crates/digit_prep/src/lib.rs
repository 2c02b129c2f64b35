//! # Digit Normalization Library
//!
//! Turns an arbitrary photo or drawing of a single handwritten digit into the
//! canonical 28x28 form an MNIST-style classifier expects, then ranks the
//! classifier's answer.
//!
//! ## Core Features
//!
//! - **Staged Pipeline**: segmentation, compositing, denoising, polarity
//!   detection, region extraction, contrast normalization, resizing, centering
//!   and morphological repair, each a plain function over owned buffers
//! - **Pluggable Collaborators**: the background segmenter and the classifier
//!   are traits; segmenter sessions are cached per variant in a registry
//! - **Diagnostics**: optional intermediate buffers and a quality score
//! - **Test-Time Augmentation**: optional rotation ensemble run on rayon
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use digit_prep::{ClassProbabilities, DigitClassifier, DigitTensor, Pipeline, Result};
//!
//! struct MyModel;
//!
//! impl DigitClassifier for MyModel {
//!     fn predict(&self, _input: &DigitTensor) -> Result<ClassProbabilities> {
//!         Ok([0.1; 10])
//!     }
//! }
//!
//! let pipeline = Pipeline::builder()
//!     .with_tta()
//!     .with_quality_score()
//!     .build();
//!
//! let image = image::open("digit.png")?;
//! let recognition = pipeline.recognize(&image, &MyModel)?;
//! if let Some(top3) = recognition.top3() {
//!     println!("best guess: {}", top3.best().digit);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod quality;
pub mod ranking;
pub mod tta;
pub mod segmenter;
pub mod config;
pub mod pipeline;

// Re-exports for convenience
pub use error::{DigitPrepError, Result};
pub use types::*;
pub use traits::*;
pub use algorithms::NormalizationParams;
pub use algorithms::ResampleFilter;
pub use quality::{QualityLevel, QualityScore};
pub use segmenter::{AlphaPassthroughSegmenter, PassthroughFactory, SegmenterRegistry, SegmenterVariant};
pub use config::{RecognizerConfig, RejectionPolicy};
pub use pipeline::{builder::PipelineBuilder, Normalization, Pipeline};
