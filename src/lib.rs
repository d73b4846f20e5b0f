// Trade market slide-deck generator.
//
// A `processor::DataProcessor` turns one `types::RawInput` into a
// normalized, rank-annotated view plus a synthetic shipment list. A
// `plan::SlidePlan` declares the fixed deck layout. `assembly::ReportRun`
// joins the two and hands each resolved slide to a renderer.

pub mod assembly;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod plan;
pub mod processor;
pub mod render;
pub mod types;
pub mod util;

pub use assembly::{ReportDocument, ReportRun, RunState, Slide, SlideData, SlideRenderer};
pub use error::{RankedList, ReportError, Result};
pub use plan::{build_plan, SlideKind, SlidePlan};
pub use processor::DataProcessor;
