use crate::plan::SlideKind;
use std::fmt;
use thiserror::Error;

/// Ranked collections a slide can index into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankedList {
    ImportingCountries,
    ExportingCountries,
    Suppliers,
    Buyers,
    Transactions,
}

impl fmt::Display for RankedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RankedList::ImportingCountries => "importing countries",
            RankedList::ExportingCountries => "exporting countries",
            RankedList::Suppliers => "suppliers",
            RankedList::Buyers => "buyers",
            RankedList::Transactions => "transaction records",
        };
        f.write_str(name)
    }
}

/// Every failure a report run can hit. None of them are retried: a run that
/// returns an error writes no document.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{}rank {rank} requested from {list}, which has {len} entries", at_slide(.slide_id))]
    RankNotFound {
        list: RankedList,
        rank: usize,
        len: usize,
        slide_id: Option<u32>,
    },

    #[error("slide structure deviation: expected {expected} slides, plan has {actual}")]
    StructureDeviation { expected: usize, actual: usize },

    #[error("slide {slide_id}: no renderer registered for kind {kind:?}")]
    UnknownSlideKind { slide_id: u32, kind: SlideKind },

    #[error("slide {slide_id}: malformed plan entry ({reason})")]
    MalformedEntry { slide_id: u32, reason: &'static str },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),
}

fn at_slide(slide_id: &Option<u32>) -> String {
    match slide_id {
        Some(id) => format!("slide {}: ", id),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
