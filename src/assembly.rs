// Joins a `SlidePlan` with the processed data and drives a renderer.
//
// Resolution is strict: a plan entry that points past the end of a list
// fails the run with the slide id and the missing rank. Nothing is skipped
// or substituted, so the rendered count always equals the planned count.

use crate::error::{RankedList, ReportError, Result};
use crate::plan::{Section, SlideKind, SlidePlan, SlidePlanEntry};
use crate::processor::{batch_summary, top_share, DataProcessor};
use crate::types::{
    BatchSummary, CountryEntry, EntityEntry, MarketBlock, NormalizedView, PriceEntry,
    ProductBlock, TransactionRecord,
};
use crate::util::{format_currency, format_int, format_percentage};
use serde::Serialize;
use tracing::{debug, info};

/// Entries shown on summary slides.
const SUMMARY_TOP_N: usize = 10;
/// Entries shown on flow and comparison slides.
const FLOW_TOP_N: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Slide<'a> {
    pub id: u32,
    pub kind: SlideKind,
    pub title: String,
    pub data: SlideData<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlideData<'a> {
    Product(&'a ProductBlock),
    Market(&'a MarketBlock),
    Contents { sections: &'a [Section] },
    PriceHistory { points: &'a [PriceEntry] },
    ExecutiveSummary {
        product: &'a ProductBlock,
        market: &'a MarketBlock,
        top_importer: &'a CountryEntry,
        top_exporter: &'a CountryEntry,
        top_supplier: &'a EntityEntry,
        top_buyer: &'a EntityEntry,
    },
    TradeFlows {
        exporters: &'a [CountryEntry],
        importers: &'a [CountryEntry],
    },
    CountrySummary {
        entries: &'a [CountryEntry],
        top3_share: f64,
        top3_share_display: String,
    },
    Country(&'a CountryEntry),
    Entity(&'a EntityEntry),
    EntitySummary {
        entries: &'a [EntityEntry],
        top3_share: f64,
        top3_share_display: String,
    },
    ShareComparison {
        suppliers: &'a [EntityEntry],
        buyers: &'a [EntityEntry],
    },
    RecordsOverview {
        record_count: usize,
        record_count_display: String,
        batch_size: usize,
        batch_count: usize,
        total_value: f64,
        total_value_display: String,
    },
    RecordBatch {
        record_start: usize,
        record_end: usize,
        records: &'a [TransactionRecord],
        summary: BatchSummary,
    },
}

/// Turns one resolved slide into a document fragment.
pub trait SlideRenderer {
    fn supports(&self, kind: SlideKind) -> bool;
    fn render(&mut self, slide: &Slide<'_>) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Generating,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedSlide {
    pub id: u32,
    pub kind: SlideKind,
    pub title: String,
    pub html: String,
}

/// The finished, count-checked output of one run.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: String,
    pub slides: Vec<RenderedSlide>,
}

impl ReportDocument {
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

/// Resolves every entry of `plan` against `processor`, in id order.
pub fn resolve_all<'a>(plan: &'a SlidePlan, processor: &'a DataProcessor) -> Result<Vec<Slide<'a>>> {
    plan.entries()
        .iter()
        .map(|entry| resolve(entry, plan, processor))
        .collect()
}

pub fn resolve<'a>(
    entry: &SlidePlanEntry,
    plan: &'a SlidePlan,
    processor: &'a DataProcessor,
) -> Result<Slide<'a>> {
    let view = processor.view();
    let id = entry.id;
    let product = &view.product;

    let (title, data) = match entry.kind {
        SlideKind::Title => (product.name.clone(), SlideData::Product(product)),
        SlideKind::TableOfContents => (
            "Contents".to_string(),
            SlideData::Contents { sections: plan.sections() },
        ),
        SlideKind::ExecutiveSummary => (
            "Executive Summary".to_string(),
            SlideData::ExecutiveSummary {
                product,
                market: &view.market,
                top_importer: at_rank(&view.importing_countries, RankedList::ImportingCountries, 1, id)?,
                top_exporter: at_rank(&view.exporting_countries, RankedList::ExportingCountries, 1, id)?,
                top_supplier: at_rank(&view.suppliers, RankedList::Suppliers, 1, id)?,
                top_buyer: at_rank(&view.buyers, RankedList::Buyers, 1, id)?,
            },
        ),
        SlideKind::ProductOverview => (
            format!("Product Overview: HS {}", product.code),
            SlideData::Product(product),
        ),
        SlideKind::MarketOverview => ("Market Overview".to_string(), SlideData::Market(&view.market)),
        SlideKind::PriceHistory => (
            "Price History".to_string(),
            SlideData::PriceHistory { points: &view.price_history },
        ),
        SlideKind::KeyMetrics => ("Key Metrics".to_string(), SlideData::Market(&view.market)),
        SlideKind::TradeFlowNetwork => (
            "Trade Flow Network".to_string(),
            SlideData::TradeFlows {
                exporters: head(&view.exporting_countries, FLOW_TOP_N),
                importers: head(&view.importing_countries, FLOW_TOP_N),
            },
        ),
        SlideKind::ImportingSummary => (
            "Top Importing Countries".to_string(),
            country_summary(&view.importing_countries),
        ),
        SlideKind::ExportingSummary => (
            "Top Exporting Countries".to_string(),
            country_summary(&view.exporting_countries),
        ),
        SlideKind::ImportingCountry | SlideKind::ExportingCountry => {
            let (list, entries, label) = if entry.kind == SlideKind::ImportingCountry {
                (RankedList::ImportingCountries, &view.importing_countries, "Importing")
            } else {
                (RankedList::ExportingCountries, &view.exporting_countries, "Exporting")
            };
            let c = at_rank(entries, list, require_rank(entry)?, id)?;
            (
                format!("{} Country #{}: {}", label, c.rank, c.country),
                SlideData::Country(c),
            )
        }
        SlideKind::SupplierProfile | SlideKind::BuyerProfile => {
            let (list, entries, label) = if entry.kind == SlideKind::SupplierProfile {
                (RankedList::Suppliers, &view.suppliers, "Supplier")
            } else {
                (RankedList::Buyers, &view.buyers, "Buyer")
            };
            let e = at_rank(entries, list, require_rank(entry)?, id)?;
            (format!("{} #{}: {}", label, e.rank, e.name), SlideData::Entity(e))
        }
        SlideKind::SupplierConcentration => (
            "Supplier Concentration".to_string(),
            entity_summary(&view.suppliers),
        ),
        SlideKind::BuyerConcentration => (
            "Buyer Concentration".to_string(),
            entity_summary(&view.buyers),
        ),
        SlideKind::MarketShareComparison => (
            "Market Share Comparison".to_string(),
            SlideData::ShareComparison {
                suppliers: head(&view.suppliers, FLOW_TOP_N),
                buyers: head(&view.buyers, FLOW_TOP_N),
            },
        ),
        SlideKind::RecordsOverview => {
            let records = processor.records();
            let total_value: f64 = records.iter().map(|r| r.total_value).sum();
            let batch_count = plan
                .section(crate::plan::SectionId::ShipmentRecords)
                .map(Section::len)
                .unwrap_or(0);
            (
                "Shipment Records Overview".to_string(),
                SlideData::RecordsOverview {
                    record_count: records.len(),
                    record_count_display: format_int(records.len()),
                    batch_size: plan.batch_size(),
                    batch_count,
                    total_value,
                    total_value_display: format_currency(total_value),
                },
            )
        }
        SlideKind::RecordBatch => {
            let (start, end) = match (entry.params.record_start, entry.params.record_end) {
                (Some(s), Some(e)) if s >= 1 && s <= e => (s, e),
                _ => {
                    return Err(ReportError::MalformedEntry {
                        slide_id: id,
                        reason: "record batch needs 1 <= recordStart <= recordEnd",
                    })
                }
            };
            let all = processor.records();
            if end > all.len() {
                return Err(ReportError::RankNotFound {
                    list: RankedList::Transactions,
                    rank: end,
                    len: all.len(),
                    slide_id: Some(id),
                });
            }
            let records = &all[start - 1..end];
            (
                format!("Shipment Records {}-{}", start, end),
                SlideData::RecordBatch {
                    record_start: start,
                    record_end: end,
                    records,
                    summary: batch_summary(records),
                },
            )
        }
    };

    Ok(Slide { id, kind: entry.kind, title, data })
}

fn require_rank(entry: &SlidePlanEntry) -> Result<usize> {
    match entry.params.rank {
        Some(rank) if rank >= 1 => Ok(rank),
        _ => Err(ReportError::MalformedEntry {
            slide_id: entry.id,
            reason: "ranked slide needs a rank of at least 1",
        }),
    }
}

fn at_rank<T>(entries: &[T], list: RankedList, rank: usize, slide_id: u32) -> Result<&T> {
    rank.checked_sub(1)
        .and_then(|idx| entries.get(idx))
        .ok_or(ReportError::RankNotFound {
            list,
            rank,
            len: entries.len(),
            slide_id: Some(slide_id),
        })
}

fn head<T>(entries: &[T], n: usize) -> &[T] {
    &entries[..entries.len().min(n)]
}

fn country_summary(entries: &[CountryEntry]) -> SlideData<'_> {
    let top3 = top_share(entries, 3, |c| c.share);
    SlideData::CountrySummary {
        entries: head(entries, SUMMARY_TOP_N),
        top3_share: top3,
        top3_share_display: format_percentage(top3),
    }
}

fn entity_summary(entries: &[EntityEntry]) -> SlideData<'_> {
    let top3 = top_share(entries, 3, |e| e.share);
    SlideData::EntitySummary {
        entries: head(entries, SUMMARY_TOP_N),
        top3_share: top3,
        top3_share_display: format_percentage(top3),
    }
}

/// One linear, non-resumable generation pass.
pub struct ReportRun<'a> {
    plan: &'a SlidePlan,
    processor: &'a DataProcessor,
    target: usize,
    state: RunState,
}

impl<'a> ReportRun<'a> {
    pub fn new(plan: &'a SlidePlan, processor: &'a DataProcessor, target: usize) -> Self {
        Self { plan, processor, target, state: RunState::NotStarted }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Validates the plan and the data it references, then renders every
    /// slide. Any failure leaves the run in [`RunState::Failed`] and no
    /// document is returned.
    pub fn execute<R: SlideRenderer + ?Sized>(
        &mut self,
        title: &str,
        renderer: &mut R,
    ) -> Result<ReportDocument> {
        if self.state != RunState::NotStarted {
            return Err(ReportError::InvalidInput("a report run can only execute once".into()));
        }
        self.state = RunState::Generating;
        match self.generate(title, renderer) {
            Ok(doc) => {
                self.state = RunState::Complete;
                Ok(doc)
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    fn generate<R: SlideRenderer + ?Sized>(
        &self,
        title: &str,
        renderer: &mut R,
    ) -> Result<ReportDocument> {
        self.plan.validate(self.target)?;
        check_view(self.processor.view(), self.plan, self.processor.records().len())?;

        let planned = self.plan.total_entries();
        info!(slides = planned, records = self.processor.records().len(), "generating report");

        let mut slides = Vec::with_capacity(planned);
        for section in self.plan.sections() {
            debug!(section = ?section.id, start = section.start_id, end = section.end_id, "rendering section");
            let range = (section.start_id as usize - 1)..(section.end_id as usize);
            for entry in &self.plan.entries()[range] {
                if !renderer.supports(entry.kind) {
                    return Err(ReportError::UnknownSlideKind { slide_id: entry.id, kind: entry.kind });
                }
                let slide = resolve(entry, self.plan, self.processor)?;
                let html = renderer.render(&slide)?;
                slides.push(RenderedSlide { id: slide.id, kind: slide.kind, title: slide.title, html });
            }
        }

        if slides.len() != planned {
            return Err(ReportError::StructureDeviation { expected: planned, actual: slides.len() });
        }
        slides.sort_by_key(|s| s.id);
        info!(slides = slides.len(), "report complete");
        Ok(ReportDocument { title: title.to_string(), slides })
    }
}

fn check_view(view: &NormalizedView, plan: &SlidePlan, record_count: usize) -> Result<()> {
    view.check_requirements(&plan.rank_requirements(), record_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::sample_input;
    use crate::plan::{build_plan, TARGET_SLIDES};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct TitleOnly {
        skip: Option<SlideKind>,
    }

    impl SlideRenderer for TitleOnly {
        fn supports(&self, kind: SlideKind) -> bool {
            Some(kind) != self.skip
        }

        fn render(&mut self, slide: &Slide<'_>) -> Result<String> {
            Ok(format!("<section>{}</section>", slide.title))
        }
    }

    fn processor(count: usize) -> DataProcessor {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        DataProcessor::new(&sample_input(), count, &mut rng).unwrap()
    }

    #[test]
    fn full_run_renders_every_planned_slide() {
        let plan = build_plan(2340, 10).unwrap();
        let proc = processor(2340);
        let mut run = ReportRun::new(&plan, &proc, TARGET_SLIDES);
        let doc = run.execute("deck", &mut TitleOnly { skip: None }).unwrap();
        assert_eq!(run.state(), RunState::Complete);
        assert_eq!(doc.len(), 297);
        let ids: Vec<u32> = doc.slides.iter().map(|s| s.id).collect();
        assert_eq!(ids, (1..=297).collect::<Vec<u32>>());
    }

    #[test]
    fn unsupported_kind_aborts_run() {
        let plan = build_plan(2340, 10).unwrap();
        let proc = processor(2340);
        let mut run = ReportRun::new(&plan, &proc, TARGET_SLIDES);
        let err = run
            .execute("deck", &mut TitleOnly { skip: Some(SlideKind::PriceHistory) })
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::UnknownSlideKind { slide_id: 6, kind: SlideKind::PriceHistory }
        ));
        assert_eq!(run.state(), RunState::Failed);
    }

    #[test]
    fn deviation_fails_before_rendering() {
        struct Counting(usize);
        impl SlideRenderer for Counting {
            fn supports(&self, _: SlideKind) -> bool {
                true
            }
            fn render(&mut self, _: &Slide<'_>) -> Result<String> {
                self.0 += 1;
                Ok(String::new())
            }
        }
        let plan = build_plan(100, 10).unwrap();
        let proc = processor(100);
        let mut renderer = Counting(0);
        let err = ReportRun::new(&plan, &proc, TARGET_SLIDES)
            .execute("deck", &mut renderer)
            .unwrap_err();
        assert!(matches!(err, ReportError::StructureDeviation { expected: 297, actual: 73 }));
        assert_eq!(renderer.0, 0);
    }

    #[test]
    fn missing_rank_names_slide() {
        let plan = build_plan(2340, 10).unwrap();
        let proc = processor(2340);
        let mut entry = plan.entries()[40];
        assert_eq!(entry.kind, SlideKind::SupplierProfile);
        entry.params.rank = Some(40);
        match resolve(&entry, &plan, &proc) {
            Err(ReportError::RankNotFound { list, rank, len, slide_id }) => {
                assert_eq!(list, RankedList::Suppliers);
                assert_eq!(rank, 40);
                assert_eq!(len, 12);
                assert_eq!(slide_id, Some(41));
            }
            other => panic!("expected RankNotFound, got {:?}", other.map(|s| s.title)),
        }
    }

    #[test]
    fn short_lists_fail_eagerly() {
        let mut raw = sample_input();
        raw.importing_countries.truncate(5);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let proc = DataProcessor::new(&raw, 2340, &mut rng).unwrap();
        let plan = build_plan(2340, 10).unwrap();
        let mut run = ReportRun::new(&plan, &proc, TARGET_SLIDES);
        let err = run.execute("deck", &mut TitleOnly { skip: None }).unwrap_err();
        assert!(matches!(
            err,
            ReportError::RankNotFound { list: RankedList::ImportingCountries, rank: 14, len: 5, slide_id: Some(23) }
        ));
    }

    #[test]
    fn batches_reassemble_records() {
        for (count, size) in [(2340usize, 10usize), (25, 10), (7, 3), (10, 10)] {
            let plan = build_plan(count, size).unwrap();
            let proc = processor(count);
            let slides = resolve_all(&plan, &proc).unwrap();
            let mut rebuilt: Vec<TransactionRecord> = Vec::new();
            let mut sizes = Vec::new();
            for slide in &slides {
                if let SlideData::RecordBatch { records, summary, .. } = &slide.data {
                    sizes.push(records.len());
                    assert_eq!(summary.record_count, records.len());
                    rebuilt.extend(records.iter().cloned());
                }
            }
            assert_eq!(rebuilt, proc.records());
            if count == 25 {
                assert_eq!(sizes, vec![10, 10, 5]);
            }
        }
    }

    #[test]
    fn summaries_carry_top_three_share() {
        let plan = build_plan(2340, 10).unwrap();
        let proc = processor(2340);
        let slide = resolve(&plan.entries()[8], &plan, &proc).unwrap();
        match slide.data {
            SlideData::CountrySummary { entries, top3_share, top3_share_display } => {
                assert_eq!(entries.len(), 10);
                assert_eq!(top3_share, 48.0);
                assert_eq!(top3_share_display, "48.0%");
            }
            _ => panic!("slide 9 should be the importing summary"),
        }
    }

    #[test]
    fn run_executes_once() {
        let plan = build_plan(2340, 10).unwrap();
        let proc = processor(2340);
        let mut run = ReportRun::new(&plan, &proc, TARGET_SLIDES);
        run.execute("deck", &mut TitleOnly { skip: None }).unwrap();
        assert!(run.execute("deck", &mut TitleOnly { skip: None }).is_err());
    }
}
