// Slide structure table.
//
// The plan is pure data: an ordered list of sections, each owning a
// contiguous run of slide IDs starting at 1. Only the shipment-records
// section depends on input (its length is the batch count); every other
// section has a fixed shape.

use crate::error::{RankedList, ReportError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Slide count the finished deck must have for the default 2340 records.
pub const TARGET_SLIDES: usize = 297;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_TRANSACTION_COUNT: usize = 2340;

pub const IMPORTING_PROFILES: usize = 14;
pub const EXPORTING_PROFILES: usize = 15;
pub const SUPPLIER_PROFILES: usize = 10;
pub const BUYER_PROFILES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideKind {
    Title,
    TableOfContents,
    ExecutiveSummary,
    ProductOverview,
    MarketOverview,
    PriceHistory,
    KeyMetrics,
    TradeFlowNetwork,
    ImportingSummary,
    ImportingCountry,
    ExportingSummary,
    ExportingCountry,
    SupplierProfile,
    BuyerProfile,
    SupplierConcentration,
    BuyerConcentration,
    MarketShareComparison,
    RecordsOverview,
    RecordBatch,
}

impl SlideKind {
    pub const ALL: [SlideKind; 19] = [
        SlideKind::Title,
        SlideKind::TableOfContents,
        SlideKind::ExecutiveSummary,
        SlideKind::ProductOverview,
        SlideKind::MarketOverview,
        SlideKind::PriceHistory,
        SlideKind::KeyMetrics,
        SlideKind::TradeFlowNetwork,
        SlideKind::ImportingSummary,
        SlideKind::ImportingCountry,
        SlideKind::ExportingSummary,
        SlideKind::ExportingCountry,
        SlideKind::SupplierProfile,
        SlideKind::BuyerProfile,
        SlideKind::SupplierConcentration,
        SlideKind::BuyerConcentration,
        SlideKind::MarketShareComparison,
        SlideKind::RecordsOverview,
        SlideKind::RecordBatch,
    ];

    /// The ranked list a `rank` parameter indexes, for kinds that take one.
    pub fn ranked_list(self) -> Option<RankedList> {
        match self {
            SlideKind::ImportingCountry => Some(RankedList::ImportingCountries),
            SlideKind::ExportingCountry => Some(RankedList::ExportingCountries),
            SlideKind::SupplierProfile => Some(RankedList::Suppliers),
            SlideKind::BuyerProfile => Some(RankedList::Buyers),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Overview,
    ImportingCountries,
    ExportingCountries,
    TradePartners,
    ShipmentOverview,
    ShipmentRecords,
}

impl SectionId {
    pub fn title(self) -> &'static str {
        match self {
            SectionId::Overview => "Market Overview",
            SectionId::ImportingCountries => "Importing Countries",
            SectionId::ExportingCountries => "Exporting Countries",
            SectionId::TradePartners => "Suppliers & Buyers",
            SectionId::ShipmentOverview => "Shipment Analysis",
            SectionId::ShipmentRecords => "Shipment Records",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RangeParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_end: Option<usize>,
}

impl RangeParams {
    fn rank(rank: usize) -> Self {
        RangeParams { rank: Some(rank), ..Default::default() }
    }

    fn records(start: usize, end: usize) -> Self {
        RangeParams { record_start: Some(start), record_end: Some(end), ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlidePlanEntry {
    pub id: u32,
    pub kind: SlideKind,
    pub params: RangeParams,
}

/// Highest rank a plan reads from one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankRequirement {
    pub rank: usize,
    /// First slide that reads `rank`.
    pub slide_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Section {
    pub id: SectionId,
    pub start_id: u32,
    pub end_id: u32,
}

impl Section {
    pub fn len(&self) -> usize {
        (self.end_id + 1 - self.start_id) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end_id < self.start_id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlidePlan {
    sections: Vec<Section>,
    entries: Vec<SlidePlanEntry>,
    transaction_count: usize,
    batch_size: usize,
}

/// Builds the plan for `transaction_count` records split into batches of
/// `batch_size`. Only a zero batch size is rejected; the total is checked
/// separately by [`SlidePlan::validate`].
pub fn build_plan(transaction_count: usize, batch_size: usize) -> Result<SlidePlan> {
    if batch_size == 0 {
        return Err(ReportError::InvalidInput("batch size must be at least 1".into()));
    }

    let mut builder = PlanBuilder::default();

    builder.section(SectionId::Overview, |b| {
        for kind in [
            SlideKind::Title,
            SlideKind::TableOfContents,
            SlideKind::ExecutiveSummary,
            SlideKind::ProductOverview,
            SlideKind::MarketOverview,
            SlideKind::PriceHistory,
            SlideKind::KeyMetrics,
            SlideKind::TradeFlowNetwork,
        ] {
            b.push(kind, RangeParams::default());
        }
    });

    builder.section(SectionId::ImportingCountries, |b| {
        b.push(SlideKind::ImportingSummary, RangeParams::default());
        for rank in 1..=IMPORTING_PROFILES {
            b.push(SlideKind::ImportingCountry, RangeParams::rank(rank));
        }
    });

    builder.section(SectionId::ExportingCountries, |b| {
        b.push(SlideKind::ExportingSummary, RangeParams::default());
        for rank in 1..=EXPORTING_PROFILES {
            b.push(SlideKind::ExportingCountry, RangeParams::rank(rank));
        }
    });

    builder.section(SectionId::TradePartners, |b| {
        for rank in 1..=SUPPLIER_PROFILES {
            b.push(SlideKind::SupplierProfile, RangeParams::rank(rank));
        }
        for rank in 1..=BUYER_PROFILES {
            b.push(SlideKind::BuyerProfile, RangeParams::rank(rank));
        }
        b.push(SlideKind::SupplierConcentration, RangeParams::default());
        b.push(SlideKind::BuyerConcentration, RangeParams::default());
        b.push(SlideKind::MarketShareComparison, RangeParams::default());
    });

    builder.section(SectionId::ShipmentOverview, |b| {
        b.push(SlideKind::RecordsOverview, RangeParams::default());
    });

    builder.section(SectionId::ShipmentRecords, |b| {
        for (start, end) in batch_ranges(transaction_count, batch_size) {
            b.push(SlideKind::RecordBatch, RangeParams::records(start, end));
        }
    });

    Ok(SlidePlan {
        sections: builder.sections,
        entries: builder.entries,
        transaction_count,
        batch_size,
    })
}

/// 1-based inclusive record ranges covering `1..=count` in steps of `size`.
pub fn batch_ranges(count: usize, size: usize) -> Vec<(usize, usize)> {
    if size == 0 {
        return Vec::new();
    }
    (0..count.div_ceil(size))
        .map(|i| (i * size + 1, ((i + 1) * size).min(count)))
        .collect()
}

#[derive(Default)]
struct PlanBuilder {
    sections: Vec<Section>,
    entries: Vec<SlidePlanEntry>,
}

struct SectionWriter<'a> {
    entries: &'a mut Vec<SlidePlanEntry>,
}

impl SectionWriter<'_> {
    fn push(&mut self, kind: SlideKind, params: RangeParams) {
        let id = self.entries.len() as u32 + 1;
        self.entries.push(SlidePlanEntry { id, kind, params });
    }
}

impl PlanBuilder {
    fn section(&mut self, id: SectionId, fill: impl FnOnce(&mut SectionWriter<'_>)) {
        let start_id = self.entries.len() as u32 + 1;
        fill(&mut SectionWriter { entries: &mut self.entries });
        let end_id = self.entries.len() as u32;
        self.sections.push(Section { id, start_id, end_id });
    }
}

impl SlidePlan {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn entries(&self) -> &[SlidePlanEntry] {
        &self.entries
    }

    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn total_entries(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }

    /// Fails unless the plan has exactly `expected` slides and its sections
    /// tile `1..=expected` without gaps or overlaps.
    pub fn validate(&self, expected: usize) -> Result<()> {
        let actual = self.total_entries();
        if actual != expected || self.entries.len() != expected {
            return Err(ReportError::StructureDeviation { expected, actual });
        }
        let mut next = 1u32;
        for section in &self.sections {
            if section.start_id != next {
                return Err(ReportError::MalformedEntry {
                    slide_id: section.start_id,
                    reason: "section range is not contiguous",
                });
            }
            next = section.end_id + 1;
        }
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.id as usize != idx + 1 {
                return Err(ReportError::MalformedEntry {
                    slide_id: entry.id,
                    reason: "slide ids are not sequential",
                });
            }
        }
        Ok(())
    }

    /// Highest rank each ranked list must provide for this plan to resolve,
    /// with the first slide that asks for it.
    pub fn rank_requirements(&self) -> BTreeMap<RankedList, RankRequirement> {
        let mut out: BTreeMap<RankedList, RankRequirement> = BTreeMap::new();
        let mut need = |list: RankedList, rank: usize, slide_id: u32| {
            let e = out.entry(list).or_insert(RankRequirement { rank: 0, slide_id });
            if rank > e.rank {
                *e = RankRequirement { rank, slide_id };
            }
        };
        for entry in &self.entries {
            if let (Some(list), Some(rank)) = (entry.kind.ranked_list(), entry.params.rank) {
                need(list, rank, entry.id);
            }
            if let Some(end) = entry.params.record_end {
                need(RankedList::Transactions, end, entry.id);
            }
        }
        out
    }

    /// Number of slides of each kind, in kind order.
    pub fn kind_counts(&self) -> BTreeMap<SlideKind, usize> {
        let mut out = BTreeMap::new();
        for entry in &self.entries {
            *out.entry(entry.kind).or_insert(0) += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_hits_target() {
        let plan = build_plan(DEFAULT_TRANSACTION_COUNT, DEFAULT_BATCH_SIZE).unwrap();
        let lens: Vec<usize> = plan.sections().iter().map(Section::len).collect();
        assert_eq!(lens, vec![8, 15, 16, 23, 1, 234]);
        assert_eq!(plan.total_entries(), TARGET_SLIDES);
        assert!(plan.validate(TARGET_SLIDES).is_ok());
    }

    #[test]
    fn sections_are_contiguous() {
        let plan = build_plan(2340, 10).unwrap();
        let ranges: Vec<(u32, u32)> =
            plan.sections().iter().map(|s| (s.start_id, s.end_id)).collect();
        assert_eq!(
            ranges,
            vec![(1, 8), (9, 23), (24, 39), (40, 62), (63, 63), (64, 297)]
        );
    }

    #[test]
    fn batch_count_is_ceiling() {
        let plan = build_plan(2340, 10).unwrap();
        let batches = plan.section(SectionId::ShipmentRecords).unwrap();
        assert_eq!(batches.len(), 234);
        assert_eq!(batch_ranges(25, 10), vec![(1, 10), (11, 20), (21, 25)]);
        assert!(batch_ranges(0, 10).is_empty());
    }

    #[test]
    fn short_final_batch_does_not_fail_to_build() {
        let plan = build_plan(2335, 10).unwrap();
        let last = plan.entries().last().unwrap();
        assert_eq!(last.params.record_start, Some(2331));
        assert_eq!(last.params.record_end, Some(2335));
        assert!(plan.validate(TARGET_SLIDES).is_ok());
    }

    #[test]
    fn deviation_is_fatal() {
        let plan = build_plan(2341, 10).unwrap();
        match plan.validate(TARGET_SLIDES) {
            Err(ReportError::StructureDeviation { expected, actual }) => {
                assert_eq!(expected, 297);
                assert_eq!(actual, 298);
            }
            other => panic!("expected deviation, got {:?}", other),
        }
        let plan = build_plan(2330, 10).unwrap();
        assert!(plan.validate(TARGET_SLIDES).is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(matches!(build_plan(10, 0), Err(ReportError::InvalidInput(_))));
    }

    #[test]
    fn rank_requirements_cover_profiles() {
        let plan = build_plan(2340, 10).unwrap();
        let req = plan.rank_requirements();
        let rank = |list: RankedList| req[&list].rank;
        assert_eq!(rank(RankedList::ImportingCountries), IMPORTING_PROFILES);
        assert_eq!(rank(RankedList::ExportingCountries), EXPORTING_PROFILES);
        assert_eq!(rank(RankedList::Suppliers), SUPPLIER_PROFILES);
        assert_eq!(rank(RankedList::Buyers), BUYER_PROFILES);
        assert_eq!(rank(RankedList::Transactions), 2340);
    }

    #[test]
    fn rank_requirements_name_the_first_slide() {
        let plan = build_plan(2340, 10).unwrap();
        let req = plan.rank_requirements();
        // Importing profiles run 10..=23, exporting 25..=39, suppliers 40..=49.
        assert_eq!(req[&RankedList::ImportingCountries].slide_id, 23);
        assert_eq!(req[&RankedList::ExportingCountries].slide_id, 39);
        assert_eq!(req[&RankedList::Suppliers].slide_id, 49);
        assert_eq!(req[&RankedList::Transactions].slide_id, 297);
    }

    #[test]
    fn every_kind_appears() {
        let plan = build_plan(2340, 10).unwrap();
        let counts = plan.kind_counts();
        for kind in SlideKind::ALL {
            assert!(counts.contains_key(&kind), "{:?} missing", kind);
        }
        assert_eq!(counts[&SlideKind::RecordBatch], 234);
    }
}
