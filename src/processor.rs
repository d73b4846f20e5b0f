use crate::error::{RankedList, ReportError, Result};
use crate::plan::RankRequirement;
use crate::types::{
    BatchSummary, CountryEntry, CountryFlow, EntityEntry, MarketBlock, NormalizedView, PriceEntry,
    ProductBlock, RawInput, TradeEntity, TransactionRecord,
};
use crate::util::{
    average, compute_share, format_currency, format_int, format_percentage,
    format_unit_price, month_end, parse_month,
};
use chrono::{Duration, NaiveDate};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Used as the newest shipment date when the input has no price history.
pub fn default_as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MIN)
}

/// Shipment dates fall within this many days before the as-of date.
const DATE_WINDOW_DAYS: i64 = 365;

/// Owns one normalized snapshot and the synthetic shipments derived from the
/// same input. Both are built once and never change.
#[derive(Debug, Clone)]
pub struct DataProcessor {
    view: NormalizedView,
    records: Vec<TransactionRecord>,
}

impl DataProcessor {
    pub fn new<R: Rng>(raw: &RawInput, record_count: usize, rng: &mut R) -> Result<Self> {
        let view = normalize(raw)?;
        let records = generate_transaction_records(raw, record_count, rng)?;
        debug!(
            records = records.len(),
            importing = view.importing_countries.len(),
            exporting = view.exporting_countries.len(),
            "aggregated input"
        );
        Ok(Self { view, records })
    }

    pub fn view(&self) -> &NormalizedView {
        &self.view
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }
}

pub fn normalize(raw: &RawInput) -> Result<NormalizedView> {
    if raw.market.total_records <= 0 {
        return Err(ReportError::InvalidInput(format!(
            "market.totalRecords must be positive, got {}",
            raw.market.total_records
        )));
    }
    if raw.product.name.trim().is_empty() {
        return Err(ReportError::InvalidInput("product.name is empty".into()));
    }
    if raw.product.code.trim().is_empty() {
        return Err(ReportError::InvalidInput("product.code is empty".into()));
    }
    if !raw.market.total_value.is_finite() || raw.market.total_value < 0.0 {
        return Err(ReportError::InvalidInput(format!(
            "market.totalValue must be a non-negative number, got {}",
            raw.market.total_value
        )));
    }

    warn_if_unsorted("importingCountries", raw.importing_countries.iter().map(|c| c.value));
    warn_if_unsorted("exportingCountries", raw.exporting_countries.iter().map(|c| c.value));
    warn_if_unsorted("topSuppliers", raw.top_suppliers.iter().map(|e| e.value));
    warn_if_unsorted("topBuyers", raw.top_buyers.iter().map(|e| e.value));

    let p = &raw.product;
    let product = ProductBlock {
        name: p.name.trim().to_string(),
        code: p.code.trim().to_string(),
        category: p.category.trim().to_string(),
        description: p.description.trim().to_string(),
        average_price: p.average_price,
        average_price_display: format_currency(p.average_price),
    };

    let m = &raw.market;
    let total_records = m.total_records as u64;
    let avg_transaction_value = m.total_value / total_records as f64;
    let market = MarketBlock {
        total_records,
        total_records_display: format_int(total_records),
        total_value: m.total_value,
        total_value_display: format_currency(m.total_value),
        avg_transaction_value,
        avg_transaction_value_display: format_currency(avg_transaction_value),
        volatility: m.volatility,
        volatility_display: format_percentage(m.volatility),
        min_price: m.min_price,
        max_price: m.max_price,
        price_range_display: format!(
            "{} to {}",
            format_currency(m.min_price),
            format_currency(m.max_price)
        ),
    };

    let mut price_history = Vec::with_capacity(raw.price_history.len());
    for point in &raw.price_history {
        let month = parse_month(&point.month).ok_or_else(|| {
            ReportError::InvalidInput(format!("price history month {:?} is not YYYY-MM", point.month))
        })?;
        price_history.push(PriceEntry {
            month,
            label: month.format("%b %Y").to_string(),
            price: point.price,
            price_display: format_currency(point.price),
        });
    }

    Ok(NormalizedView {
        product,
        market,
        importing_countries: rank_countries(&raw.importing_countries),
        exporting_countries: rank_countries(&raw.exporting_countries),
        suppliers: rank_entities(&raw.top_suppliers, m.total_value),
        buyers: rank_entities(&raw.top_buyers, m.total_value),
        price_history,
    })
}

fn warn_if_unsorted(list: &str, values: impl Iterator<Item = f64>) {
    let mut prev: Option<f64> = None;
    for (idx, v) in values.enumerate() {
        if let Some(p) = prev {
            if v > p {
                warn!(list, position = idx + 1, "ranked list is not sorted by value; keeping input order");
                return;
            }
        }
        prev = Some(v);
    }
}

fn rank_countries(flows: &[CountryFlow]) -> Vec<CountryEntry> {
    flows
        .iter()
        .enumerate()
        .map(|(idx, c)| CountryEntry {
            rank: idx + 1,
            country: c.country.trim().to_string(),
            value: c.value,
            value_display: format_currency(c.value),
            share: c.share,
            share_display: format_percentage(c.share),
            shipment_count: c.shipment_count,
            shipment_count_display: format_int(c.shipment_count),
        })
        .collect()
}

fn rank_entities(entities: &[TradeEntity], total_value: f64) -> Vec<EntityEntry> {
    entities
        .iter()
        .enumerate()
        .map(|(idx, e)| {
            let share = compute_share(e.value, total_value);
            EntityEntry {
                rank: idx + 1,
                name: e.name.trim().to_string(),
                country: e.country.trim().to_string(),
                value: e.value,
                value_display: format_currency(e.value),
                share,
                share_display: format_percentage(share),
            }
        })
        .collect()
}

impl NormalizedView {
    pub fn list_len(&self, list: RankedList) -> Option<usize> {
        match list {
            RankedList::ImportingCountries => Some(self.importing_countries.len()),
            RankedList::ExportingCountries => Some(self.exporting_countries.len()),
            RankedList::Suppliers => Some(self.suppliers.len()),
            RankedList::Buyers => Some(self.buyers.len()),
            RankedList::Transactions => None,
        }
    }

    /// Fails fast if any list is shorter than the highest rank a plan asks
    /// for. Transaction ranges are checked against `record_count`.
    pub fn check_requirements(
        &self,
        requirements: &BTreeMap<RankedList, RankRequirement>,
        record_count: usize,
    ) -> Result<()> {
        for (&list, req) in requirements {
            let len = self.list_len(list).unwrap_or(record_count);
            if req.rank > len {
                return Err(ReportError::RankNotFound {
                    list,
                    rank: req.rank,
                    len,
                    slide_id: Some(req.slide_id),
                });
            }
        }
        Ok(())
    }
}

/// Builds exactly `count` shipments. Suppliers and buyers are assigned
/// round-robin in rank order; date, quantity and price come from `rng`.
pub fn generate_transaction_records<R: Rng>(
    raw: &RawInput,
    count: usize,
    rng: &mut R,
) -> Result<Vec<TransactionRecord>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if raw.top_suppliers.is_empty() {
        return Err(ReportError::InvalidInput(
            "topSuppliers is empty; cannot assign shipment suppliers".into(),
        ));
    }
    if raw.top_buyers.is_empty() {
        return Err(ReportError::InvalidInput(
            "topBuyers is empty; cannot assign shipment buyers".into(),
        ));
    }

    let as_of = raw
        .price_history
        .iter()
        .filter_map(|p| parse_month(&p.month))
        .max()
        .map(month_end)
        .unwrap_or_else(default_as_of);
    let base_price = if raw.product.average_price > 0.0 {
        raw.product.average_price
    } else {
        1.0
    };

    let records = (0..count)
        .map(|i| {
            let supplier = &raw.top_suppliers[i % raw.top_suppliers.len()];
            let buyer = &raw.top_buyers[i % raw.top_buyers.len()];

            let date = as_of - Duration::days(rng.gen_range(0..DATE_WINDOW_DAYS));
            let quantity: u32 = rng.gen_range(100..=10_000);
            let factor: f64 = rng.gen_range(0.8..1.2);
            let unit_price = ((base_price * factor) * 100.0).round() / 100.0;

            TransactionRecord {
                id: format!("TXN-{:06}", i + 1),
                date,
                supplier_name: supplier.name.clone(),
                supplier_country: supplier.country.clone(),
                buyer_name: buyer.name.clone(),
                buyer_country: buyer.country.clone(),
                quantity,
                unit_price,
                total_value: quantity as f64 * unit_price,
                hs_code: raw.product.code.clone(),
                loading_port: port_for(&supplier.country),
                discharge_port: port_for(&buyer.country),
            }
        })
        .collect();
    Ok(records)
}

fn port_for(country: &str) -> String {
    let port = match country {
        "China" => "Shanghai",
        "United States" | "USA" => "Los Angeles",
        "Germany" => "Hamburg",
        "Netherlands" => "Rotterdam",
        "Japan" => "Yokohama",
        "South Korea" => "Busan",
        "Singapore" => "Singapore",
        "India" => "Nhava Sheva",
        "United Kingdom" => "Felixstowe",
        "Belgium" => "Antwerp",
        "France" => "Le Havre",
        "Italy" => "Genoa",
        "Spain" => "Valencia",
        "Brazil" => "Santos",
        "Canada" => "Vancouver",
        "Mexico" => "Manzanillo",
        "Australia" => "Melbourne",
        "Vietnam" => "Ho Chi Minh City",
        "Malaysia" => "Port Klang",
        "Thailand" => "Laem Chabang",
        "United Arab Emirates" | "UAE" => "Jebel Ali",
        "Taiwan" => "Kaohsiung",
        _ => return format!("{} (main port)", country),
    };
    port.to_string()
}

/// Summary figures for one batch of records.
pub fn batch_summary(records: &[TransactionRecord]) -> BatchSummary {
    let total_value: f64 = records.iter().map(|r| r.total_value).sum();
    let total_quantity: u64 = records.iter().map(|r| r.quantity as u64).sum();
    let prices: Vec<f64> = records.iter().map(|r| r.unit_price).collect();
    let quantities: Vec<f64> = records.iter().map(|r| r.quantity as f64).collect();
    let avg_unit_price = average(&prices);
    BatchSummary {
        record_count: records.len(),
        total_quantity,
        total_value,
        total_value_display: format_currency(total_value),
        avg_unit_price,
        avg_unit_price_display: format_unit_price(avg_unit_price),
        avg_quantity: average(&quantities),
    }
}

/// Combined share of the first `n` entries of a ranked list, from the raw
/// numeric shares.
pub fn top_share<T, F>(entries: &[T], n: usize, share: F) -> f64
where
    F: Fn(&T) -> f64,
{
    entries.iter().take(n).map(share).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::sample_input;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn ranks_are_contiguous() {
        let view = normalize(&sample_input()).unwrap();
        for ranks in [
            view.importing_countries.iter().map(|c| c.rank).collect::<Vec<_>>(),
            view.exporting_countries.iter().map(|c| c.rank).collect(),
            view.suppliers.iter().map(|e| e.rank).collect(),
            view.buyers.iter().map(|e| e.rank).collect(),
        ] {
            let expected: Vec<usize> = (1..=ranks.len()).collect();
            assert_eq!(ranks, expected);
        }
    }

    #[test]
    fn average_transaction_value_rounds_half_up() {
        let mut raw = sample_input();
        raw.market.total_value = 1_245_800_000.0;
        raw.market.total_records = 28_456;
        let view = normalize(&raw).unwrap();
        assert_eq!(view.market.avg_transaction_value_display, "$43,780");
        assert_eq!(view.market.total_records_display, "28,456");
    }

    #[test]
    fn supplier_share_against_total_value() {
        let mut raw = sample_input();
        raw.market.total_value = 1_245_800_000.0;
        raw.top_suppliers[0].value = 245_000_000.0;
        let view = normalize(&raw).unwrap();
        assert_eq!(view.suppliers[0].share_display, "19.7%");
        assert!((view.suppliers[0].share - 19.666).abs() < 0.01);
    }

    #[test]
    fn zero_total_value_gives_zero_shares() {
        let mut raw = sample_input();
        raw.market.total_value = 0.0;
        let view = normalize(&raw).unwrap();
        assert!(view.suppliers.iter().all(|e| e.share == 0.0));
        assert_eq!(view.market.avg_transaction_value, 0.0);
    }

    #[test]
    fn non_positive_record_count_is_invalid() {
        let mut raw = sample_input();
        raw.market.total_records = 0;
        assert!(matches!(normalize(&raw), Err(ReportError::InvalidInput(_))));
        raw.market.total_records = -5;
        assert!(matches!(normalize(&raw), Err(ReportError::InvalidInput(_))));
    }

    fn invalid_message(raw: &RawInput) -> String {
        match normalize(raw) {
            Err(ReportError::InvalidInput(msg)) => msg,
            other => panic!("expected InvalidInput, got {:?}", other.map(|v| v.product.name)),
        }
    }

    #[test]
    fn blank_product_fields_are_invalid() {
        let mut raw = sample_input();
        raw.product.name = "   ".into();
        assert!(invalid_message(&raw).contains("product.name"));

        let mut raw = sample_input();
        raw.product.code = String::new();
        assert!(invalid_message(&raw).contains("product.code"));
    }

    #[test]
    fn bad_total_value_is_invalid() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let mut raw = sample_input();
            raw.market.total_value = bad;
            assert!(invalid_message(&raw).contains("market.totalValue"), "{}", bad);
        }
    }

    #[test]
    fn unsorted_lists_keep_input_order() {
        let mut raw = sample_input();
        raw.top_buyers.swap(0, 1);
        raw.importing_countries.reverse();
        let view = normalize(&raw).unwrap();
        assert_eq!(view.buyers[0].name, raw.top_buyers[0].name);
        assert_eq!(view.buyers[0].rank, 1);
        assert_eq!(view.importing_countries[0].country, "Brazil");
        assert_eq!(view.importing_countries[14].rank, 15);
    }

    #[test]
    fn bad_price_month_is_invalid() {
        let mut raw = sample_input();
        raw.price_history[0].month = "January".into();
        assert!(matches!(normalize(&raw), Err(ReportError::InvalidInput(_))));
    }

    #[test]
    fn generates_exact_count_round_robin() {
        let raw = sample_input();
        let records = generate_transaction_records(&raw, 2340, &mut rng()).unwrap();
        assert_eq!(records.len(), 2340);
        let n_sup = raw.top_suppliers.len();
        let n_buy = raw.top_buyers.len();
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.supplier_name, raw.top_suppliers[i % n_sup].name);
            assert_eq!(r.supplier_country, raw.top_suppliers[i % n_sup].country);
            assert_eq!(r.buyer_name, raw.top_buyers[i % n_buy].name);
            assert_eq!(r.buyer_country, raw.top_buyers[i % n_buy].country);
            assert_eq!(r.total_value, r.quantity as f64 * r.unit_price);
            assert_eq!(r.hs_code, raw.product.code);
        }
        assert_eq!(records[0].id, "TXN-000001");
        assert_eq!(records[2339].id, "TXN-002340");
    }

    #[test]
    fn zero_records_is_empty_not_error() {
        let mut raw = sample_input();
        raw.top_suppliers.clear();
        let records = generate_transaction_records(&raw, 0, &mut rng()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn dates_stay_inside_window() {
        let raw = sample_input();
        let records = generate_transaction_records(&raw, 500, &mut rng()).unwrap();
        let newest = raw
            .price_history
            .iter()
            .filter_map(|p| parse_month(&p.month))
            .max()
            .map(month_end)
            .unwrap();
        for r in &records {
            assert!(r.date <= newest);
            assert!(r.date > newest - Duration::days(DATE_WINDOW_DAYS));
        }
    }

    #[test]
    fn same_seed_same_records() {
        let raw = sample_input();
        let a = generate_transaction_records(&raw, 50, &mut rng()).unwrap();
        let b = generate_transaction_records(&raw, 50, &mut rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn short_batch_averages_over_its_own_length() {
        let raw = sample_input();
        let records = generate_transaction_records(&raw, 25, &mut rng()).unwrap();
        let tail = &records[20..25];
        let summary = batch_summary(tail);
        assert_eq!(summary.record_count, 5);
        let expected: f64 = tail.iter().map(|r| r.unit_price).sum::<f64>() / 5.0;
        assert!((summary.avg_unit_price - expected).abs() < 1e-9);
        let empty = batch_summary(&[]);
        assert_eq!(empty.avg_unit_price, 0.0);
    }

    #[test]
    fn requirements_fail_fast_with_bounds() {
        let mut raw = sample_input();
        raw.top_suppliers.truncate(8);
        let view = normalize(&raw).unwrap();
        let mut req = BTreeMap::new();
        req.insert(RankedList::Suppliers, RankRequirement { rank: 10, slide_id: 49 });
        match view.check_requirements(&req, 0) {
            Err(ReportError::RankNotFound { list, rank, len, slide_id }) => {
                assert_eq!(list, RankedList::Suppliers);
                assert_eq!(rank, 10);
                assert_eq!(len, 8);
                assert_eq!(slide_id, Some(49));
            }
            other => panic!("expected RankNotFound, got {:?}", other),
        }
    }

    #[test]
    fn top_three_share_uses_raw_values() {
        let view = normalize(&sample_input()).unwrap();
        let combined = top_share(&view.importing_countries, 3, |c| c.share);
        let manual: f64 = view.importing_countries[..3].iter().map(|c| c.share).sum();
        assert_eq!(combined, manual);
    }
}
