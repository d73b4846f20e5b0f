use crate::error::Result;
use crate::types::{CountryFlow, MarketTotals, PricePoint, ProductInfo, RawInput, TradeEntity};
use crate::util::parse_month;
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(alias = "Month")]
    month: Option<String>,
    #[serde(alias = "Price")]
    price: Option<String>,
}

/// Read a `RawInput` from a JSON document with camelCase keys.
pub fn load_input(path: impl AsRef<Path>) -> Result<RawInput> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let raw: RawInput = serde_json::from_reader(reader)?;
    info!(
        path = %path.display(),
        product = %raw.product.name,
        importing = raw.importing_countries.len(),
        exporting = raw.exporting_countries.len(),
        "loaded input"
    );
    Ok(raw)
}

/// Read a `month,price` CSV into a price series. Rows whose month is not
/// `YYYY-MM` or whose price is not a number are skipped and counted.
pub fn load_price_history_csv(path: impl AsRef<Path>) -> Result<(Vec<PricePoint>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_path(path)?;
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut points = Vec::new();

    for result in rdr.deserialize::<PriceRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };
        let month = match row.month.as_deref().map(str::trim) {
            Some(m) if parse_month(m).is_some() => m.to_string(),
            _ => {
                parse_errors += 1;
                continue;
            }
        };
        let price = match row.price.as_deref().and_then(parse_price) {
            Some(p) => p,
            None => {
                parse_errors += 1;
                continue;
            }
        };
        points.push(PricePoint { month, price });
    }

    if parse_errors > 0 {
        warn!(parse_errors, "skipped malformed price rows");
    }
    let report = LoadReport { total_rows, loaded_rows: points.len(), parse_errors };
    Ok((points, report))
}

/// Accepts `1820.5`, `1,820.50` or `$1,820.50`.
fn parse_price(s: &str) -> Option<f64> {
    let s = s.trim().trim_start_matches('$').replace(',', "");
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

static SAMPLE: Lazy<RawInput> = Lazy::new(build_sample);

/// The built-in demonstration dataset.
pub fn sample_input() -> RawInput {
    SAMPLE.clone()
}

fn country(country: &str, value: f64, share: f64, shipment_count: u64) -> CountryFlow {
    CountryFlow { country: country.to_string(), value, share, shipment_count }
}

fn entity(name: &str, country: &str, value: f64) -> TradeEntity {
    TradeEntity { name: name.to_string(), country: country.to_string(), value }
}

fn build_sample() -> RawInput {
    RawInput {
        product: ProductInfo {
            name: "Lithium-Ion Battery Cells".into(),
            code: "850760".into(),
            category: "Electrical Machinery".into(),
            description: "Rechargeable lithium-ion accumulators for EVs and storage".into(),
            average_price: 182.4,
        },
        market: MarketTotals {
            total_records: 28_456,
            total_value: 1_245_800_000.0,
            volatility: 12.4,
            min_price: 151.2,
            max_price: 214.9,
        },
        importing_countries: vec![
            country("United States", 298_992_000.0, 24.0, 6_829),
            country("Germany", 174_412_000.0, 14.0, 3_984),
            country("Japan", 124_580_000.0, 10.0, 2_846),
            country("South Korea", 99_664_000.0, 8.0, 2_276),
            country("Netherlands", 87_206_000.0, 7.0, 1_992),
            country("United Kingdom", 74_748_000.0, 6.0, 1_707),
            country("France", 62_290_000.0, 5.0, 1_423),
            country("Canada", 56_061_000.0, 4.5, 1_280),
            country("Italy", 49_832_000.0, 4.0, 1_138),
            country("Belgium", 43_603_000.0, 3.5, 996),
            country("Spain", 37_374_000.0, 3.0, 854),
            country("Australia", 31_145_000.0, 2.5, 711),
            country("Mexico", 24_916_000.0, 2.0, 569),
            country("Singapore", 18_687_000.0, 1.5, 427),
            country("Brazil", 12_458_000.0, 1.0, 285),
        ],
        exporting_countries: vec![
            country("China", 423_572_000.0, 34.0, 9_675),
            country("South Korea", 186_870_000.0, 15.0, 4_268),
            country("Japan", 149_496_000.0, 12.0, 3_415),
            country("Germany", 87_206_000.0, 7.0, 1_992),
            country("United States", 74_748_000.0, 6.0, 1_707),
            country("Poland", 62_290_000.0, 5.0, 1_423),
            country("Hungary", 49_832_000.0, 4.0, 1_138),
            country("Vietnam", 43_603_000.0, 3.5, 996),
            country("Malaysia", 37_374_000.0, 3.0, 854),
            country("Taiwan", 31_145_000.0, 2.5, 711),
            country("Thailand", 24_916_000.0, 2.0, 569),
            country("India", 18_687_000.0, 1.5, 427),
            country("Indonesia", 18_687_000.0, 1.5, 427),
            country("Mexico", 12_458_000.0, 1.0, 285),
            country("Canada", 12_458_000.0, 1.0, 285),
        ],
        top_suppliers: vec![
            entity("Contemporary Amperex Technology", "China", 245_000_000.0),
            entity("LG Energy Solution", "South Korea", 148_300_000.0),
            entity("Panasonic Energy", "Japan", 112_600_000.0),
            entity("BYD Company", "China", 98_400_000.0),
            entity("Samsung SDI", "South Korea", 71_900_000.0),
            entity("SK On", "South Korea", 58_200_000.0),
            entity("CALB Group", "China", 41_700_000.0),
            entity("Gotion High-Tech", "China", 33_500_000.0),
            entity("EVE Energy", "China", 27_800_000.0),
            entity("Envision AESC", "Japan", 22_100_000.0),
            entity("Northvolt", "Germany", 15_400_000.0),
            entity("Sunwoda Electronic", "China", 11_900_000.0),
        ],
        top_buyers: vec![
            entity("Tesla Inc.", "United States", 188_500_000.0),
            entity("Volkswagen AG", "Germany", 121_700_000.0),
            entity("BMW Group", "Germany", 84_300_000.0),
            entity("Ford Motor Company", "United States", 69_800_000.0),
            entity("Hyundai Motor Group", "South Korea", 57_200_000.0),
            entity("Stellantis N.V.", "Netherlands", 48_600_000.0),
            entity("General Motors", "United States", 44_100_000.0),
            entity("Toyota Motor Corporation", "Japan", 39_900_000.0),
            entity("Mercedes-Benz Group", "Germany", 33_400_000.0),
            entity("Renault Group", "France", 25_700_000.0),
            entity("Fluence Energy", "United States", 18_300_000.0),
            entity("Jaguar Land Rover", "United Kingdom", 12_600_000.0),
        ],
        price_history: [
            ("2024-01", 174.95),
            ("2024-02", 176.38),
            ("2024-03", 179.12),
            ("2024-04", 183.06),
            ("2024-05", 188.21),
            ("2024-06", 186.87),
            ("2024-07", 183.99),
            ("2024-08", 180.34),
            ("2024-09", 181.61),
            ("2024-10", 184.28),
            ("2024-11", 186.95),
            ("2024-12", 182.40),
        ]
        .into_iter()
        .map(|(month, price)| PricePoint { month: month.to_string(), price })
        .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sample_covers_default_plan() {
        let raw = sample_input();
        assert!(raw.importing_countries.len() >= crate::plan::IMPORTING_PROFILES);
        assert!(raw.exporting_countries.len() >= crate::plan::EXPORTING_PROFILES);
        assert!(raw.top_suppliers.len() >= crate::plan::SUPPLIER_PROFILES);
        assert!(raw.top_buyers.len() >= crate::plan::BUYER_PROFILES);
    }

    #[test]
    fn sample_lists_are_descending() {
        let raw = sample_input();
        for w in raw.top_suppliers.windows(2) {
            assert!(w[0].value >= w[1].value);
        }
        for w in raw.importing_countries.windows(2) {
            assert!(w[0].value >= w[1].value);
        }
    }

    #[test]
    fn json_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        let raw = sample_input();
        std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();
        let loaded = load_input(&path).unwrap();
        assert_eq!(loaded.product.name, raw.product.name);
        assert_eq!(loaded.top_buyers.len(), raw.top_buyers.len());
        assert_eq!(loaded.market.total_records, 28_456);
    }

    #[test]
    fn json_missing_market_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, r#"{"product":{"name":"x","code":"1"}}"#).unwrap();
        assert!(matches!(load_input(&path), Err(crate::error::ReportError::Json(_))));
    }

    #[test]
    fn price_csv_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "month,price").unwrap();
        writeln!(f, "2024-01,\"$41,950.00\"").unwrap();
        writeln!(f, "2024-02,42380").unwrap();
        writeln!(f, "Feb,42380").unwrap();
        writeln!(f, "2024-03,n/a").unwrap();
        drop(f);

        let (points, report) = load_price_history_csv(&path).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.parse_errors, 2);
        assert_eq!(points[0].price, 41_950.0);
        assert_eq!(points[1].month, "2024-02");
    }
}
