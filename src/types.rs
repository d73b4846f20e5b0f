use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

// ---- Raw input (as supplied by the data loader) ----

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInput {
    pub product: ProductInfo,
    pub market: MarketTotals,
    #[serde(default)]
    pub importing_countries: Vec<CountryFlow>,
    #[serde(default)]
    pub exporting_countries: Vec<CountryFlow>,
    #[serde(default)]
    pub top_suppliers: Vec<TradeEntity>,
    #[serde(default)]
    pub top_buyers: Vec<TradeEntity>,
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub average_price: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTotals {
    pub total_records: i64,
    pub total_value: f64,
    #[serde(default)]
    pub volatility: f64,
    #[serde(default)]
    pub min_price: f64,
    #[serde(default)]
    pub max_price: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryFlow {
    pub country: String,
    pub value: f64,
    #[serde(default)]
    pub share: f64,
    #[serde(default)]
    pub shipment_count: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEntity {
    pub name: String,
    pub country: String,
    pub value: f64,
}

/// One month of the price series; `month` is `YYYY-MM`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricePoint {
    pub month: String,
    pub price: f64,
}

// ---- Normalized view ----

#[derive(Debug, Clone, Serialize)]
pub struct NormalizedView {
    pub product: ProductBlock,
    pub market: MarketBlock,
    pub importing_countries: Vec<CountryEntry>,
    pub exporting_countries: Vec<CountryEntry>,
    pub suppliers: Vec<EntityEntry>,
    pub buyers: Vec<EntityEntry>,
    pub price_history: Vec<PriceEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductBlock {
    pub name: String,
    pub code: String,
    pub category: String,
    pub description: String,
    pub average_price: f64,
    pub average_price_display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketBlock {
    pub total_records: u64,
    pub total_records_display: String,
    pub total_value: f64,
    pub total_value_display: String,
    pub avg_transaction_value: f64,
    pub avg_transaction_value_display: String,
    pub volatility: f64,
    pub volatility_display: String,
    pub min_price: f64,
    pub max_price: f64,
    pub price_range_display: String,
}

/// A ranked country. Raw numbers are kept next to their display strings so
/// callers can keep doing arithmetic on them.
#[derive(Debug, Clone, Serialize)]
pub struct CountryEntry {
    pub rank: usize,
    pub country: String,
    pub value: f64,
    pub value_display: String,
    pub share: f64,
    pub share_display: String,
    pub shipment_count: u64,
    pub shipment_count_display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityEntry {
    pub rank: usize,
    pub name: String,
    pub country: String,
    pub value: f64,
    pub value_display: String,
    pub share: f64,
    pub share_display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceEntry {
    pub month: NaiveDate,
    pub label: String,
    pub price: f64,
    pub price_display: String,
}

// ---- Synthetic shipments ----

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct TransactionRecord {
    #[serde(rename = "Id")]
    #[tabled(rename = "Id")]
    pub id: String,
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "SupplierName")]
    #[tabled(rename = "Supplier")]
    pub supplier_name: String,
    #[serde(rename = "SupplierCountry")]
    #[tabled(rename = "From")]
    pub supplier_country: String,
    #[serde(rename = "BuyerName")]
    #[tabled(rename = "Buyer")]
    pub buyer_name: String,
    #[serde(rename = "BuyerCountry")]
    #[tabled(rename = "To")]
    pub buyer_country: String,
    #[serde(rename = "Quantity")]
    #[tabled(rename = "Qty")]
    pub quantity: u32,
    #[serde(rename = "UnitPrice")]
    #[tabled(rename = "UnitPrice")]
    pub unit_price: f64,
    #[serde(rename = "TotalValue")]
    #[tabled(rename = "TotalValue")]
    pub total_value: f64,
    #[serde(rename = "HsCode")]
    #[tabled(skip)]
    pub hs_code: String,
    #[serde(rename = "LoadingPort")]
    #[tabled(skip)]
    pub loading_port: String,
    #[serde(rename = "DischargePort")]
    #[tabled(skip)]
    pub discharge_port: String,
}

/// Statistics over one batch. Averages divide by the batch's own length, so
/// a short trailing batch reports its real figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub record_count: usize,
    pub total_quantity: u64,
    pub total_value: f64,
    pub total_value_display: String,
    pub avg_unit_price: f64,
    pub avg_unit_price_display: String,
    pub avg_quantity: f64,
}
