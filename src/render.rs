// String-template HTML renderer.
//
// Fragments are plain `format!` output; the page shell, stylesheet and
// navigation script come from an immutable `TemplateConfig`. Growth
// arrows, reliability scores and flow weights are decoration only and come
// from a `Cosmetics` source so tests can pin them.

use crate::assembly::{ReportDocument, Slide, SlideData, SlideRenderer};
use crate::error::Result;
use crate::plan::SlideKind;
use crate::types::{CountryEntry, EntityEntry, TransactionRecord};
use crate::util::{escape_html, format_decimal, format_int, format_percentage, format_unit_price};
use rand::Rng;
use std::fmt::Write as _;

/// Decorative figures with no business meaning.
pub trait Cosmetics {
    /// Year-over-year growth in percent, roughly -15..25.
    fn growth_pct(&mut self) -> f64;
    /// Supplier/buyer reliability score, 0..=100.
    fn reliability_score(&mut self) -> u8;
    /// Relative width of a trade-flow edge, 1..=10.
    fn flow_weight(&mut self) -> u8;
}

/// Cosmetics drawn from any `rand` generator.
pub struct RandomCosmetics<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomCosmetics<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Cosmetics for RandomCosmetics<R> {
    fn growth_pct(&mut self) -> f64 {
        self.rng.gen_range(-15.0..25.0)
    }

    fn reliability_score(&mut self) -> u8 {
        self.rng.gen_range(70..=99)
    }

    fn flow_weight(&mut self) -> u8 {
        self.rng.gen_range(1..=10)
    }
}

/// Constant cosmetics for reproducible output.
#[derive(Debug, Clone, Copy)]
pub struct FixedCosmetics {
    pub growth_pct: f64,
    pub reliability_score: u8,
    pub flow_weight: u8,
}

impl Default for FixedCosmetics {
    fn default() -> Self {
        Self { growth_pct: 5.0, reliability_score: 90, flow_weight: 5 }
    }
}

impl Cosmetics for FixedCosmetics {
    fn growth_pct(&mut self) -> f64 {
        self.growth_pct
    }

    fn reliability_score(&mut self) -> u8 {
        self.reliability_score
    }

    fn flow_weight(&mut self) -> u8 {
        self.flow_weight
    }
}

#[derive(Debug, Clone)]
pub struct TemplateConfig {
    pub document_title: String,
    pub stylesheet: String,
    pub navigation_script: String,
    pub footer: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            document_title: "Global Trade Market Report".to_string(),
            stylesheet: DEFAULT_CSS.to_string(),
            navigation_script: DEFAULT_JS.to_string(),
            footer: "Generated by trade_deck".to_string(),
        }
    }
}

const DEFAULT_CSS: &str = r#"
body { margin: 0; font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; background: #0f172a; }
.slide { display: none; box-sizing: border-box; width: 1280px; min-height: 720px; margin: 2rem auto; padding: 3rem; background: #ffffff; color: #111827; }
.slide.active { display: block; }
.slide h2 { margin-top: 0; font-size: 2rem; }
.slide .slide-no { float: right; color: #6b7280; font-size: 0.875rem; }
table { width: 100%; border-collapse: collapse; font-size: 0.875rem; }
th, td { padding: 0.4rem 0.6rem; border-bottom: 1px solid #e5e7eb; text-align: left; }
.metric { display: inline-block; min-width: 220px; margin: 0 1rem 1rem 0; padding: 1rem; border-radius: 8px; background: #f3f4f6; }
.metric .value { font-size: 1.5rem; font-weight: 700; }
.up { color: #059669; }
.down { color: #dc2626; }
.bar { height: 12px; background: #2563eb; border-radius: 3px; }
footer { text-align: center; color: #9ca3af; font-size: 0.75rem; padding: 1rem; }
"#;

const DEFAULT_JS: &str = r#"
(function () {
  var slides = document.querySelectorAll('.slide');
  var current = 0;
  function show(i) {
    if (i < 0 || i >= slides.length) return;
    slides[current].classList.remove('active');
    current = i;
    slides[current].classList.add('active');
  }
  document.addEventListener('keydown', function (e) {
    if (e.key === 'ArrowRight' || e.key === 'PageDown') show(current + 1);
    if (e.key === 'ArrowLeft' || e.key === 'PageUp') show(current - 1);
    if (e.key === 'Home') show(0);
    if (e.key === 'End') show(slides.length - 1);
  });
  if (slides.length) slides[0].classList.add('active');
})();
"#;

pub struct HtmlRenderer {
    cosmetics: Box<dyn Cosmetics>,
}

impl HtmlRenderer {
    pub fn new(cosmetics: Box<dyn Cosmetics>) -> Self {
        Self { cosmetics }
    }

    fn trend(&mut self) -> String {
        let g = self.cosmetics.growth_pct();
        let (class, arrow) = if g >= 0.0 { ("up", "▲") } else { ("down", "▼") };
        format!(r#"<span class="{}">{} {}</span>"#, class, arrow, format_percentage(g.abs()))
    }

    fn body(&mut self, slide: &Slide<'_>) -> String {
        match &slide.data {
            SlideData::Product(p) => {
                if slide.kind == SlideKind::Title {
                    format!(
                        "<p class=\"subtitle\">{} &middot; HS {}</p><p>{}</p>",
                        escape_html(&p.category),
                        escape_html(&p.code),
                        escape_html(&p.description)
                    )
                } else {
                    let mut s = String::new();
                    s.push_str(&metric("HS code", &escape_html(&p.code)));
                    s.push_str(&metric("Category", &escape_html(&p.category)));
                    s.push_str(&metric("Average price", &p.average_price_display));
                    let _ = write!(s, "<p>{}</p>", escape_html(&p.description));
                    s
                }
            }
            SlideData::Market(m) => {
                let mut s = String::new();
                s.push_str(&metric("Total trade value", &m.total_value_display));
                s.push_str(&metric("Shipment records", &m.total_records_display));
                s.push_str(&metric("Avg transaction", &m.avg_transaction_value_display));
                s.push_str(&metric("Price range", &m.price_range_display));
                s.push_str(&metric("Volatility", &m.volatility_display));
                if slide.kind == SlideKind::KeyMetrics {
                    let trend = self.trend();
                    s.push_str(&metric("Year over year", &trend));
                }
                s
            }
            SlideData::Contents { sections } => {
                let mut s = String::from("<ol>");
                for sec in sections.iter() {
                    let _ = write!(
                        s,
                        "<li>{} <small>(slides {}-{})</small></li>",
                        escape_html(sec.id.title()),
                        sec.start_id,
                        sec.end_id
                    );
                }
                s.push_str("</ol>");
                s
            }
            SlideData::PriceHistory { points } => {
                let max = points.iter().map(|p| p.price).fold(0.0_f64, f64::max);
                let mut s = String::from("<table><tr><th>Month</th><th>Price</th><th></th></tr>");
                for p in points.iter() {
                    let width = if max > 0.0 { p.price / max * 100.0 } else { 0.0 };
                    let _ = write!(
                        s,
                        "<tr><td>{}</td><td>{}</td><td><div class=\"bar\" style=\"width:{:.0}%\"></div></td></tr>",
                        escape_html(&p.label),
                        p.price_display,
                        width
                    );
                }
                s.push_str("</table>");
                s
            }
            SlideData::ExecutiveSummary {
                product,
                market,
                top_importer,
                top_exporter,
                top_supplier,
                top_buyer,
            } => {
                let trend = self.trend();
                format!(
                    "<p>The {} market recorded {} across {} shipments ({} per transaction), trend {}.</p>\
                     <ul><li>Top importer: {} ({})</li><li>Top exporter: {} ({})</li>\
                     <li>Top supplier: {} ({})</li><li>Top buyer: {} ({})</li></ul>",
                    escape_html(&product.name),
                    market.total_value_display,
                    market.total_records_display,
                    market.avg_transaction_value_display,
                    trend,
                    escape_html(&top_importer.country),
                    top_importer.share_display,
                    escape_html(&top_exporter.country),
                    top_exporter.share_display,
                    escape_html(&top_supplier.name),
                    top_supplier.share_display,
                    escape_html(&top_buyer.name),
                    top_buyer.share_display,
                )
            }
            SlideData::TradeFlows { exporters, importers } => {
                let mut s = String::from("<ul class=\"flows\">");
                for (from, to) in exporters.iter().zip(importers.iter()) {
                    let weight = self.cosmetics.flow_weight();
                    let _ = write!(
                        s,
                        "<li data-weight=\"{}\">{} &rarr; {}</li>",
                        weight,
                        escape_html(&from.country),
                        escape_html(&to.country)
                    );
                }
                s.push_str("</ul>");
                s
            }
            SlideData::CountrySummary { entries, top3_share_display, .. } => {
                let mut s = country_table(entries);
                let _ = write!(s, "<p>Top 3 combined share: <strong>{}</strong></p>", top3_share_display);
                s
            }
            SlideData::Country(c) => {
                let trend = self.trend();
                let mut s = String::new();
                s.push_str(&metric("Trade value", &c.value_display));
                s.push_str(&metric("Market share", &c.share_display));
                s.push_str(&metric("Shipments", &c.shipment_count_display));
                s.push_str(&metric("Growth", &trend));
                s
            }
            SlideData::Entity(e) => {
                let score = self.cosmetics.reliability_score();
                let mut s = String::new();
                s.push_str(&metric("Country", &escape_html(&e.country)));
                s.push_str(&metric("Trade value", &e.value_display));
                s.push_str(&metric("Market share", &e.share_display));
                s.push_str(&metric("Reliability", &format!("{}/100", score)));
                s
            }
            SlideData::EntitySummary { entries, top3_share_display, .. } => {
                let mut s = entity_table(entries);
                let _ = write!(s, "<p>Top 3 combined share: <strong>{}</strong></p>", top3_share_display);
                s
            }
            SlideData::ShareComparison { suppliers, buyers } => {
                format!(
                    "<div class=\"cols\"><div><h3>Suppliers</h3>{}</div><div><h3>Buyers</h3>{}</div></div>",
                    entity_table(suppliers),
                    entity_table(buyers)
                )
            }
            SlideData::RecordsOverview {
                record_count_display,
                batch_size,
                batch_count,
                total_value_display,
                ..
            } => {
                let mut s = String::new();
                s.push_str(&metric("Records", record_count_display));
                s.push_str(&metric("Per slide", &format_int(*batch_size)));
                s.push_str(&metric("Record slides", &format_int(*batch_count)));
                s.push_str(&metric("Total value", total_value_display));
                s
            }
            SlideData::RecordBatch { records, summary, .. } => {
                let mut s = records_table(records);
                let _ = write!(
                    s,
                    "<p>{} records &middot; total {} &middot; avg unit price {} &middot; avg quantity {}</p>",
                    summary.record_count,
                    summary.total_value_display,
                    summary.avg_unit_price_display,
                    format_decimal(summary.avg_quantity, 1)
                );
                s
            }
        }
    }
}

impl SlideRenderer for HtmlRenderer {
    fn supports(&self, _kind: SlideKind) -> bool {
        // `body` matches every data variant.
        true
    }

    fn render(&mut self, slide: &Slide<'_>) -> Result<String> {
        let body = self.body(slide);
        Ok(format!(
            "<section class=\"slide\" id=\"slide-{id}\" data-kind=\"{kind}\"><span class=\"slide-no\">{id}</span><h2>{title}</h2>{body}</section>",
            id = slide.id,
            kind = kind_slug(slide.kind),
            title = escape_html(&slide.title),
            body = body,
        ))
    }
}

fn kind_slug(kind: SlideKind) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn metric(label: &str, value: &str) -> String {
    format!(
        "<div class=\"metric\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
        label, value
    )
}

fn country_table(entries: &[CountryEntry]) -> String {
    let mut s = String::from("<table><tr><th>#</th><th>Country</th><th>Value</th><th>Share</th><th>Shipments</th></tr>");
    for c in entries {
        let _ = write!(
            s,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            c.rank,
            escape_html(&c.country),
            c.value_display,
            c.share_display,
            c.shipment_count_display
        );
    }
    s.push_str("</table>");
    s
}

fn entity_table(entries: &[EntityEntry]) -> String {
    let mut s = String::from("<table><tr><th>#</th><th>Name</th><th>Country</th><th>Value</th><th>Share</th></tr>");
    for e in entries {
        let _ = write!(
            s,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            e.rank,
            escape_html(&e.name),
            escape_html(&e.country),
            e.value_display,
            e.share_display
        );
    }
    s.push_str("</table>");
    s
}

fn records_table(records: &[TransactionRecord]) -> String {
    let mut s = String::from(
        "<table><tr><th>ID</th><th>Date</th><th>Supplier</th><th>Buyer</th><th>Route</th><th>Qty</th><th>Unit price</th><th>Value</th></tr>",
    );
    for r in records {
        let _ = write!(
            s,
            "<tr><td>{}</td><td>{}</td><td>{} ({})</td><td>{} ({})</td><td>{} &rarr; {}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&r.id),
            r.date.format("%Y-%m-%d"),
            escape_html(&r.supplier_name),
            escape_html(&r.supplier_country),
            escape_html(&r.buyer_name),
            escape_html(&r.buyer_country),
            escape_html(&r.loading_port),
            escape_html(&r.discharge_port),
            format_int(r.quantity),
            format_unit_price(r.unit_price),
            format_unit_price(r.total_value)
        );
    }
    s.push_str("</table>");
    s
}

impl ReportDocument {
    /// Wraps the fragments, already in id order, into one HTML page.
    pub fn to_html(&self, template: &TemplateConfig) -> String {
        let mut slides = String::new();
        for slide in &self.slides {
            slides.push_str(&slide.html);
            slides.push('\n');
        }
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{doc_title} - {title}</title>
    <style>{css}</style>
</head>
<body>
{slides}<footer>{footer} &middot; {count} slides</footer>
<script>{js}</script>
</body>
</html>"#,
            doc_title = escape_html(&template.document_title),
            title = escape_html(&self.title),
            css = template.stylesheet,
            slides = slides,
            footer = escape_html(&template.footer),
            count = self.slides.len(),
            js = template.navigation_script,
        )
    }
}
