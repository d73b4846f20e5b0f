use crate::assembly::Slide;
use crate::error::Result;
use crate::plan::SlidePlan;
use crate::types::TransactionRecord;
use crate::util::format_int;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Tabled)]
pub struct SectionRow {
    #[tabled(rename = "Section")]
    pub section: String,
    #[tabled(rename = "Slides")]
    pub range: String,
    #[tabled(rename = "Count")]
    pub count: String,
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_html(path: impl AsRef<Path>, html: &str) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;
    std::fs::write(path, html)?;
    Ok(())
}

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let s = serde_json::to_string_pretty(value)?;
    create_parent(path)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// The `{id, kind, title, data}` sequence handed to renderers, as JSON.
pub fn write_manifest(path: impl AsRef<Path>, slides: &[Slide<'_>]) -> Result<()> {
    write_json(path, slides)
}

pub fn write_records_csv(path: impl AsRef<Path>, records: &[TransactionRecord]) -> Result<()> {
    write_csv(path, records)
}

/// Everything one run puts on disk.
pub struct ReportFiles<'a> {
    pub html_path: &'a Path,
    pub html: &'a str,
    pub manifest: Option<(&'a Path, &'a [Slide<'a>])>,
    pub records_csv: Option<(&'a Path, &'a [TransactionRecord])>,
}

impl ReportFiles<'_> {
    /// Writes the exports first and the HTML document last, so an export
    /// failure leaves no document behind.
    pub fn write(&self) -> Result<()> {
        if let Some((path, slides)) = self.manifest {
            write_manifest(path, slides)?;
        }
        if let Some((path, records)) = self.records_csv {
            write_records_csv(path, records)?;
        }
        write_html(self.html_path, self.html)
    }
}

pub fn section_rows(plan: &SlidePlan) -> Vec<SectionRow> {
    plan.sections()
        .iter()
        .map(|s| SectionRow {
            section: s.id.title().to_string(),
            range: format!("{}-{}", s.start_id, s.end_id),
            count: format_int(s.len()),
        })
        .collect()
}

pub fn markdown_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", markdown_table(rows, max_rows));
}
