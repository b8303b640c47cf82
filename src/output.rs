//! Output formatting for harvest results

use crate::cache::StoreStats;
use crate::error::{Error, Result};
use crate::model::{HarvestResult, SectionResult};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use std::io::Write;
use std::str::FromStr;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable tables, one per content type
    #[default]
    Human,
    /// JSON output
    Json,
    /// Plain URL list grouped by content type
    Urls,
    /// No output (silent mode)
    None,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "urls" => Ok(Self::Urls),
            "none" => Ok(Self::None),
            _ => Err(Error::InvalidOutputFormat(s.to_string())),
        }
    }
}

/// Output a harvest result
pub fn output_harvest<W: Write>(
    result: &HarvestResult,
    format: OutputFormat,
    writer: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Human => output_human(result, writer),
        OutputFormat::Json => output_json(result, writer),
        OutputFormat::Urls => output_urls(result, writer),
        OutputFormat::None => Ok(()),
    }
}

/// Output JSON format
fn output_json<W: Write, T: serde::Serialize>(value: &T, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer).map_err(Error::OutputFailed)?;
    Ok(())
}

/// Format sections as a URL list with `=== TYPE ===` headers
pub fn format_url_list(sections: &[SectionResult]) -> Vec<String> {
    let mut lines = Vec::new();
    for section in sections {
        lines.push(format!("\n=== {} ===", section.content_type.to_uppercase()));
        lines.extend(section.items.iter().map(|item| item.url.clone()));
    }
    lines
}

fn output_urls<W: Write>(result: &HarvestResult, writer: &mut W) -> Result<()> {
    for line in format_url_list(&result.sections) {
        writeln!(writer, "{}", line).map_err(Error::OutputFailed)?;
    }
    Ok(())
}

/// Output human-readable table format
fn output_human<W: Write>(result: &HarvestResult, writer: &mut W) -> Result<()> {
    writeln!(writer, "Found {} URLs total", result.total_urls()).map_err(Error::OutputFailed)?;

    let stats = &result.cache_stats;
    writeln!(
        writer,
        "Content types: {} ({} from cache, {} fetched)",
        stats.total_content_types, stats.cached_count, stats.fresh_count
    )
    .map_err(Error::OutputFailed)?;

    for section in &result.sections {
        writeln!(writer).map_err(Error::OutputFailed)?;
        writeln!(writer, "{}", section_table(section)).map_err(Error::OutputFailed)?;
    }
    Ok(())
}

fn section_table(section: &SectionResult) -> Table {
    let heading = format!("{} ({} items)", section.content_type, section.count);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new(heading).add_attribute(Attribute::Bold).fg(Color::Cyan),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("URL").add_attribute(Attribute::Bold),
        ]);

    for item in &section.items {
        table.add_row(vec![
            Cell::new(item.id).set_alignment(CellAlignment::Right),
            Cell::new(&item.title),
            Cell::new(&item.url),
        ]);
    }
    table
}

/// Output cache statistics
pub fn output_cache_stats<W: Write>(
    stats: &StoreStats,
    format: OutputFormat,
    writer: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Json => output_json(stats, writer),
        OutputFormat::None => Ok(()),
        OutputFormat::Human | OutputFormat::Urls => writeln!(
            writer,
            "Cached entries: {}\nStorage in use: {} bytes ({:.2} MB)",
            stats.total_entries,
            stats.bytes_in_use,
            stats.megabytes_in_use()
        )
        .map_err(Error::OutputFailed),
    }
}
