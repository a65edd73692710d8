//! CSV output and summary tables for batch results.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::batch::{BatchReport, MethodSummary};
use crate::error::Result;
use crate::stats::Summary;

/// One row of the long-format summary CSV.
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    method: &'a str,
    metric: &'a str,
    count: usize,
    mean: f64,
    max: f64,
    min: f64,
    median: f64,
    std_dev: f64,
}

/// Write per-image records as CSV.
///
/// Columns are `image` followed by `psnr_<method>,ssim_<method>` for each
/// method in report order; rows follow input order.
///
/// # Errors
///
/// Returns [`crate::Error::Csv`] or [`crate::Error::Io`] if writing fails.
pub fn write_records<W: Write>(report: &BatchReport, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["image".to_string()];
    for method in &report.methods {
        header.push(format!("psnr_{method}"));
        header.push(format!("ssim_{method}"));
    }
    wtr.write_record(&header)?;

    for record in &report.records {
        let mut row = vec![record.id.clone()];
        for score in &record.scores {
            row.push(score.psnr.to_string());
            row.push(score.ssim.to_string());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write per-image records to a CSV file at `path`.
///
/// # Errors
///
/// See [`write_records`].
pub fn write_records_file(report: &BatchReport, path: &Path) -> Result<()> {
    write_records(report, std::fs::File::create(path)?)
}

/// Write aggregate statistics as CSV, one row per method and metric.
///
/// Methods without scored images are left out.
///
/// # Errors
///
/// Returns [`crate::Error::Csv`] or [`crate::Error::Io`] if writing fails.
pub fn write_summary<W: Write>(summaries: &[MethodSummary], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for summary in summaries {
        for (metric, stats) in [("psnr", &summary.psnr), ("ssim", &summary.ssim)] {
            let Some(s) = stats else { continue };
            wtr.serialize(SummaryRow {
                method: &summary.method,
                metric,
                count: s.count,
                mean: s.mean,
                max: s.max,
                min: s.min,
                median: s.median,
                std_dev: s.std_dev,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write aggregate statistics to a CSV file at `path`.
///
/// # Errors
///
/// See [`write_summary`].
pub fn write_summary_file(summaries: &[MethodSummary], path: &Path) -> Result<()> {
    write_summary(summaries, std::fs::File::create(path)?)
}

/// Render aggregate statistics as a fixed-width text table.
///
/// Rows are `Average/Max/Min/Median/Std Dev` for PSNR and then SSIM, with one
/// column per method. Missing statistics print as `-`.
#[must_use]
pub fn format_summary_table(summaries: &[MethodSummary]) -> String {
    type Pick = fn(&Summary) -> f64;
    let stats: [(&str, Pick); 5] = [
        ("Average", |s| s.mean),
        ("Max", |s| s.max),
        ("Min", |s| s.min),
        ("Median", |s| s.median),
        ("Std Dev", |s| s.std_dev),
    ];

    let mut out = format!("{:<14}", "Metric");
    for summary in summaries {
        out.push_str(&format!(" {:>12}", summary.method.to_uppercase()));
    }
    out.push('\n');

    for (metric, field) in [("PSNR", 0), ("SSIM", 1)] {
        for (label, pick) in &stats {
            out.push_str(&format!("{:<14}", format!("{label} {metric}")));
            for summary in summaries {
                let value = if field == 0 { &summary.psnr } else { &summary.ssim };
                let cell = match value {
                    Some(s) => format!(" {:>12.4}", pick(s)),
                    None => format!(" {:>12}", "-"),
                };
                out.push_str(&cell);
            }
            out.push('\n');
        }
    }
    out
}
