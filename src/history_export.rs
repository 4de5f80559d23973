use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::schema::FeatureSchema;
use crate::service::{PredictionRecord, PredictionService};

pub struct ExportReport {
    pub predictions: usize,
    pub feature_columns: usize,
}

pub fn export_service_history(path: &Path, service: &PredictionService) -> Result<ExportReport> {
    export_history(path, &service.history(), service.schema())
}

/// Writes a `History` sheet (one row per prediction, in order) and a
/// `Schema` sheet describing the feature columns the predictions used.
pub fn export_history(
    path: &Path,
    records: &[PredictionRecord],
    schema: &FeatureSchema,
) -> Result<ExportReport> {
    let header = [
        "Predicted At (UTC)",
        "Home",
        "Away",
        "Prediction",
        "P(Home)",
        "P(Draw)",
        "P(Away)",
    ];

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("History")?;
        write_header(sheet, &header)?;
        for (idx, record) in records.iter().enumerate() {
            let row = idx as u32 + 1;
            sheet
                .write_string(row, 0, record.predicted_at.format("%Y-%m-%d %H:%M:%S").to_string())
                .with_context(|| format!("write history row {row}"))?;
            sheet.write_string(row, 1, &record.home)?;
            sheet.write_string(row, 2, &record.away)?;
            sheet.write_string(row, 3, record.outcome.label())?;
            for (col, p) in record.probabilities.as_array().iter().enumerate() {
                sheet.write_number(row, 4 + col as u16, *p)?;
            }
        }
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Schema")?;
        let mut rows = vec![
            vec!["Version".to_string(), schema.version.to_string()],
            vec!["Fingerprint".to_string(), schema.fingerprint()],
        ];
        rows.extend(
            schema
                .columns
                .iter()
                .enumerate()
                .map(|(idx, col)| vec![format!("Column {idx}"), col.clone()]),
        );
        write_rows(sheet, &rows)?;
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        predictions: records.len(),
        feature_columns: schema.width(),
    })
}

fn write_header(worksheet: &mut Worksheet, header: &[&str]) -> Result<()> {
    for (col_idx, value) in header.iter().enumerate() {
        worksheet
            .write_string(0, col_idx as u16, *value)
            .with_context(|| format!("write header cell {col_idx}"))?;
    }
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
