//! CSV export of persisted quality results

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::store::QualityResultRecord;

/// One CSV line per persisted result
#[derive(Debug, Serialize)]
struct QualityResultCsvRow<'a> {
    line_number: i32,
    ctg_number: &'a str,
    grain_type: &'a str,
    final_factor: Decimal,
    grade: &'a str,
    total_bonus: Decimal,
    total_discount: Decimal,
    humidity_factor_discount: Decimal,
    actual_humidity: Decimal,
    waste_percent: Decimal,
    waste_kg: Decimal,
    net_quantity_kg: Decimal,
    requires_drying: bool,
    out_of_tolerance: bool,
    out_of_standard: bool,
    warnings: usize,
    calculation_version: &'a str,
}

impl<'a> From<&'a QualityResultRecord> for QualityResultCsvRow<'a> {
    fn from(record: &'a QualityResultRecord) -> Self {
        let result = &record.result;
        QualityResultCsvRow {
            line_number: record.line_number,
            ctg_number: &record.ctg_number,
            grain_type: &result.grain_type,
            final_factor: result.final_factor,
            grade: result.grade.map(|g| g.as_str()).unwrap_or(""),
            total_bonus: result.total_bonus,
            total_discount: result.total_discount,
            humidity_factor_discount: result.humidity_factor_discount,
            actual_humidity: result.humidity_waste.actual_humidity,
            waste_percent: result.humidity_waste.waste_percent,
            waste_kg: result.humidity_waste.waste_kg,
            net_quantity_kg: result.humidity_waste.net_quantity_kg,
            requires_drying: result.humidity_waste.requires_drying,
            out_of_tolerance: result.out_of_tolerance,
            out_of_standard: result.out_of_standard,
            warnings: result.warnings.len(),
            calculation_version: &result.calculation_version,
        }
    }
}

/// Export quality results as CSV with a header line
pub fn quality_results_to_csv(records: &[QualityResultRecord]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(QualityResultCsvRow::from(record))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}
