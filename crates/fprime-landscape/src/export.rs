//! Spreadsheet export of aggregated results

use std::collections::BTreeSet;

use fprime_types::{AggregatedResult, MergedEntity};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::{Map, Value};

use crate::adapters::globaldata::DRUGS_FIELD;
use crate::ExportError;

pub const LANDSCAPE_SHEET: &str = "Landscape";
pub const PIPELINE_SHEET: &str = "GlobalData Pipeline";

/// Longest string a cell accepts
const MAX_CELL_CHARS: usize = 32_767;

/// Pipeline sheet columns: (header, drug field). Pipeline-entry columns
/// follow and come from `PIPELINE_DETAIL_COLUMNS`.
const PIPELINE_DRUG_COLUMNS: &[(&str, &str)] = &[
    ("drug_name", "Drug_Name"),
    ("alias", "Alias"),
    ("description", "Product_Description"),
    ("route_of_administration", "Route_of_Administration"),
    ("target", "Target"),
    ("molecule_type", "Molecule_Type"),
    ("ATC_classification", "ATC_Classification"),
    ("mechanism_of_action", "Mechanism_of_Action"),
    ("mono_combination", "MonoCombinationDrug"),
];

const PIPELINE_DETAIL_COLUMNS: &[(&str, &str)] = &[
    ("stage", "Development_Stage"),
    ("indication", "Indication"),
    ("therapy_area", "Therapy_Area"),
    ("geography", "Product_Geography"),
    ("line_of_therapy", "Line_of_Therapy"),
    ("last_development_stage", "Last_Development_Stage"),
    ("reason_for_discontinuation", "Reason_for_Discontinuation"),
    ("date_of_discontinuation", "Inactive_Discontinued_Date"),
];

/// Landscape sheet header: `entity`, `target`, the sorted union of field
/// names, then `provenance`
pub fn landscape_columns(records: &[MergedEntity]) -> Vec<String> {
    let fields: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.fields.keys().map(String::as_str))
        .filter(|name| *name != DRUGS_FIELD)
        .collect();

    let mut columns = vec!["entity".to_string(), "target".to_string()];
    columns.extend(fields.into_iter().map(str::to_string));
    columns.push("provenance".to_string());
    columns
}

/// Pipeline sheet header
pub fn pipeline_columns() -> Vec<&'static str> {
    std::iter::once("name")
        .chain(PIPELINE_DRUG_COLUMNS.iter().map(|(h, _)| *h))
        .chain(PIPELINE_DETAIL_COLUMNS.iter().map(|(h, _)| *h))
        .collect()
}

/// One row per (drug, pipeline entry); a drug with no pipeline entries
/// still gets one row with empty stage columns
pub fn pipeline_rows(records: &[MergedEntity]) -> Vec<Vec<Value>> {
    let mut rows = Vec::new();
    for record in records {
        let Some(Value::Array(drugs)) = record.fields.get(DRUGS_FIELD) else {
            continue;
        };
        for drug in drugs.iter().filter_map(Value::as_object) {
            let mut base = vec![Value::String(record.entity.clone())];
            base.extend(PIPELINE_DRUG_COLUMNS.iter().map(|(_, key)| field(drug, key)));

            let details: Vec<&Map<String, Value>> = match drug.get("PipelineDetails") {
                Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
                _ => Vec::new(),
            };
            if details.is_empty() {
                let mut row = base;
                row.extend(PIPELINE_DETAIL_COLUMNS.iter().map(|_| Value::Null));
                rows.push(row);
                continue;
            }
            for detail in details {
                let mut row = base.clone();
                row.extend(PIPELINE_DETAIL_COLUMNS.iter().map(|(_, key)| field(detail, key)));
                rows.push(row);
            }
        }
    }
    rows
}

fn field(map: &Map<String, Value>, key: &str) -> Value {
    map.get(key).cloned().unwrap_or(Value::Null)
}

/// Serialize `result` to an xlsx workbook. An empty result yields a
/// header-only sheet.
pub fn export_xlsx(result: &AggregatedResult) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let columns = landscape_columns(&result.records);
    let sheet = workbook.add_worksheet();
    sheet.set_name(LANDSCAPE_SHEET)?;
    write_header(sheet, &columns, &header)?;
    for (i, record) in result.records.iter().enumerate() {
        let row = row_index(i)?;
        sheet.write_string(row, 0, truncate(&record.entity))?;
        if let Some(target) = &record.target {
            sheet.write_string(row, 1, truncate(target))?;
        }
        for (offset, name) in columns[2..columns.len() - 1].iter().enumerate() {
            if let Some(value) = record.fields.get(name) {
                write_value(sheet, row, col_index(offset + 2)?, value)?;
            }
        }
        let provenance: Vec<&str> = record.provenance.iter().map(|s| s.as_str()).collect();
        sheet.write_string(row, col_index(columns.len() - 1)?, provenance.join(", "))?;
    }

    let pipeline = pipeline_rows(&result.records);
    if !pipeline.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(PIPELINE_SHEET)?;
        write_header(sheet, &pipeline_columns(), &header)?;
        for (i, values) in pipeline.iter().enumerate() {
            let row = row_index(i)?;
            for (c, value) in values.iter().enumerate() {
                write_value(sheet, row, col_index(c)?, value)?;
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(
        records = result.records.len(),
        pipeline_rows = pipeline.len(),
        bytes = bytes.len(),
        "Exported landscape workbook"
    );
    Ok(bytes)
}

fn write_header<S: AsRef<str>>(
    sheet: &mut Worksheet,
    columns: &[S],
    format: &Format,
) -> Result<(), ExportError> {
    for (c, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col_index(c)?, name.as_ref(), format)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_value(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), ExportError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                sheet.write_number(row, col, f)?;
            }
            None => {
                sheet.write_string(row, col, n.to_string())?;
            }
        },
        Value::String(s) => {
            sheet.write_string(row, col, truncate(s))?;
        }
        Value::Array(items) => {
            let joined: Vec<String> = items.iter().map(display).collect();
            sheet.write_string(row, col, truncate(&joined.join("; ")))?;
        }
        Value::Object(_) => {
            sheet.write_string(row, col, truncate(&value.to_string()))?;
        }
    }
    Ok(())
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_CELL_CHARS).collect()
}

/// Data rows start below the header
fn row_index(i: usize) -> Result<u32, ExportError> {
    u32::try_from(i + 1).map_err(|_| ExportError::TooLarge(format!("row {i}")))
}

fn col_index(i: usize) -> Result<u16, ExportError> {
    u16::try_from(i).map_err(|_| ExportError::TooLarge(format!("column {i}")))
}
