//! Tabular report: building, template merging, CSV serialization.

use std::collections::BTreeMap;
use std::path::Path;

use fleetgrade_core::{FleetError, RepoSet, Result, RuleSet, ScoreBoard};

use crate::checkout::CheckoutOutcome;

/// One row of the report: field name → value. Fields absent from a row
/// serialize as empty cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRow {
    fields: BTreeMap<String, String>,
}

impl ReportRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Repository key, when this row names one. Rows without a non-empty
    /// `name` are verbatim extra rows.
    pub fn name(&self) -> Option<&str> {
        self.get("name").filter(|name| !name.is_empty())
    }
}

/// The grading report: ordered columns and rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    /// Parse a CSV document: header row first, then data rows.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut records = parse_records(text).into_iter();
        let columns = records
            .next()
            .ok_or_else(|| FleetError::Report("empty report table".to_string()))?;

        let mut rows = Vec::new();
        for record in records {
            if record.iter().all(String::is_empty) {
                continue;
            }
            let mut row = ReportRow::new();
            for (column, value) in columns.iter().zip(record) {
                row.set(column, value);
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Load a CSV report from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FleetError::Report(format!("cannot read {}: {e}", path.display())))?;
        Self::from_csv(&text)
    }

    /// Serialize as CSV: header row, then every row padded to the full
    /// column set.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_record(&mut out, self.columns.iter().map(String::as_str));
        for row in &self.rows {
            push_record(
                &mut out,
                self.columns.iter().map(|c| row.get(c).unwrap_or("")),
            );
        }
        out
    }

    /// Write the CSV report to disk.
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_csv())
            .map_err(|e| FleetError::Report(format!("cannot write {}: {e}", path.display())))
    }
}

/// Build the computed table: intrinsic fields first, then one column per
/// criterion in declaration order; one row per repository in lexicographic
/// name order.
pub fn build_computed(
    repos: &RepoSet,
    outcomes: &BTreeMap<String, CheckoutOutcome>,
    rules: &RuleSet,
    board: &ScoreBoard,
) -> ReportTable {
    let score_fields = rules.field_names();
    let mut columns = vec!["name".to_string(), "tag".to_string(), "date".to_string()];
    columns.extend(score_fields.iter().cloned());

    let mut rows = Vec::with_capacity(repos.len());
    for repo in repos.iter() {
        let mut row = ReportRow::new();
        row.set("name", &repo.name);
        if let Some(outcome) = outcomes.get(&repo.name) {
            row.set("tag", &outcome.selected_ref);
            row.set("date", &outcome.commit_date);
        }
        for field in &score_fields {
            if let Some(score) = board.get(&repo.name, field) {
                row.set(field, format_score(score));
            }
        }
        rows.push(row);
    }

    ReportTable { columns, rows }
}

/// Merge the computed table with an optional template.
///
/// Column order: computed columns first, then template-only columns in
/// template order. Row order: template-named repositories first in template
/// order, then remaining computed repositories in their lexicographic
/// order, then the template's verbatim extra rows. On a field collision the
/// computed value wins; the template only supplies presence and fields the
/// computation does not know.
pub fn merge(computed: ReportTable, template: Option<ReportTable>) -> ReportTable {
    let Some(template) = template else {
        return computed;
    };

    let mut columns = computed.columns.clone();
    for column in &template.columns {
        if !columns.iter().any(|c| c == column) {
            columns.push(column.clone());
        }
    }

    let computed_order: Vec<String> = computed
        .rows
        .iter()
        .filter_map(|row| row.name().map(str::to_string))
        .collect();
    let mut computed_by_name: BTreeMap<String, ReportRow> = computed
        .rows
        .into_iter()
        .filter_map(|row| row.name().map(str::to_string).map(|name| (name, row)))
        .collect();

    let mut rows = Vec::new();
    let mut extras = Vec::new();
    for row in template.rows {
        let name = row.name().map(str::to_string);
        match name {
            Some(name) => {
                let mut merged = row;
                if let Some(computed_row) = computed_by_name.remove(&name) {
                    for (field, value) in computed_row.fields {
                        merged.set(field, value);
                    }
                }
                rows.push(merged);
            }
            None => extras.push(row),
        }
    }

    // Repositories the template does not declare keep their computed order.
    for name in computed_order {
        if let Some(row) = computed_by_name.remove(&name) {
            rows.push(row);
        }
    }
    rows.extend(extras);

    ReportTable { columns, rows }
}

fn format_score(score: f64) -> String {
    format!("{score}")
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape_field(field));
    }
    out.push('\n');
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split a CSV document into records, honouring double-quoted fields.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}
