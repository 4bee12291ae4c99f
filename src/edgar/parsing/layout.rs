//! Geometric table reconstruction over positioned text elements.
//!
//! Elements are banded into rows by their vertical coordinate; runs of consecutive multi-column
//! rows become table candidates whose columns are the x positions shared by enough of the run.

use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// Maximum vertical distance, in points, between elements of the same row.
pub const ROW_TOLERANCE: f32 = 3.0;
/// Minimum distinct elements for a row to qualify as a table row.
pub const MIN_TABLE_COLUMNS: usize = 2;
/// Minimum consecutive qualifying rows for a table candidate.
pub const MIN_TABLE_ROWS: usize = 3;
/// Share of candidate rows that must contain an x position for it to become a column.
pub const COLUMN_SHARE_THRESHOLD: f32 = 0.5;
/// Decimal places kept when comparing column positions.
pub const COLUMN_PRECISION: i32 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub page: u32,
    pub y: f32,
    pub elements: Vec<TextElement>,
}

impl Row {
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.text.trim())
            .filter(|t| !t.is_empty())
            .join(" ")
    }
}

/// Groups elements into rows, top of page first. A row's band is anchored at its first element.
pub fn group_rows(elements: &[TextElement]) -> Vec<Row> {
    let mut sorted: Vec<&TextElement> = elements.iter().filter(|e| !e.text.trim().is_empty()).collect();
    sorted.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(b.y.total_cmp(&a.y))
            .then(a.x.total_cmp(&b.x))
    });

    let mut rows: Vec<Row> = Vec::new();
    for element in sorted {
        match rows.last_mut() {
            Some(row) if row.page == element.page && (row.y - element.y).abs() <= ROW_TOLERANCE => {
                row.elements.push(element.clone());
            }
            _ => rows.push(Row {
                page: element.page,
                y: element.y,
                elements: vec![element.clone()],
            }),
        }
    }
    for row in &mut rows {
        row.elements.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    rows
}

/// Text lines rebuilt from rows, with a blank line between pages.
pub fn rows_to_lines(rows: &[Row]) -> String {
    let mut out = String::new();
    let mut page = None;
    for row in rows {
        if page.is_some() && page != Some(row.page) {
            out.push('\n');
        }
        page = Some(row.page);
        out.push_str(&row.text());
        out.push('\n');
    }
    out
}

fn round_position(x: f32) -> i64 {
    let scale = 10f32.powi(COLUMN_PRECISION);
    (x * scale).round() as i64
}

fn is_table_row(row: &Row) -> bool {
    row.elements.len() >= MIN_TABLE_COLUMNS
}

/// Tables found in the elements, each as rows of cells.
pub fn reconstruct_tables(elements: &[TextElement]) -> Vec<Vec<Vec<String>>> {
    let rows = group_rows(elements);
    let mut tables = Vec::new();
    let mut run: Vec<&Row> = Vec::new();

    for row in &rows {
        let continues = run.last().map_or(true, |last| last.page == row.page);
        if is_table_row(row) && continues {
            run.push(row);
            continue;
        }
        if let Some(table) = build_table(&run) {
            tables.push(table);
        }
        run.clear();
        if is_table_row(row) {
            run.push(row);
        }
    }
    if let Some(table) = build_table(&run) {
        tables.push(table);
    }

    log::debug!("Reconstructed {} tables from {} rows", tables.len(), rows.len());
    tables
}

fn build_table(run: &[&Row]) -> Option<Vec<Vec<String>>> {
    if run.len() < MIN_TABLE_ROWS {
        return None;
    }

    let mut occurrences: BTreeMap<i64, usize> = BTreeMap::new();
    for row in run {
        let positions: BTreeSet<i64> = row.elements.iter().map(|e| round_position(e.x)).collect();
        for position in positions {
            *occurrences.entry(position).or_default() += 1;
        }
    }

    let threshold = run.len() as f32 * COLUMN_SHARE_THRESHOLD;
    let scale = 10f32.powi(COLUMN_PRECISION);
    let columns: Vec<f32> = occurrences
        .into_iter()
        .filter(|(_, count)| *count as f32 >= threshold)
        .map(|(position, _)| position as f32 / scale)
        .collect();
    if columns.len() < MIN_TABLE_COLUMNS {
        return None;
    }

    let table = run
        .iter()
        .map(|row| {
            let mut cells = vec![String::new(); columns.len()];
            for element in &row.elements {
                let column = nearest_column(&columns, element.x);
                let cell = &mut cells[column];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(element.text.trim());
            }
            cells
        })
        .collect();
    Some(table)
}

fn nearest_column(columns: &[f32], x: f32) -> usize {
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - x).abs().total_cmp(&(*b - x).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
