//! Column metadata index
//!
//! Derives, once per result, everything the two transform paths need to
//! know about columns: which hold dates, which hold nested sub-rows, and
//! the display names of grouped-by columns.

use std::collections::BTreeSet;

use crate::model::QueryResultMetadata;

/// Column facts for a tabular result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularLayout {
    /// Display names of millisecond timestamp columns
    pub date_columns: BTreeSet<String>,
    /// Display names of array-typed aggregate columns
    pub array_columns: BTreeSet<String>,
}

impl TabularLayout {
    pub fn from_metadata(metadata: &QueryResultMetadata) -> Self {
        let mut layout = Self::default();

        for column in &metadata.query_result_row_type_summaries {
            if column.is_epoch_millis() {
                layout.date_columns.insert(column.display_name.clone());
            }
            if column.is_array() {
                layout.array_columns.insert(column.display_name.clone());
            }
        }

        layout
    }
}

/// Column facts for a time-series result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeriesLayout {
    /// Keys copied from each outer row into its buckets
    pub grouped_by: Vec<String>,
}

impl TimeSeriesLayout {
    /// Translate group-by expressions to display names
    ///
    /// An expression matched by a column summary is removed and the column's
    /// display name appended; unmatched expressions stay as they are.
    pub fn from_metadata(metadata: &QueryResultMetadata) -> Self {
        let mut grouped_by: Vec<String> = metadata
            .query_results_grouped_by
            .iter()
            .map(|column| column.query_results_grouped_by_column.clone())
            .collect();

        for column in &metadata.query_result_row_type_summaries {
            if let Some(pos) = grouped_by.iter().position(|name| *name == column.expression) {
                grouped_by.remove(pos);
                grouped_by.push(column.display_name.clone());
            }
        }

        Self { grouped_by }
    }
}

/// Shape of a query result, decided once from its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    Tabular(TabularLayout),
    TimeSeries(TimeSeriesLayout),
}

impl ResultShape {
    /// A `timeseries` column anywhere in the metadata selects the time-series shape
    pub fn detect(metadata: &QueryResultMetadata) -> Self {
        let is_timeseries = metadata
            .query_result_row_type_summaries
            .iter()
            .any(|column| column.is_timeseries());

        if is_timeseries {
            ResultShape::TimeSeries(TimeSeriesLayout::from_metadata(metadata))
        } else {
            ResultShape::Tabular(TabularLayout::from_metadata(metadata))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResultShape::Tabular(_) => "tabular",
            ResultShape::TimeSeries(_) => "timeseries",
        }
    }
}
