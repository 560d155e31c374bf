//! Query result data model
//!
//! Types describing the payload returned by the APM traces query API:
//! - `QueryResult`: metadata summary plus the ordered result rows
//! - `QueryResultMetadata`: column summaries and group-by columns
//! - `QueryResultRow`: one row of data keyed by column display name
//!
//! Field names follow the camelCase wire format of the query API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flat output record (and the raw shape of row data).
pub type Record = Map<String, Value>;

/// Unit marking a column of millisecond Unix timestamps
pub const EPOCH_TIME_MS: &str = "EPOCH_TIME_MS";

/// Column expression that marks a time-series shaped result
pub const TIMESERIES_EXPRESSION: &str = "timeseries";

/// Envelope key wrapping every nested sub-row
pub const ROW_DATA_ENVELOPE: &str = "queryResultRowData";

/// Full response of a single query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_result_metadata_summary: QueryResultMetadata,

    #[serde(default)]
    pub query_result_rows: Vec<QueryResultRow>,
}

/// Describes the shape of a query result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultMetadata {
    /// Ordered column descriptions
    #[serde(default)]
    pub query_result_row_type_summaries: Vec<ColumnSummary>,

    /// Columns the query grouped by
    #[serde(default)]
    pub query_results_grouped_by: Vec<GroupByColumn>,
}

/// Description of one result column
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    /// Human-readable label; also the key used in row data
    #[serde(default)]
    pub display_name: String,

    /// Internal expression the column was computed from
    #[serde(default)]
    pub expression: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Columns of nested sub-rows, present on array-typed aggregates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_result_row_type_summaries: Vec<ColumnSummary>,
}

impl ColumnSummary {
    /// Create a scalar column summary
    pub fn new(display_name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            expression: expression.into(),
            ..Default::default()
        }
    }

    /// Builder method: set the unit
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Builder method: set the data type
    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Builder method: add a nested column
    pub fn nested(mut self, column: ColumnSummary) -> Self {
        self.query_result_row_type_summaries.push(column);
        self
    }

    /// Whether values of this column are millisecond timestamps
    pub fn is_epoch_millis(&self) -> bool {
        self.unit.as_deref() == Some(EPOCH_TIME_MS)
    }

    /// Whether this column marks a time-series result
    pub fn is_timeseries(&self) -> bool {
        self.expression == TIMESERIES_EXPRESSION
    }

    /// Whether values of this column are lists of envelope-wrapped sub-rows
    pub fn is_array(&self) -> bool {
        !self.query_result_row_type_summaries.is_empty()
            || self
                .data_type
                .as_deref()
                .map(|t| t.eq_ignore_ascii_case("array"))
                .unwrap_or(false)
    }
}

/// A column the query grouped its results by
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupByColumn {
    /// Expression of the grouped-by column
    #[serde(default)]
    pub query_results_grouped_by_column: String,
}

impl GroupByColumn {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            query_results_grouped_by_column: expression.into(),
        }
    }
}

/// One row of a query result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultRow {
    #[serde(default)]
    pub query_result_row_data: Record,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_result_row_metadata: Option<Record>,
}

impl QueryResultRow {
    pub fn new(data: Record) -> Self {
        Self {
            query_result_row_data: data,
            query_result_row_metadata: None,
        }
    }
}
