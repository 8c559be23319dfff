use ndarray::{Array1, Array2, ArrayView1, Axis};
use tabular::{Row, Table};

use std::fmt;

use crate::calendar::{DAY_NAMES, HORIZON};
use crate::error::ConfigurationError;

/// Ingredient × day table of quantities (kg) or prices. Rows are labelled by ingredient,
/// columns are the days Mon..Sun.
#[derive(Clone, Debug, PartialEq)]
pub struct DayTable {
    labels: Vec<String>,
    values: Array2<f64>,
}

impl DayTable {
    pub fn new(labels: Vec<String>, values: Array2<f64>) -> Result<Self, ConfigurationError> {
        let (rows, cols) = values.dim();
        if rows != labels.len() {
            return Err(ConfigurationError::ShapeMismatch {
                what: "day table",
                expected: labels.len(),
                found: rows,
            });
        }
        if cols != HORIZON {
            return Err(ConfigurationError::ShapeMismatch {
                what: "day table",
                expected: HORIZON,
                found: cols,
            });
        }
        Ok(Self { labels, values })
    }

    pub fn zeros(labels: Vec<String>) -> Self {
        let values = Array2::zeros((labels.len(), HORIZON));
        Self { labels, values }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn num_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn get(&self, row: usize, day: usize) -> f64 {
        self.values[[row, day]]
    }

    pub fn set(&mut self, row: usize, day: usize, value: f64) {
        self.values[[row, day]] = value;
    }

    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.values.row(row)
    }

    /// Row looked up by label.
    pub fn by_label(&self, label: &str) -> Option<ArrayView1<'_, f64>> {
        self.row_index(label).map(|i| self.values.row(i))
    }

    /// Sum over the given day range for one row.
    pub fn window_sum(&self, row: usize, days: std::ops::Range<usize>) -> f64 {
        days.map(|d| self.values[[row, d]]).sum()
    }

    pub fn row_totals(&self) -> Array1<f64> {
        self.values.sum_axis(Axis(1))
    }

    pub fn total(&self) -> f64 {
        self.values.sum()
    }

    /// Copy of the table with every entry multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            labels: self.labels.clone(),
            values: &self.values * factor,
        }
    }

    pub fn max_abs_diff(&self, other: &DayTable) -> f64 {
        (&self.values - &other.values)
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

impl fmt::Display for DayTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let layout = format!("{{:<}}{}", "  {:>}".repeat(HORIZON));
        let mut table = Table::new(&layout);

        let mut header = Row::new().with_cell("");
        for name in DAY_NAMES {
            header.add_cell(name);
        }
        table.add_row(header);

        for (label, values) in self.labels.iter().zip(self.values.rows()) {
            let mut row = Row::new().with_cell(label);
            for v in values.iter() {
                row.add_cell(format!("{:.2}", v));
            }
            table.add_row(row);
        }
        write!(f, "{}", table)
    }
}
