use std::ops::Range;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{AnalysisError, validate_index};
use crate::{Series, TimeIndexed, Value};

/// Named columns sharing one time axis.
///
/// A cell with no sample is `None`. Column order is insertion order, which is also
/// the order merged tables present their columns in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    index: Vec<f64>,
    columns: IndexMap<String, Vec<Option<Value>>>,
}

impl Table {
    /// A table with `index` as its time axis and no columns yet.
    pub fn new(index: Vec<f64>) -> Result<Self, AnalysisError> {
        validate_index(&index)?;
        Ok(Self {
            index,
            columns: IndexMap::new(),
        })
    }

    pub fn from_columns(
        index: Vec<f64>,
        columns: IndexMap<String, Vec<Option<Value>>>,
    ) -> Result<Self, AnalysisError> {
        columns
            .into_iter()
            .try_fold(Self::new(index)?, |table, (name, values)| {
                table.with_column(name, values)
            })
    }

    /// Same columns, no rows.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self {
            index: vec![],
            columns: self
                .columns
                .keys()
                .map(|name| (name.clone(), vec![]))
                .collect(),
        }
    }

    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<Value>>,
    ) -> Result<Self, AnalysisError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Add or replace a column.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<Value>>,
    ) -> Result<(), AnalysisError> {
        if values.len() != self.index.len() {
            return Err(AnalysisError::LengthMismatch {
                expected: self.index.len(),
                actual: values.len(),
            });
        }
        let values = values
            .into_iter()
            .map(|v| v.filter(|v| !matches!(v, Value::Float(f) if f.is_nan())))
            .collect();
        self.columns.insert(name.into(), values);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<Value>])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Option<Value>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn cell(&self, row: usize, name: &str) -> Option<&Value> {
        self.columns.get(name)?.get(row)?.as_ref()
    }

    /// The `name` column as a numeric series on this table's index.
    pub fn numeric_column(&self, name: &str) -> Result<Series, AnalysisError> {
        let column = self
            .column(name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))?;
        let values = column
            .iter()
            .map(|cell| match cell {
                None => Ok(None),
                Some(value) if value.is_numeric() => Ok(value.as_f64()),
                Some(_) => Err(AnalysisError::NonNumeric {
                    column: name.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Series::new(self.index.clone(), values)
    }

    /// Overwrite one cell. The column must already exist.
    pub fn set_cell(
        &mut self,
        row: usize,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), AnalysisError> {
        let len = self.index.len();
        let cell = self
            .columns
            .get_mut(name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))?
            .get_mut(row)
            .ok_or_else(|| AnalysisError::InvalidArgument(format!("row {row} out of {len}")))?;
        *cell = value;
        Ok(())
    }

    /// Remove the named columns. Names that are not present are ignored.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.columns.shift_remove(name.as_ref());
        }
    }

    /// Keep the rows for which `keep(row)` holds.
    #[must_use]
    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let rows: Vec<usize> = (0..self.len()).filter(|row| keep(*row)).collect();
        Self {
            index: rows.iter().map(|row| self.index[*row]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| {
                    (
                        name.clone(),
                        rows.iter().map(|row| values[*row].clone()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Build a new table out of `(timestamp, source_row)` picks, copying each source
    /// row under its new timestamp. The new timestamps must still be strictly increasing.
    pub fn restamp_rows(&self, picks: &[(f64, usize)]) -> Result<Self, AnalysisError> {
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                (
                    name.clone(),
                    picks.iter().map(|(_, row)| values[*row].clone()).collect(),
                )
            })
            .collect();
        Self::from_columns(picks.iter().map(|(ts, _)| *ts).collect(), columns)
    }
}

impl TimeIndexed for Table {
    fn index(&self) -> &[f64] {
        &self.index
    }

    fn slice_rows(&self, rows: Range<usize>) -> Self {
        Self {
            index: self.index[rows.clone()].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), values[rows.clone()].to_vec()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sched_table() -> Table {
        Table::new(vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_column(
                "cpu",
                vec![Some(Value::Int(0)), Some(Value::Int(1)), Some(Value::Int(0))],
            )
            .unwrap()
            .with_column(
                "comm",
                vec![Some("init".into()), None, Some("kworker".into())],
            )
            .unwrap()
    }

    #[test]
    fn column_length_must_match_index() {
        let err = Table::new(vec![1.0, 2.0])
            .unwrap()
            .with_column("a", vec![Some(Value::Int(1))])
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn numeric_column_rejects_strings() {
        let table = sched_table();
        let cpu = table.numeric_column("cpu").unwrap();
        assert_eq!(cpu.values(), &[Some(0.0), Some(1.0), Some(0.0)]);
        assert_eq!(
            table.numeric_column("comm"),
            Err(AnalysisError::NonNumeric {
                column: "comm".to_string()
            })
        );
        assert_eq!(
            table.numeric_column("pid"),
            Err(AnalysisError::MissingColumn("pid".to_string()))
        );
    }

    #[test]
    fn filter_and_drop() {
        let mut table = sched_table();
        let on_cpu0 = table.filter_rows(|row| table.cell(row, "cpu") == Some(&Value::Int(0)));
        assert_eq!(on_cpu0.index(), &[1.0, 3.0]);
        assert_eq!(on_cpu0.cell(1, "comm"), Some(&Value::from("kworker")));

        table.drop_columns(&["cpu", "not-there"]);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["comm"]);
    }

    #[test]
    fn restamp_copies_rows() {
        let table = sched_table();
        let restamped = table.restamp_rows(&[(1.5, 0), (2.0, 1)]).unwrap();
        assert_eq!(restamped.index(), &[1.5, 2.0]);
        assert_eq!(restamped.cell(0, "comm"), Some(&Value::from("init")));
        assert_eq!(restamped.cell(1, "comm"), None);

        assert!(table.restamp_rows(&[(2.0, 0), (1.0, 1)]).is_err());
    }
}
