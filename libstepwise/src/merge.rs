//! Outer-joining several event tables on their timestamps.
//!
//! Merging runs in three stages, each usable on its own:
//! [`filter_stage`] keeps the rows matching `filter_columns`, [`drop_stage`] removes
//! columns that would otherwise collide or carry no information, and [`join_stage`]
//! folds the tables together with [`outer_join`].
use indexmap::IndexMap;
use itertools::{EitherOrBoth, Itertools};
use stepwise_types::{AnalysisError, Table, TimeIndexed, Value};
use tracing::{debug, trace};

/// Suffixes given to a column name present on both sides of a join.
pub const LEFT_SUFFIX: &str = "_x";
pub const RIGHT_SUFFIX: &str = "_y";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOptions {
    /// Columns removed from every table before joining.
    pub drop_columns: Vec<String>,
    /// Only rows where each of these columns holds the given value are merged. The
    /// columns are constant afterwards and are dropped as well.
    pub filter_columns: IndexMap<String, Value>,
}

impl MergeOptions {
    #[must_use]
    pub fn drop(columns: &[&str]) -> Self {
        Self {
            drop_columns: columns.iter().map(|c| (*c).to_string()).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter_columns.insert(column.into(), value.into());
        self
    }

    /// Everything the drop stage removes: the requested columns plus the filter columns.
    fn drop_set(&self) -> Vec<String> {
        self.drop_columns
            .iter()
            .chain(self.filter_columns.keys())
            .unique()
            .cloned()
            .collect()
    }
}

/// Restrict every table to the rows where all `filter_columns` hold their value.
pub fn filter_stage(
    tables: &[Table],
    filter_columns: &IndexMap<String, Value>,
) -> Result<Vec<Table>, AnalysisError> {
    tables
        .iter()
        .map(|table| {
            if let Some(missing) = filter_columns.keys().find(|c| !table.has_column(c)) {
                return Err(AnalysisError::MissingColumn(missing.clone()));
            }
            Ok(table.filter_rows(|row| {
                filter_columns
                    .iter()
                    .all(|(column, wanted)| table.cell(row, column) == Some(wanted))
            }))
        })
        .collect()
}

/// Remove `columns` from every table. Columns a table lacks are skipped.
pub fn drop_stage(tables: &mut [Table], columns: &[String]) {
    if columns.is_empty() {
        return;
    }
    for table in tables.iter_mut() {
        table.drop_columns(columns);
    }
}

/// Fold `tables` left to right with [`outer_join`].
pub fn join_stage(tables: Vec<Table>) -> Result<Table, AnalysisError> {
    let mut tables = tables.into_iter();
    let first = tables.next().ok_or(AnalysisError::EmptyInput)?;
    tables.try_fold(first, |merged, table| outer_join(&merged, &table))
}

/// Join two tables on the union of their timestamps.
///
/// A row only one side has a sample for gets missing cells for the other side's
/// columns. A column name both sides carry is suffixed with [`LEFT_SUFFIX`] and
/// [`RIGHT_SUFFIX`].
pub fn outer_join(left: &Table, right: &Table) -> Result<Table, AnalysisError> {
    let rows: Vec<(f64, Option<usize>, Option<usize>)> = left
        .index()
        .iter()
        .enumerate()
        .merge_join_by(right.index().iter().enumerate(), |(_, l), (_, r)| {
            l.total_cmp(r)
        })
        .map(|pair| match pair {
            EitherOrBoth::Both((l, t), (r, _)) => (*t, Some(l), Some(r)),
            EitherOrBoth::Left((l, t)) => (*t, Some(l), None),
            EitherOrBoth::Right((r, t)) => (*t, None, Some(r)),
        })
        .collect();

    let left_rows: Vec<Option<usize>> = rows.iter().map(|(_, l, _)| *l).collect();
    let right_rows: Vec<Option<usize>> = rows.iter().map(|(_, _, r)| *r).collect();
    let mut columns = IndexMap::with_capacity(left.width() + right.width());
    spread_columns(left, right, LEFT_SUFFIX, &left_rows, &mut columns)?;
    spread_columns(right, left, RIGHT_SUFFIX, &right_rows, &mut columns)?;

    trace!(
        left_rows = left.len(),
        right_rows = right.len(),
        joined_rows = rows.len(),
        "outer join"
    );
    Table::from_columns(rows.iter().map(|(t, _, _)| *t).collect(), columns)
}

/// Lay out the columns of `side` over the joined rows, `rows[i]` being the row of
/// `side` that lands on joined row `i`.
///
/// Fails if a column would land on a name already taken, as happens when a suffixed
/// name is also a plain column of either side.
fn spread_columns(
    side: &Table,
    other: &Table,
    suffix: &str,
    rows: &[Option<usize>],
    columns: &mut IndexMap<String, Vec<Option<Value>>>,
) -> Result<(), AnalysisError> {
    for (name, values) in side.columns() {
        let joined_name = if other.has_column(name) {
            format!("{name}{suffix}")
        } else {
            name.to_string()
        };
        if columns.contains_key(&joined_name) {
            return Err(AnalysisError::InvalidArgument(format!(
                "column '{name}' would be joined as '{joined_name}', which is already taken"
            )));
        }
        let spread = rows
            .iter()
            .map(|row| row.and_then(|row| values[row].clone()))
            .collect();
        columns.insert(joined_name, spread);
    }
    Ok(())
}

/// Merge `tables` into one, aligned on timestamp. The inputs are left untouched.
pub fn merge(tables: &[Table], options: &MergeOptions) -> Result<Table, AnalysisError> {
    if tables.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let mut tables = if options.filter_columns.is_empty() {
        tables.to_vec()
    } else {
        filter_stage(tables, &options.filter_columns)?
    };
    drop_stage(&mut tables, &options.drop_set());
    debug!(tables = tables.len(), "merging");
    join_stage(tables)
}

/// Like [`merge`], but the requested columns are dropped from the caller's tables
/// as well.
///
/// With a filter, the drops apply to the filtered copies only and the caller's
/// tables are left as they were.
pub fn merge_in_place(tables: &mut [Table], options: &MergeOptions) -> Result<Table, AnalysisError> {
    if !options.filter_columns.is_empty() {
        return merge(tables, options);
    }
    if tables.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    drop_stage(tables, &options.drop_columns);
    debug!(tables = tables.len(), "merging after in-place drop");
    join_stage(tables.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn table(index: &[f64], columns: Vec<(&str, Vec<Option<i64>>)>) -> Table {
        columns
            .into_iter()
            .fold(Table::new(index.to_vec()).unwrap(), |t, (name, values)| {
                t.with_column(name, values.into_iter().map(|v| v.map(Value::Int)).collect())
                    .unwrap()
            })
    }

    fn ints(table: &Table, column: &str) -> Vec<Option<i64>> {
        table
            .column(column)
            .unwrap()
            .iter()
            .map(|cell| match cell {
                Some(Value::Int(v)) => Some(*v),
                None => None,
                other => panic!("unexpected cell {other:?}"),
            })
            .collect()
    }

    #[test]
    fn outer_join_keeps_every_timestamp() {
        let freq = table(&[1.0, 3.0], vec![("freq", vec![Some(100), Some(200)])]);
        let util = table(&[2.0, 3.0, 4.0], vec![("util", vec![Some(5), Some(6), Some(7)])]);
        let merged = merge(&[freq, util], &MergeOptions::default()).unwrap();

        assert_eq!(merged.index(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ints(&merged, "freq"), vec![Some(100), None, Some(200), None]);
        assert_eq!(ints(&merged, "util"), vec![None, Some(5), Some(6), Some(7)]);
    }

    #[test]
    fn colliding_columns_are_suffixed() {
        let a = table(&[1.0], vec![("cpu", vec![Some(0)]), ("a", vec![Some(1)])]);
        let b = table(&[2.0], vec![("cpu", vec![Some(1)]), ("b", vec![Some(2)])]);
        let merged = outer_join(&a, &b).unwrap();
        assert_eq!(
            merged.column_names().collect::<Vec<_>>(),
            vec!["cpu_x", "a", "cpu_y", "b"]
        );
        assert_eq!(ints(&merged, "cpu_x"), vec![Some(0), None]);
        assert_eq!(ints(&merged, "cpu_y"), vec![None, Some(1)]);
    }

    #[test]
    fn suffix_clashing_with_a_column_is_an_error() {
        let a = table(&[1.0], vec![("v", vec![Some(1)]), ("v_x", vec![Some(2)])]);
        let b = table(&[1.0], vec![("v", vec![Some(3)])]);
        assert!(matches!(
            outer_join(&a, &b),
            Err(AnalysisError::InvalidArgument(msg)) if msg.contains("'v_x'")
        ));

        // The right side's plain column can clash with the left side's suffix too
        let c = table(&[2.0], vec![("v", vec![Some(4)]), ("v_x", vec![Some(5)])]);
        let d = table(&[2.0], vec![("v", vec![Some(6)])]);
        assert!(merge(&[d, c], &MergeOptions::default()).is_err());
    }

    #[test]
    fn drop_avoids_suffixes() {
        let a = table(&[1.0], vec![("cpu", vec![Some(0)]), ("a", vec![Some(1)])]);
        let b = table(&[2.0], vec![("cpu", vec![Some(1)]), ("b", vec![Some(2)])]);
        let merged = merge(&[a, b], &MergeOptions::drop(&["cpu"])).unwrap();
        assert_eq!(merged.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn filter_restricts_rows_and_drops_filter_columns() {
        let a = table(
            &[1.0, 2.0, 3.0],
            vec![
                ("cpu", vec![Some(0), Some(1), Some(0)]),
                ("a", vec![Some(10), Some(20), Some(30)]),
            ],
        );
        let b = table(
            &[1.5, 2.5],
            vec![("cpu", vec![Some(1), Some(0)]), ("b", vec![Some(15), Some(25)])],
        );
        let options = MergeOptions::default().filter("cpu", 0_i64);
        let merged = merge(&[a, b], &options).unwrap();

        assert_eq!(merged.index(), &[1.0, 2.5, 3.0]);
        assert_eq!(merged.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(ints(&merged, "a"), vec![Some(10), None, Some(30)]);
        assert_eq!(ints(&merged, "b"), vec![None, Some(25), None]);
    }

    #[test]
    fn filter_on_absent_column_fails() {
        let a = table(&[1.0], vec![("a", vec![Some(1)])]);
        let options = MergeOptions::default().filter("cpu", 0_i64);
        assert_eq!(
            merge(&[a], &options),
            Err(AnalysisError::MissingColumn("cpu".to_string()))
        );
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(
            merge(&[], &MergeOptions::default()),
            Err(AnalysisError::EmptyInput)
        );
        assert_eq!(join_stage(vec![]), Err(AnalysisError::EmptyInput));
    }

    #[test]
    fn single_table_passes_through() {
        let a = table(&[1.0, 2.0], vec![("a", vec![Some(1), None])]);
        assert_eq!(merge(&[a.clone()], &MergeOptions::default()).unwrap(), a);
    }

    #[test]
    fn in_place_drop_reaches_the_inputs() {
        let mut tables = vec![
            table(&[1.0], vec![("cpu", vec![Some(0)]), ("a", vec![Some(1)])]),
            table(&[2.0], vec![("cpu", vec![Some(1)]), ("b", vec![Some(2)])]),
        ];
        let options = MergeOptions::drop(&["cpu"]);

        let merged = merge(&tables, &options).unwrap();
        assert!(tables.iter().all(|t| t.has_column("cpu")));

        let merged_in_place = merge_in_place(&mut tables, &options).unwrap();
        assert_eq!(merged, merged_in_place);
        assert!(tables.iter().all(|t| !t.has_column("cpu")));
    }

    #[test]
    fn in_place_with_filter_leaves_inputs_alone() {
        let mut tables = vec![table(
            &[1.0, 2.0],
            vec![("cpu", vec![Some(0), Some(1)]), ("a", vec![Some(1), Some(2)])],
        )];
        let options = MergeOptions::drop(&["a"]).filter("cpu", 1_i64);
        let merged = merge_in_place(&mut tables, &options).unwrap();
        assert_eq!(merged.index(), &[2.0]);
        assert_eq!(merged.width(), 0);
        assert_eq!(tables[0].width(), 2);
    }
}
