use super::error::EvalError;
use super::Value;

/// A tabular dataset: an ordered set of named columns sharing one row
/// count. Cells are [`Value`]s; `Value::Na` marks missing data.
///
/// Datasets are read-only for the duration of a confrontation.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    columns: Vec<(String, Vec<Value>)>,
}

impl DataSet {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a column. Row-count agreement is checked when the
    /// dataset enters a confrontation.
    #[must_use]
    pub fn column<V: Into<Value>>(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if let Some(slot) = self.columns.iter_mut().find(|(n, _)| n == name) {
            slot.1 = values;
        } else {
            self.columns.push((name.to_owned(), values));
        }
        self
    }

    /// Look up a column by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Column names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over `(name, column)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// The shared row count (0 for an empty dataset).
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    /// The number of columns.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Verify that every column has the shared row count.
    pub(crate) fn check_shape(&self) -> Result<(), EvalError> {
        let expected = self.nrows();
        for (name, values) in &self.columns {
            if values.len() != expected {
                return Err(EvalError::ColumnLength {
                    column: name.clone(),
                    expected,
                    got: values.len(),
                });
            }
        }
        Ok(())
    }
}

/// The named datasets supplied to a confrontation: one primary dataset and
/// any number of reference datasets.
///
/// Variable binding resolves against the primary dataset first, then falls
/// back to the references in insertion order.
#[derive(Debug, Clone)]
pub struct DataEnv {
    primary: DataSet,
    references: Vec<(String, DataSet)>,
}

impl DataEnv {
    /// Wrap a primary dataset.
    #[must_use]
    pub fn new(primary: DataSet) -> Self {
        Self {
            primary,
            references: Vec::new(),
        }
    }

    /// Attach a named reference dataset.
    #[must_use]
    pub fn reference(mut self, name: &str, dataset: DataSet) -> Self {
        self.references.push((name.to_owned(), dataset));
        self
    }

    #[must_use]
    pub fn primary(&self) -> &DataSet {
        &self.primary
    }

    pub(crate) fn references(&self) -> impl Iterator<Item = (&str, &DataSet)> {
        self.references.iter().map(|(n, d)| (n.as_str(), d))
    }
}

impl From<DataSet> for DataEnv {
    fn from(primary: DataSet) -> Self {
        DataEnv::new(primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_builder_and_lookup() {
        let ds = DataSet::new()
            .column("age", [25_i64, 40, 17])
            .column("status", ["active", "inactive", "active"]);
        assert_eq!(ds.nrows(), 3);
        assert_eq!(ds.ncols(), 2);
        assert_eq!(ds.get("age"), Some(&[Value::Int(25), Value::Int(40), Value::Int(17)][..]));
        assert_eq!(ds.get("missing"), None);
    }

    #[test]
    fn column_replaces_existing() {
        let ds = DataSet::new().column("x", [1_i64]).column("x", [2_i64]);
        assert_eq!(ds.ncols(), 1);
        assert_eq!(ds.get("x"), Some(&[Value::Int(2)][..]));
    }

    #[test]
    fn na_cells() {
        let ds = DataSet::new().column("x", [Value::Int(1), Value::Na]);
        assert_eq!(ds.get("x").unwrap()[1], Value::Na);
    }

    #[test]
    fn shape_check_catches_ragged_columns() {
        let ds = DataSet::new()
            .column("a", [1_i64, 2])
            .column("b", [1_i64, 2, 3]);
        assert!(matches!(
            ds.check_shape(),
            Err(EvalError::ColumnLength { column, expected: 2, got: 3 }) if column == "b"
        ));
    }

    #[test]
    fn empty_dataset_has_zero_rows() {
        let ds = DataSet::new();
        assert_eq!(ds.nrows(), 0);
        assert!(ds.check_shape().is_ok());
    }

    #[test]
    fn env_reference_order_preserved() {
        let env = DataEnv::new(DataSet::new().column("x", [1_i64]))
            .reference("codes", DataSet::new().column("code", ["A"]))
            .reference("rates", DataSet::new().column("rate", [0.1_f64]));
        let names: Vec<&str> = env.references().map(|(n, _)| n).collect();
        assert_eq!(names, ["codes", "rates"]);
    }
}
