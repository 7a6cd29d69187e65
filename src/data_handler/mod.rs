use crate::config::ColumnMapping;
use crate::errors::MetricError;
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A class label. Integer and string labels are kept apart so that `1` and `"1"` never compare
/// equal; the `Display` form is what keys the per-class entries of rendered results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Str(String),
}

impl Label {
    /// Column names of probability tables are class labels; numeric names map back to integer
    /// labels.
    pub fn parse(value: &str) -> Label {
        match value.parse::<i64>() {
            Ok(i) => Label::Int(i),
            Err(_) => Label::Str(value.to_string()),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Label {
        Label::Int(value)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Label {
        Label::Str(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Label {
        Label::Str(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Current,
    Reference,
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the column as class labels. Float columns hold scores, not labels.
    pub(crate) fn labels(&self, name: &str) -> Result<Vec<Label>, MetricError> {
        match self {
            Self::Int(v) => Ok(v.iter().map(|i| Label::Int(*i)).collect()),
            Self::Str(v) => Ok(v.iter().map(|s| Label::Str(s.clone())).collect()),
            Self::Float(_) => Err(MetricError::UnsupportedColumnType {
                column: name.to_string(),
                expected: "integer or string label".into(),
            }),
        }
    }

    /// Reads the column as probabilities.
    pub(crate) fn floats(&self, name: &str) -> Result<Vec<f64>, MetricError> {
        match self {
            Self::Float(v) => Ok(v.clone()),
            Self::Int(v) => Ok(v.iter().map(|i| *i as f64).collect()),
            Self::Str(_) => Err(MetricError::UnsupportedColumnType {
                column: name.to_string(),
                expected: "numeric probability".into(),
            }),
        }
    }
}

/// Column oriented table. All columns share the same row count.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<ColumnData>,
    index: HashMap<String, usize>,
    n_rows: usize,
}

impl Dataset {
    pub fn new() -> Dataset {
        Dataset::default()
    }

    /// Adds or replaces a column. Errors when the column length differs from the existing rows.
    pub fn with_column<S>(mut self, name: S, data: ColumnData) -> Result<Dataset, MetricError>
    where
        S: Into<String>,
    {
        if !self.columns.is_empty() && data.len() != self.n_rows {
            return Err(MetricError::DataVectorLengthMismatch);
        }
        self.n_rows = data.len();
        let name: String = name.into();
        match self.index.get(&name) {
            Some(pos) => self.columns[*pos] = data,
            None => {
                self.index.insert(name.clone(), self.columns.len());
                self.names.push(name);
                self.columns.push(data);
            }
        }
        Ok(self)
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Dataset, MetricError>
    where
        I: IntoIterator<Item = (S, ColumnData)>,
        S: Into<String>,
    {
        let mut dataset = Dataset::new();
        for (name, data) in columns {
            dataset = dataset.with_column(name, data)?;
        }
        Ok(dataset)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.index.get(name).map(|pos| &self.columns[*pos])
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn require(&self, name: &str, kind: DatasetKind) -> Result<&ColumnData, MetricError> {
        self.column(name)
            .ok_or_else(|| MetricError::column_not_found(name, &kind.to_string()))
    }
}

/// What a metric receives for one report run.
#[derive(Debug, Clone)]
pub struct InputData {
    pub current_data: Dataset,
    pub reference_data: Option<Dataset>,
    pub column_mapping: ColumnMapping,
}

impl InputData {
    pub fn new(
        current_data: Dataset,
        reference_data: Option<Dataset>,
        column_mapping: ColumnMapping,
    ) -> InputData {
        InputData {
            current_data,
            reference_data,
            column_mapping,
        }
    }
}

/// Distinct labels in order of first appearance.
pub(crate) fn unique_labels(values: &[Label]) -> Vec<Label> {
    let mut seen: HashSet<&Label> = HashSet::with_capacity(values.len().min(64));
    let mut unique: Vec<Label> = Vec::new();
    for v in values.iter() {
        if seen.insert(v) {
            unique.push(v.clone());
        }
    }
    unique
}

/// Sorted union of the labels observed in both slices.
pub(crate) fn sorted_union(a: &[Label], b: &[Label]) -> Vec<Label> {
    let mut labels: Vec<Label> = a.iter().chain(b.iter()).cloned().collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Normalised label counts, most frequent first. Ties keep the order of first appearance.
pub fn label_frequencies(values: &[Label]) -> Vec<(Label, f64)> {
    let mut counts: HashMap<&Label, (usize, usize)> = HashMap::new();
    for (pos, v) in values.iter().enumerate() {
        counts.entry(v).or_insert((0, pos)).0 += 1;
    }
    let mut ordered: Vec<(&Label, (usize, usize))> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

    let n = values.len() as f64;
    ordered
        .into_iter()
        .map(|(label, (count, _))| (label.clone(), count as f64 / n))
        .collect()
}

/// Draws `size` labels from a categorical distribution by inverse CDF lookup on a seeded
/// generator. The same seed, distribution and size always yield the same sequence.
pub fn sample_by_frequency(
    distribution: &[(Label, f64)],
    size: usize,
    seed: u64,
) -> Result<Vec<Label>, MetricError> {
    if distribution.is_empty() {
        return Err(MetricError::EmptyDataset("label distribution".into()));
    }
    let mut cdf: Vec<f64> = Vec::with_capacity(distribution.len());
    let mut acc = 0_f64;
    for (_, p) in distribution.iter() {
        acc += p;
        cdf.push(acc);
    }
    let total = acc;
    cdf.iter_mut().for_each(|c| *c /= total);

    let last = distribution.len() - 1;
    let mut rng = StdRng::seed_from_u64(seed);
    let sampled = (0..size)
        .map(|_| {
            let u: f64 = rng.gen();
            let pos = cdf.partition_point(|c| *c <= u).min(last);
            distribution[pos].0.clone()
        })
        .collect();
    Ok(sampled)
}

#[cfg(feature = "python")]
pub(crate) mod py_types_handler {
    use super::{ColumnData, Dataset, Label};
    use numpy::{PyArrayDescrMethods, PyUntypedArray, PyUntypedArrayMethods};
    use pyo3::prelude::*;
    use pyo3::types::{PyBool, PyDict, PyFloat, PyList, PyString};

    pub enum PassedType {
        Float,
        Integer,
        String,
    }

    pub fn determine_type(py: Python<'_>, array: &Bound<'_, PyUntypedArray>) -> PassedType {
        let element_type = array.dtype();

        if element_type.is_equiv_to(&numpy::dtype::<f64>(py))
            | element_type.is_equiv_to(&numpy::dtype::<f32>(py))
        {
            PassedType::Float
        } else if element_type.is_equiv_to(&numpy::dtype::<i32>(py))
            | element_type.is_equiv_to(&numpy::dtype::<i64>(py))
            | element_type.is_equiv_to(&numpy::dtype::<i16>(py))
        {
            PassedType::Integer
        } else {
            PassedType::String
        }
    }

    fn convert_column(py: Python<'_>, arr: &Bound<'_, PyUntypedArray>) -> PyResult<ColumnData> {
        let column = match determine_type(py, arr) {
            PassedType::Float => {
                let mut data: Vec<f64> = Vec::with_capacity(arr.len());
                for item in arr.as_any().try_iter()? {
                    data.push(item?.extract::<f64>()?);
                }
                ColumnData::Float(data)
            }
            PassedType::Integer => {
                let mut data: Vec<i64> = Vec::with_capacity(arr.len());
                for item in arr.as_any().try_iter()? {
                    data.push(item?.extract::<i64>()?);
                }
                ColumnData::Int(data)
            }
            PassedType::String => {
                let mut data: Vec<String> = Vec::with_capacity(arr.len());
                for item in arr.as_any().try_iter()? {
                    data.push(item?.str()?.to_string());
                }
                ColumnData::Str(data)
            }
        };
        Ok(column)
    }

    /// Builds a dataset from a dict of column name to numpy array.
    pub fn dataset_from_py(py: Python<'_>, columns: &Bound<'_, PyDict>) -> PyResult<Dataset> {
        let mut dataset = Dataset::new();
        for (name, arr) in columns.iter() {
            let name: String = name.extract()?;
            let arr = arr.downcast::<PyUntypedArray>()?;
            let data = convert_column(py, arr)?;
            dataset = dataset.with_column(name, data).map_err(PyErr::from)?;
        }
        Ok(dataset)
    }

    pub fn label_from_py(value: &Bound<'_, PyAny>) -> PyResult<Label> {
        if let Ok(i) = value.extract::<i64>() {
            return Ok(Label::Int(i));
        }
        let s: String = value.extract()?;
        Ok(Label::Str(s))
    }

    pub fn json_to_py<'py>(
        py: Python<'py>,
        value: &serde_json::Value,
    ) -> PyResult<Bound<'py, PyAny>> {
        use serde_json::Value;
        let obj = match value {
            Value::Null => py.None().into_bound(py),
            Value::Bool(b) => PyBool::new(py, *b).to_owned().into_any(),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i.into_pyobject(py)?.into_any(),
                None => PyFloat::new(py, n.as_f64().unwrap_or(f64::NAN)).into_any(),
            },
            Value::String(s) => PyString::new(py, s).into_any(),
            Value::Array(items) => {
                let list = PyList::empty(py);
                for item in items.iter() {
                    list.append(json_to_py(py, item)?)?;
                }
                list.into_any()
            }
            Value::Object(map) => {
                let dict = PyDict::new(py);
                for (k, v) in map.iter() {
                    dict.set_item(k.as_str(), json_to_py(py, v)?)?;
                }
                dict.into_any()
            }
        };
        Ok(obj)
    }
}
