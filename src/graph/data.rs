//! Values flowing between steps and the lock-protected objects holding them.
//!
//! A [`DataObject`] is the only thing shared across trigger threads. Every
//! read returns a copy of the last fully-written value, so a consumer on
//! another root trigger sees at worst the previous cycle's output, never a
//! half-written one.

use crate::graph::id::StepId;
use crate::graph::sync::lock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Declared semantic type of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Scalar,
    Matrix,
    Record,
    Flag,
    /// Accepts any value. Useful for pass-through steps such as network writers.
    Any,
}

impl DataType {
    /// Whether a value declared as `source` can flow into a slot declared as `self`.
    ///
    /// `Any` is only accepted on the receiving side; an `Any` source must feed
    /// an `Any` input so mismatches surface when connecting, not mid-cycle.
    pub fn accepts(self, source: DataType) -> bool {
        self == DataType::Any || self == source
    }

    /// Initial value of an output slot of this type.
    pub fn default_value(self) -> DataValue {
        match self {
            DataType::Scalar | DataType::Any => DataValue::Scalar(0.0),
            DataType::Matrix => DataValue::Matrix(Matrix::zeros(1, 1)),
            DataType::Record => DataValue::Record(BTreeMap::new()),
            DataType::Flag => DataValue::Flag(false),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Scalar => "scalar",
            DataType::Matrix => "matrix",
            DataType::Record => "record",
            DataType::Flag => "flag",
            DataType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from row-major data. Returns `None` if the length does not match the shape.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Element-wise combination. `None` on shape mismatch.
    pub fn zip_with(&self, other: &Matrix, f: impl Fn(f64, f64) -> f64) -> Option<Self> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(Self {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }
}

/// A value produced by a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Scalar(f64),
    Matrix(Matrix),
    Record(BTreeMap<String, f64>),
    Flag(bool),
}

impl DataValue {
    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::Scalar(_) => DataType::Scalar,
            DataValue::Matrix(_) => DataType::Matrix,
            DataValue::Record(_) => DataType::Record,
            DataValue::Flag(_) => DataType::Flag,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            DataValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            DataValue::Matrix(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            DataValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Apply `f` to every numeric element. Flags and record keys are left as-is.
    pub fn map_numeric(&self, f: impl Fn(f64) -> f64) -> DataValue {
        match self {
            DataValue::Scalar(v) => DataValue::Scalar(f(*v)),
            DataValue::Matrix(m) => DataValue::Matrix(m.map(f)),
            DataValue::Record(r) => {
                DataValue::Record(r.iter().map(|(k, &v)| (k.clone(), f(v))).collect())
            }
            DataValue::Flag(b) => DataValue::Flag(*b),
        }
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Scalar(v)
    }
}

impl From<Matrix> for DataValue {
    fn from(m: Matrix) -> Self {
        DataValue::Matrix(m)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Flag(b)
    }
}

struct DataState {
    value: DataValue,
    changed: bool,
    version: u64,
}

/// Lock-protected container for one slot's value.
pub struct DataObject {
    name: String,
    data_type: DataType,
    owner: Option<StepId>,
    state: Mutex<DataState>,
    written: Condvar,
}

impl DataObject {
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        initial: DataValue,
        owner: Option<StepId>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            owner,
            state: Mutex::new(DataState {
                value: initial,
                changed: false,
                version: 0,
            }),
            written: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The step that writes this object, or `None` for external inputs.
    pub fn owner(&self) -> Option<StepId> {
        self.owner
    }

    /// Copy of the last fully-written value.
    pub fn read(&self) -> DataValue {
        lock(&self.state).value.clone()
    }

    /// Run `f` against the current value while holding the lock.
    pub fn with_value<R>(&self, f: impl FnOnce(&DataValue) -> R) -> R {
        f(&lock(&self.state).value)
    }

    /// Store a new value, mark it changed and wake one blocked reader.
    pub fn write(&self, value: DataValue) {
        debug_assert!(
            self.data_type.accepts(value.data_type()),
            "slot '{}' declared {} but was written {}",
            self.name,
            self.data_type,
            value.data_type()
        );
        {
            let mut state = lock(&self.state);
            state.value = value;
            state.changed = true;
            state.version += 1;
        }
        self.written.notify_one();
    }

    /// Number of writes so far.
    pub fn version(&self) -> u64 {
        lock(&self.state).version
    }

    pub fn is_changed(&self) -> bool {
        lock(&self.state).changed
    }

    /// Read and clear the changed flag.
    pub fn take_changed(&self) -> bool {
        std::mem::take(&mut lock(&self.state).changed)
    }

    /// Block until a write newer than `since_version` lands, or `timeout` elapses.
    ///
    /// Returns the new value and its version.
    pub fn wait_for_write(&self, since_version: u64, timeout: Duration) -> Option<(DataValue, u64)> {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.state);
        while state.version <= since_version {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, result) = self
                .written
                .wait_timeout(state, remaining)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            state = guard;
            if result.timed_out() && state.version <= since_version {
                return None;
            }
        }
        Some((state.value.clone(), state.version))
    }
}

impl fmt::Debug for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataObject")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("owner", &self.owner)
            .field("version", &self.version())
            .finish()
    }
}
