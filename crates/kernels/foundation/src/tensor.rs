//! Dense Tensors
//!
//! Row-major n-dimensional arrays backed by `Arc<[T]>` for cheap cloning.
//! A pvariable's whole lifted value lives in one [`Tensor`]; a
//! non-parameterized pvariable is a rank-0 tensor holding one element.
//!
//! Every shape operation here (broadcast, transpose, contraction over
//! repeated labels, axis selection) is expressed the same way: compute the
//! source flat offset of each output element in row-major output order, then
//! gather. The element type never changes during a shape operation.

use std::fmt;
use std::sync::Arc;

use crate::value::{DType, Value};

/// Result type for tensor operations.
pub type Result<T> = std::result::Result<T, TensorError>;

/// Errors raised by tensor construction and shape operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TensorError {
    #[error("data length {found} does not match shape {shape:?} ({expected} elements)")]
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },

    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[error("expected {expected} value, got {found}")]
    DTypeMismatch { expected: DType, found: DType },

    #[error("invalid axes {axes:?} for shape {shape:?}: {reason}")]
    InvalidAxes {
        axes: Vec<usize>,
        shape: Vec<usize>,
        reason: String,
    },
}

/// Typed element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Bool(Arc<[bool]>),
    Int(Arc<[i64]>),
    Real(Arc<[f64]>),
}

impl TensorData {
    fn len(&self) -> usize {
        match self {
            TensorData::Bool(d) => d.len(),
            TensorData::Int(d) => d.len(),
            TensorData::Real(d) => d.len(),
        }
    }

    fn dtype(&self) -> DType {
        match self {
            TensorData::Bool(_) => DType::Bool,
            TensorData::Int(_) => DType::Int,
            TensorData::Real(_) => DType::Real,
        }
    }

    fn value_at(&self, offset: usize) -> Value {
        match self {
            TensorData::Bool(d) => Value::Bool(d[offset]),
            TensorData::Int(d) => Value::Int(d[offset]),
            TensorData::Real(d) => Value::Real(d[offset]),
        }
    }

    fn gather(&self, offsets: &[usize]) -> TensorData {
        fn pick<T: Copy>(src: &[T], offsets: &[usize]) -> Arc<[T]> {
            offsets.iter().map(|&o| src[o]).collect()
        }
        match self {
            TensorData::Bool(d) => TensorData::Bool(pick(d, offsets)),
            TensorData::Int(d) => TensorData::Int(pick(d, offsets)),
            TensorData::Real(d) => TensorData::Real(pick(d, offsets)),
        }
    }
}

/// Selector for one axis when slicing a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisSelector {
    /// Keep the whole axis.
    All,
    /// Fix the axis at one index; the axis is removed from the result.
    Index(usize),
}

/// Dense row-major tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Rank-0 tensor holding a single value.
    pub fn scalar(value: Value) -> Self {
        Self::full(&[], value)
    }

    /// Tensor of the given shape with every element equal to `value`.
    pub fn full(shape: &[usize], value: Value) -> Self {
        let n = shape.iter().product();
        let data = match value {
            Value::Bool(v) => TensorData::Bool(vec![v; n].into()),
            Value::Int(v) => TensorData::Int(vec![v; n].into()),
            Value::Real(v) => TensorData::Real(vec![v; n].into()),
        };
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Tensor filled with the default element of `dtype`.
    pub fn zeros(dtype: DType, shape: &[usize]) -> Self {
        Self::full(shape, dtype.default_value())
    }

    pub fn from_reals(shape: &[usize], data: Vec<f64>) -> Result<Self> {
        Self::from_data(shape, TensorData::Real(data.into()))
    }

    pub fn from_ints(shape: &[usize], data: Vec<i64>) -> Result<Self> {
        Self::from_data(shape, TensorData::Int(data.into()))
    }

    pub fn from_bools(shape: &[usize], data: Vec<bool>) -> Result<Self> {
        Self::from_data(shape, TensorData::Bool(data.into()))
    }

    /// Build a tensor of `dtype` from row-major values.
    ///
    /// Values are widened to `dtype` (bool → int → real); a value that would
    /// need narrowing is rejected.
    pub fn from_values(dtype: DType, shape: &[usize], values: &[Value]) -> Result<Self> {
        let widened = values
            .iter()
            .map(|v| {
                v.widen_to(dtype).ok_or(TensorError::DTypeMismatch {
                    expected: dtype,
                    found: v.dtype(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let data = match dtype {
            DType::Bool => TensorData::Bool(widened.iter().filter_map(Value::as_bool).collect()),
            DType::Int => TensorData::Int(widened.iter().filter_map(Value::as_int).collect()),
            DType::Real => TensorData::Real(widened.iter().map(Value::as_real).collect()),
        };
        Self::from_data(shape, data)
    }

    fn from_data(shape: &[usize], data: TensorData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                shape: shape.to_vec(),
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// The single element of a rank-0 tensor.
    pub fn to_scalar(&self) -> Option<Value> {
        (self.shape.is_empty()).then(|| self.data.value_at(0))
    }

    /// Element at a multi-index.
    pub fn get(&self, index: &[usize]) -> Result<Value> {
        let offset = self.offset_of(index)?;
        Ok(self.data.value_at(offset))
    }

    /// Overwrite the element at a multi-index (copy-on-write).
    ///
    /// The value is widened to the tensor's dtype.
    pub fn set(&mut self, index: &[usize], value: Value) -> Result<()> {
        let offset = self.offset_of(index)?;
        let value = value
            .widen_to(self.dtype())
            .ok_or(TensorError::DTypeMismatch {
                expected: self.dtype(),
                found: value.dtype(),
            })?;
        match (&mut self.data, value) {
            (TensorData::Bool(d), Value::Bool(v)) => Arc::make_mut(d)[offset] = v,
            (TensorData::Int(d), Value::Int(v)) => Arc::make_mut(d)[offset] = v,
            (TensorData::Real(d), Value::Real(v)) => Arc::make_mut(d)[offset] = v,
            _ => unreachable!("value widened to tensor dtype"),
        }
        Ok(())
    }

    /// Row-major iterator over all elements.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(move |i| self.data.value_at(i))
    }

    /// Same elements under a new shape with the same element count.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        Self::from_data(shape, self.data.clone())
    }

    /// Element-wise cast, truncating reals cast to int.
    pub fn cast(&self, dtype: DType) -> Self {
        if dtype == self.dtype() {
            return self.clone();
        }
        let values: Vec<Value> = self.values().map(|v| v.cast(dtype)).collect();
        let data = match dtype {
            DType::Bool => TensorData::Bool(values.iter().filter_map(Value::as_bool).collect()),
            DType::Int => TensorData::Int(values.iter().filter_map(Value::as_int).collect()),
            DType::Real => TensorData::Real(values.iter().map(Value::as_real).collect()),
        };
        Self {
            shape: self.shape.clone(),
            data,
        }
    }

    /// Append trailing axes of the given sizes and broadcast into them.
    ///
    /// For an input of shape `s` the result has shape `s ++ new_dims` and
    /// `out[i.., j..] == in[i..]`.
    pub fn broadcast_trailing(&self, new_dims: &[usize]) -> Self {
        if new_dims.is_empty() {
            return self.clone();
        }
        let repeat: usize = new_dims.iter().product();
        let offsets: Vec<usize> = (0..self.len() * repeat).map(|o| o / repeat).collect();
        let mut shape = self.shape.clone();
        shape.extend_from_slice(new_dims);
        Self {
            shape,
            data: self.data.gather(&offsets),
        }
    }

    /// Reorder axes: output axis `k` is input axis `axes[k]`.
    pub fn transpose(&self, axes: &[usize]) -> Result<Self> {
        let mut seen = vec![false; self.ndim()];
        if axes.len() != self.ndim() {
            return Err(self.invalid_axes(axes, "permutation length differs from rank"));
        }
        for &a in axes {
            if a >= self.ndim() || seen[a] {
                return Err(self.invalid_axes(axes, "not a permutation"));
            }
            seen[a] = true;
        }
        // input axis i is read from output axis labels[i]
        let mut labels = vec![0; axes.len()];
        for (k, &a) in axes.iter().enumerate() {
            labels[a] = k;
        }
        self.contract(&labels, axes.len())
    }

    /// Single-operand contraction over repeated labels (`lhs -> rhs`).
    ///
    /// Input axis `i` carries label `labels[i]`; the output has one axis per
    /// label in `0..out_rank`, in label order. Axes sharing a label are read
    /// along their diagonal, so `labels = [0, 0]` extracts the diagonal of a
    /// square matrix and `labels = [1, 0]` transposes it. Every output label
    /// must be carried by at least one input axis, and axes sharing a label
    /// must have equal length.
    pub fn contract(&self, labels: &[usize], out_rank: usize) -> Result<Self> {
        if labels.len() != self.ndim() {
            return Err(self.invalid_axes(labels, "one label per input axis required"));
        }
        let mut out_shape: Vec<Option<usize>> = vec![None; out_rank];
        for (axis, &label) in labels.iter().enumerate() {
            if label >= out_rank {
                return Err(self.invalid_axes(labels, "label outside output rank"));
            }
            match out_shape[label] {
                Some(n) if n != self.shape[axis] => {
                    return Err(self.invalid_axes(labels, "repeated label with unequal lengths"));
                }
                _ => out_shape[label] = Some(self.shape[axis]),
            }
        }
        let out_shape = out_shape
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.invalid_axes(labels, "output label not present in input"))?;

        let in_strides = row_major_strides(&self.shape);
        let mut offsets = Vec::with_capacity(out_shape.iter().product());
        for_each_index(&out_shape, |out| {
            offsets.push(
                labels
                    .iter()
                    .zip(&in_strides)
                    .map(|(&label, &stride)| out[label] * stride)
                    .sum(),
            );
        });
        Ok(Self {
            shape: out_shape,
            data: self.data.gather(&offsets),
        })
    }

    /// Fix some axes at an index; fixed axes are dropped from the result.
    pub fn select(&self, selectors: &[AxisSelector]) -> Result<Self> {
        if selectors.len() != self.ndim() {
            return Err(TensorError::InvalidAxes {
                axes: Vec::new(),
                shape: self.shape.clone(),
                reason: format!("{} selectors for rank {}", selectors.len(), self.ndim()),
            });
        }
        let strides = row_major_strides(&self.shape);
        let mut base = 0;
        let mut kept_shape = Vec::new();
        let mut kept_strides = Vec::new();
        for (axis, selector) in selectors.iter().enumerate() {
            match *selector {
                AxisSelector::All => {
                    kept_shape.push(self.shape[axis]);
                    kept_strides.push(strides[axis]);
                }
                AxisSelector::Index(i) if i < self.shape[axis] => base += i * strides[axis],
                AxisSelector::Index(i) => {
                    let mut index = vec![0; self.ndim()];
                    index[axis] = i;
                    return Err(TensorError::IndexOutOfBounds {
                        index,
                        shape: self.shape.clone(),
                    });
                }
            }
        }
        let mut offsets = Vec::with_capacity(kept_shape.iter().product());
        for_each_index(&kept_shape, |idx| {
            offsets.push(base + idx.iter().zip(&kept_strides).map(|(i, s)| i * s).sum::<usize>());
        });
        Ok(Self {
            shape: kept_shape,
            data: self.data.gather(&offsets),
        })
    }

    fn offset_of(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.ndim() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return Err(TensorError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.clone(),
            });
        }
        Ok(index
            .iter()
            .zip(row_major_strides(&self.shape))
            .map(|(i, s)| i * s)
            .sum())
    }

    fn invalid_axes(&self, axes: &[usize], reason: &str) -> TensorError {
        TensorError::InvalidAxes {
            axes: axes.to_vec(),
            shape: self.shape.clone(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.to_scalar() {
            return write!(f, "{}", v);
        }
        write!(f, "{}{:?}[", self.dtype(), self.shape)?;
        for (i, v) in self.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", v)?;
        }
        f.write_str("]")
    }
}

/// Row-major strides for a shape.
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Visit every multi-index of `shape` in row-major order.
///
/// A rank-0 shape is visited once with an empty index; any zero-length axis
/// means nothing is visited.
pub fn for_each_index(shape: &[usize], mut f: impl FnMut(&[usize])) {
    if shape.contains(&0) {
        return;
    }
    let mut index = vec![0; shape.len()];
    loop {
        f(&index);
        let mut axis = shape.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
}
