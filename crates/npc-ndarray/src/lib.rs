#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on array rank accepted by the harness.
pub const MAX_RANK: usize = 5;

/// Mapping of a multidimensional index onto linear storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryOrder {
    /// Row-major: the last axis varies fastest.
    C,
    /// Column-major: the first axis varies fastest.
    F,
}

impl MemoryOrder {
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::C => 'C',
            Self::F => 'F',
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::C => "C (row-major)",
            Self::F => "Fortran (column-major)",
        }
    }

    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'C' | 'c' => Some(Self::C),
            'F' | 'f' => Some(Self::F),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("item size must be > 0")]
    InvalidItemSize,
    #[error("size arithmetic overflow")]
    Overflow,
    #[error("rank {rank} is outside 1..={max}", max = MAX_RANK)]
    RankOutOfRange { rank: usize },
    #[error("extent of axis {axis} must be positive")]
    ZeroExtent { axis: usize },
    #[error("index {index:?} does not address shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },
}

pub fn element_count(shape: &[usize]) -> Result<usize, ShapeError> {
    shape.iter().try_fold(1usize, |acc, &dim| {
        acc.checked_mul(dim).ok_or(ShapeError::Overflow)
    })
}

/// Rejects shapes the harness cannot express: rank outside `1..=MAX_RANK`
/// or a zero extent.
pub fn validate_shape(shape: &[usize]) -> Result<(), ShapeError> {
    if shape.is_empty() || shape.len() > MAX_RANK {
        return Err(ShapeError::RankOutOfRange { rank: shape.len() });
    }
    if let Some(axis) = shape.iter().position(|&dim| dim == 0) {
        return Err(ShapeError::ZeroExtent { axis });
    }
    element_count(shape).map(|_| ())
}

/// At most one axis has extent > 1, so C and F layouts store identical bytes.
#[must_use]
pub fn is_effectively_1d(shape: &[usize]) -> bool {
    shape.iter().filter(|&&dim| dim > 1).count() < 2
}

pub fn contiguous_strides(
    shape: &[usize],
    item_size: usize,
    order: MemoryOrder,
) -> Result<Vec<isize>, ShapeError> {
    if item_size == 0 {
        return Err(ShapeError::InvalidItemSize);
    }

    let mut strides_bytes = vec![0usize; shape.len()];

    match order {
        MemoryOrder::C => {
            let mut stride = item_size;
            for (i, &dim) in shape.iter().enumerate().rev() {
                strides_bytes[i] = stride;
                stride = stride.checked_mul(dim).ok_or(ShapeError::Overflow)?;
            }
        }
        MemoryOrder::F => {
            let mut stride = item_size;
            for (i, &dim) in shape.iter().enumerate() {
                strides_bytes[i] = stride;
                stride = stride.checked_mul(dim).ok_or(ShapeError::Overflow)?;
            }
        }
    }

    strides_bytes
        .into_iter()
        .map(|s| isize::try_from(s).map_err(|_| ShapeError::Overflow))
        .collect()
}

/// NumPy contiguity flags of a strided view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContiguityFlags {
    pub c_contiguous: bool,
    pub f_contiguous: bool,
}

impl ContiguityFlags {
    /// Extent-1 axes are ignored, as NumPy does, so an effectively 1-D
    /// array is both C- and F-contiguous.
    #[must_use]
    pub fn from_strides(shape: &[usize], strides: &[isize], item_size: usize) -> Self {
        if shape.contains(&0) {
            return Self {
                c_contiguous: true,
                f_contiguous: true,
            };
        }
        let contiguous_along = |axes: &mut dyn Iterator<Item = usize>| {
            let mut expected = item_size as isize;
            for axis in axes {
                let dim = shape[axis];
                if dim == 1 {
                    continue;
                }
                if strides[axis] != expected {
                    return false;
                }
                expected = expected.saturating_mul(dim as isize);
            }
            true
        };
        Self {
            c_contiguous: contiguous_along(&mut (0..shape.len()).rev()),
            f_contiguous: contiguous_along(&mut (0..shape.len())),
        }
    }

    /// `flags.carray`: C-contiguous (the reference arrays are always aligned
    /// and writeable).
    #[must_use]
    pub const fn carray(self) -> bool {
        self.c_contiguous
    }

    /// `flags.farray`: F-contiguous and not C-contiguous.
    #[must_use]
    pub const fn farray(self) -> bool {
        self.f_contiguous && !self.c_contiguous
    }

    /// Whether these flags are exactly what a `requested` layout should show.
    #[must_use]
    pub const fn matches_order(self, requested: MemoryOrder) -> bool {
        let want_c = matches!(requested, MemoryOrder::C);
        self.carray() == want_c && self.farray() == !want_c
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdLayout {
    pub shape: Vec<usize>,
    pub strides: Vec<isize>,
    pub item_size: usize,
}

impl NdLayout {
    pub fn contiguous(
        shape: Vec<usize>,
        item_size: usize,
        order: MemoryOrder,
    ) -> Result<Self, ShapeError> {
        let strides = contiguous_strides(&shape, item_size, order)?;
        Ok(Self {
            shape,
            strides,
            item_size,
        })
    }

    pub fn nbytes(&self) -> Result<usize, ShapeError> {
        element_count(&self.shape)?
            .checked_mul(self.item_size)
            .ok_or(ShapeError::Overflow)
    }

    #[must_use]
    pub fn flags(&self) -> ContiguityFlags {
        ContiguityFlags::from_strides(&self.shape, &self.strides, self.item_size)
    }

    /// Element offset (not byte offset) of `index` in storage.
    pub fn element_offset(&self, index: &[usize]) -> Result<usize, ShapeError> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, d)| i >= d)
        {
            return Err(ShapeError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.clone(),
            });
        }
        let item_size = self.item_size as isize;
        let bytes = index
            .iter()
            .zip(&self.strides)
            .try_fold(0isize, |acc, (&i, &stride)| {
                (i as isize)
                    .checked_mul(stride)
                    .and_then(|term| acc.checked_add(term))
            })
            .ok_or(ShapeError::Overflow)?;
        usize::try_from(bytes / item_size).map_err(|_| ShapeError::Overflow)
    }
}

/// First index visited by a cursor: all zeros.
#[must_use]
pub fn reset_index(rank: usize) -> Vec<usize> {
    vec![0; rank]
}

/// Advances `index` to the next position in storage order.
///
/// Returns `false` once every axis has wrapped, leaving `index` reset to
/// zeros; together with [`reset_index`] this drives a do-while walk that
/// visits each element exactly once.
pub fn next_index(shape: &[usize], order: MemoryOrder, index: &mut [usize]) -> bool {
    let mut step = |axis: usize| {
        index[axis] += 1;
        if index[axis] < shape[axis] {
            return true;
        }
        index[axis] = 0;
        false
    };
    match order {
        MemoryOrder::C => (0..shape.len()).rev().any(&mut step),
        MemoryOrder::F => (0..shape.len()).any(&mut step),
    }
}

/// Storage offset, in elements, of `index` in a contiguous array.
#[must_use]
pub fn flatten_index(shape: &[usize], order: MemoryOrder, index: &[usize]) -> usize {
    let fold = |acc: usize, axis: usize| acc * shape[axis] + index[axis];
    match order {
        MemoryOrder::C => (0..shape.len()).fold(0, fold),
        MemoryOrder::F => (0..shape.len()).rev().fold(0, fold),
    }
}

/// Iterator over every multi-index of `shape` in storage order.
#[derive(Debug, Clone)]
pub struct IndexCursor {
    shape: Vec<usize>,
    order: MemoryOrder,
    next: Option<Vec<usize>>,
}

impl IndexCursor {
    #[must_use]
    pub fn new(shape: &[usize], order: MemoryOrder) -> Self {
        let next = if shape.contains(&0) {
            None
        } else {
            Some(reset_index(shape.len()))
        };
        Self {
            shape: shape.to_vec(),
            order,
            next,
        }
    }
}

impl Iterator for IndexCursor {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut advanced = current.clone();
        if next_index(&self.shape, self.order, &mut advanced) {
            self.next = Some(advanced);
        }
        Some(current)
    }
}
