//! Deterministic enumeration of conformance cases.

use crate::error::HarnessError;
use npc_dtype::{ByteOrder, DType, DTypeError};
use npc_io::shape_tuple_repr;
use npc_ndarray::{MemoryOrder, ShapeError, element_count, is_effectively_1d, validate_shape};
use std::fmt;
use thiserror::Error;

const FAST_SHAPES: &[&[usize]] = &[&[1], &[2], &[3], &[1, 1], &[2, 3], &[2, 3, 5], &[2, 3, 5, 7]];

const SLOW_SHAPES: &[&[usize]] = &[
    &[1],
    &[2],
    &[3],
    &[12094],
    &[1, 1],
    &[1, 2],
    &[2, 2],
    &[2, 3],
    &[3, 3],
    &[53, 661],
    &[1, 1, 1],
    &[1, 1, 2],
    &[1, 2, 3],
    &[2, 2, 2],
    &[2, 3, 5],
    &[3, 3, 3],
    &[1, 1, 1, 1],
    &[1, 1, 1, 2],
    &[1, 1, 2, 3],
    &[1, 2, 3, 5],
    &[2, 2, 2, 2],
    &[2, 3, 5, 7],
    &[5, 7, 11, 13],
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    ByteOrder(#[from] DTypeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSpeed {
    Fast,
    Slow,
}

impl CatalogSpeed {
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "fast" => Some(Self::Fast),
            "slow" => Some(Self::Slow),
            _ => None,
        }
    }

    #[must_use]
    pub const fn shapes(self) -> &'static [&'static [usize]] {
        match self {
            Self::Fast => FAST_SHAPES,
            Self::Slow => SLOW_SHAPES,
        }
    }
}

/// Reads the speed from the arguments after the program name: none means
/// fast, otherwise exactly one of `fast` or `slow`.
pub fn parse_speed_args(program: &str, args: &[String]) -> Result<CatalogSpeed, HarnessError> {
    match args {
        [] => Ok(CatalogSpeed::Fast),
        [token] => CatalogSpeed::parse(token).ok_or_else(|| usage(program)),
        _ => Err(usage(program)),
    }
}

fn usage(program: &str) -> HarnessError {
    HarnessError::Usage(format!("Usage: {program} [fast|slow]"))
}

/// One point of the dtype × byte order × layout × shape cross product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    dtype: DType,
    byte_order: ByteOrder,
    layout: MemoryOrder,
    shape: Vec<usize>,
}

impl TestCase {
    /// Single-byte dtypes take `NotApplicable` whatever order is requested.
    pub fn new(
        dtype: DType,
        byte_order: ByteOrder,
        layout: MemoryOrder,
        shape: Vec<usize>,
    ) -> Result<Self, CaseError> {
        validate_shape(&shape)?;
        let byte_order = byte_order.normalize_for(dtype)?;
        Ok(Self {
            dtype,
            byte_order,
            layout,
            shape,
        })
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    #[must_use]
    pub fn layout(&self) -> MemoryOrder {
        self.layout
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        // Validated at construction.
        element_count(&self.shape).unwrap_or(0)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, {} {}",
            self.dtype.code(),
            self.byte_order.symbol(),
            shape_tuple_repr(&self.shape),
            self.layout.letter().to_ascii_lowercase()
        )
    }
}

/// Byte orders exercised for `dtype`.
#[must_use]
pub fn byte_orders_for(dtype: DType) -> &'static [ByteOrder] {
    if dtype.is_single_byte() {
        &[ByteOrder::NotApplicable]
    } else {
        &[ByteOrder::Little, ByteOrder::Big]
    }
}

/// Layouts exercised for `shape`; C and F coincide when it is effectively 1-D.
#[must_use]
pub fn layouts_for(shape: &[usize]) -> &'static [MemoryOrder] {
    if is_effectively_1d(shape) {
        &[MemoryOrder::C]
    } else {
        &[MemoryOrder::F, MemoryOrder::C]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMatrix {
    shapes: Vec<Vec<usize>>,
}

impl TestMatrix {
    #[must_use]
    pub fn new(speed: CatalogSpeed) -> Self {
        Self {
            shapes: speed.shapes().iter().map(|shape| shape.to_vec()).collect(),
        }
    }

    /// Matrix over a custom shape catalog.
    pub fn with_shapes(shapes: Vec<Vec<usize>>) -> Result<Self, CaseError> {
        for shape in &shapes {
            validate_shape(shape)?;
        }
        Ok(Self { shapes })
    }

    #[must_use]
    pub fn shapes(&self) -> &[Vec<usize>] {
        &self.shapes
    }

    /// Cases in dtype → byte order → shape → layout order. Each call
    /// starts a fresh walk.
    pub fn cases(&self) -> impl Iterator<Item = TestCase> + '_ {
        DType::ALL.into_iter().flat_map(move |dtype| {
            byte_orders_for(dtype).iter().flat_map(move |&byte_order| {
                self.shapes.iter().flat_map(move |shape| {
                    layouts_for(shape).iter().map(move |&layout| TestCase {
                        dtype,
                        byte_order,
                        layout,
                        shape: shape.clone(),
                    })
                })
            })
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let per_byte_order: usize = self
            .shapes
            .iter()
            .map(|shape| layouts_for(shape).len())
            .sum();
        let byte_orders: usize = DType::ALL
            .into_iter()
            .map(|dtype| byte_orders_for(dtype).len())
            .sum();
        per_byte_order * byte_orders
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{CaseError, CatalogSpeed, TestCase, TestMatrix, parse_speed_args};
    use crate::error::HarnessError;
    use npc_dtype::{ByteOrder, DType};
    use npc_ndarray::{MemoryOrder, ShapeError};

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn speed_arguments_default_to_fast() {
        assert_eq!(
            parse_speed_args("generate_and_run", &args(&[])).expect("no args"),
            CatalogSpeed::Fast
        );
        assert_eq!(
            parse_speed_args("generate_and_run", &args(&["fast"])).expect("fast"),
            CatalogSpeed::Fast
        );
        assert_eq!(
            parse_speed_args("generate_and_run", &args(&["slow"])).expect("slow"),
            CatalogSpeed::Slow
        );
    }

    #[test]
    fn unknown_or_extra_speed_arguments_yield_usage() {
        for bad in [&["bogus"][..], &["fast", "slow"][..], &["FAST"][..], &[""][..]] {
            match parse_speed_args("./generate_and_run", &args(bad)) {
                Err(HarnessError::Usage(message)) => {
                    assert_eq!(message, "Usage: ./generate_and_run [fast|slow]");
                }
                other => panic!("{bad:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn fast_matrix_has_expected_size() {
        let matrix = TestMatrix::new(CatalogSpeed::Fast);
        assert_eq!(matrix.len(), 230);
        assert_eq!(matrix.cases().count(), 230);
    }

    #[test]
    fn slow_matrix_has_expected_size() {
        let matrix = TestMatrix::new(CatalogSpeed::Slow);
        assert_eq!(matrix.len(), 828);
        assert_eq!(matrix.cases().count(), matrix.len());
    }

    #[test]
    fn enumeration_order_is_dtype_then_byte_order_then_shape_then_layout() {
        let matrix = TestMatrix::new(CatalogSpeed::Fast);
        let labels: Vec<String> = matrix.cases().take(12).map(|c| c.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "? |, (1,) c",
                "? |, (2,) c",
                "? |, (3,) c",
                "? |, (1, 1) c",
                "? |, (2, 3) f",
                "? |, (2, 3) c",
                "? |, (2, 3, 5) f",
                "? |, (2, 3, 5) c",
                "? |, (2, 3, 5, 7) f",
                "? |, (2, 3, 5, 7) c",
                "i1 |, (1,) c",
                "i1 |, (2,) c",
            ]
        );
        let i2 = matrix
            .cases()
            .filter(|c| c.dtype() == DType::I16)
            .map(|c| c.byte_order())
            .collect::<Vec<_>>();
        assert_eq!(i2.len(), 20);
        assert!(i2[..10].iter().all(|o| *o == ByteOrder::Little));
        assert!(i2[10..].iter().all(|o| *o == ByteOrder::Big));
    }

    #[test]
    fn cases_restart_on_every_call() {
        let matrix = TestMatrix::new(CatalogSpeed::Fast);
        let first: Vec<TestCase> = matrix.cases().take(3).collect();
        let again: Vec<TestCase> = matrix.cases().take(3).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn effectively_1d_shapes_only_test_c_layout() {
        let matrix = TestMatrix::new(CatalogSpeed::Slow);
        assert!(
            matrix
                .cases()
                .filter(|c| c.shape() == [1, 1, 1, 2])
                .all(|c| c.layout() == MemoryOrder::C)
        );
    }

    #[test]
    fn case_construction_validates_shape_and_byte_order() {
        assert_eq!(
            TestCase::new(DType::I32, ByteOrder::Big, MemoryOrder::C, vec![1, 1, 1, 1, 1, 1]),
            Err(CaseError::Shape(ShapeError::RankOutOfRange { rank: 6 }))
        );
        assert!(matches!(
            TestCase::new(DType::I32, ByteOrder::Big, MemoryOrder::C, vec![2, 0]),
            Err(CaseError::Shape(ShapeError::ZeroExtent { axis: 1 }))
        ));
        assert!(matches!(
            TestCase::new(DType::F64, ByteOrder::NotApplicable, MemoryOrder::C, vec![2]),
            Err(CaseError::ByteOrder(_))
        ));
        let case = TestCase::new(DType::U8, ByteOrder::Big, MemoryOrder::F, vec![2, 3])
            .expect("valid case");
        assert_eq!(case.byte_order(), ByteOrder::NotApplicable);
        assert_eq!(case.element_count(), 6);
    }

    #[test]
    fn custom_catalogs_are_validated() {
        assert!(TestMatrix::with_shapes(vec![vec![]]).is_err());
        let matrix = TestMatrix::with_shapes(vec![vec![2, 3]]).expect("catalog");
        assert_eq!(matrix.len(), 46);
    }
}
