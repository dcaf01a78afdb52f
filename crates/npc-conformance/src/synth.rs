//! Reference array synthesis.
//!
//! The content of every reference array is the sequence `0..count`
//! reshaped under a fill order, stored under a storage order and cast to
//! the target dtype with NumPy's wrapping semantics.

use crate::matrix::TestCase;
use npc_dtype::{ByteOrder, DType, Scalar};
use npc_io::{IOError, NpyDescr, NpyHeader, encode_array};
use npc_ndarray::{
    ContiguityFlags, IndexCursor, MemoryOrder, NdLayout, ShapeError, flatten_index,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error(
        "case {case}: stored layout shows carray={carray} farray={farray}, expected {expected} order"
    )]
    LayoutSelfCheck {
        case: String,
        carray: bool,
        farray: bool,
        expected: &'static str,
    },
    #[error("case {case}: {source}")]
    Shape {
        case: String,
        #[source]
        source: ShapeError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisPlan {
    pub dtype: DType,
    pub byte_order: ByteOrder,
    pub shape: Vec<usize>,
    /// Order in which `0..count` is laid onto the shape.
    pub fill: MemoryOrder,
    /// Order in which elements are stored.
    pub storage: MemoryOrder,
    /// Require the stored flags to match `storage` exactly.
    pub self_check: bool,
    pub label: String,
}

impl SynthesisPlan {
    /// Conformance plan: fill and storage both follow the case layout.
    #[must_use]
    pub fn for_case(case: &TestCase) -> Self {
        Self {
            dtype: case.dtype(),
            byte_order: case.byte_order(),
            shape: case.shape().to_vec(),
            fill: case.layout(),
            storage: case.layout(),
            self_check: true,
            label: case.to_string(),
        }
    }
}

/// Stored reference content plus the metadata needed to encode it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceArray {
    pub descr: NpyDescr,
    pub layout: NdLayout,
    pub storage: MemoryOrder,
    /// Elements in storage order.
    pub values: Vec<Scalar>,
}

impl ReferenceArray {
    #[must_use]
    pub fn flags(&self) -> ContiguityFlags {
        self.layout.flags()
    }

    /// The header `numpy.save` would write for this array.
    #[must_use]
    pub fn header(&self) -> NpyHeader {
        NpyHeader::for_layout(self.descr, &self.layout)
    }

    pub fn to_npy_bytes(&self) -> Result<Vec<u8>, IOError> {
        encode_array(&self.header(), &self.values)
    }

    /// Value at a logical multi-index.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<&Scalar> {
        let offset = self.layout.element_offset(index).ok()?;
        self.values.get(offset)
    }
}

pub fn synthesize(plan: &SynthesisPlan) -> Result<ReferenceArray, SynthesisError> {
    let shape_error = |source| SynthesisError::Shape {
        case: plan.label.clone(),
        source,
    };
    // NumPy reads `|` on a multi-byte dtype as native order: dtype('|i4') == dtype('=i4').
    let byte_order = plan
        .byte_order
        .normalize_for(plan.dtype)
        .unwrap_or(ByteOrder::native());
    let descr = NpyDescr {
        dtype: plan.dtype,
        byte_order,
    };
    let layout = NdLayout::contiguous(plan.shape.clone(), plan.dtype.item_size(), plan.storage)
        .map_err(shape_error)?;
    let count = layout.nbytes().map_err(shape_error)? / plan.dtype.item_size();

    let flags = layout.flags();
    if plan.self_check && !flags.matches_order(plan.storage) {
        return Err(SynthesisError::LayoutSelfCheck {
            case: plan.label.clone(),
            carray: flags.carray(),
            farray: flags.farray(),
            expected: plan.storage.name(),
        });
    }

    let mut values = Vec::with_capacity(count);
    for index in IndexCursor::new(&plan.shape, plan.storage) {
        let sequential = flatten_index(&plan.shape, plan.fill, &index);
        values.push(plan.dtype.cast_index(sequential as u64));
    }

    Ok(ReferenceArray {
        descr,
        layout,
        storage: plan.storage,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::{SynthesisError, SynthesisPlan, synthesize};
    use crate::matrix::TestCase;
    use npc_dtype::{ByteOrder, DType, Scalar};
    use npc_io::read_npy_bytes;
    use npc_ndarray::MemoryOrder;
    use proptest::prelude::*;

    fn case(dtype: DType, order: ByteOrder, layout: MemoryOrder, shape: &[usize]) -> TestCase {
        TestCase::new(dtype, order, layout, shape.to_vec()).expect("case")
    }

    #[test]
    fn c_order_big_endian_int32_scenario() {
        let reference = synthesize(&SynthesisPlan::for_case(&case(
            DType::I32,
            ByteOrder::Big,
            MemoryOrder::C,
            &[2, 3],
        )))
        .expect("synthesize");
        assert_eq!(
            reference.values,
            (0..6).map(Scalar::I32).collect::<Vec<_>>()
        );
        assert_eq!(reference.get(&[1, 0]), Some(&Scalar::I32(3)));

        let bytes = reference.to_npy_bytes().expect("encode");
        let decoded = read_npy_bytes(&bytes).expect("decode");
        assert_eq!(decoded.header.descr.encode(), ">i4");
        assert!(!decoded.header.fortran_order);
        assert_eq!(&decoded.payload[20..], &[0, 0, 0, 5]);
    }

    #[test]
    fn fortran_layout_stores_column_major_with_fortran_fill() {
        let reference = synthesize(&SynthesisPlan::for_case(&case(
            DType::U16,
            ByteOrder::Little,
            MemoryOrder::F,
            &[2, 3],
        )))
        .expect("synthesize");
        // Fill and storage agree, so storage order reads 0..count.
        assert_eq!(
            reference.values,
            (0..6).map(Scalar::U16).collect::<Vec<_>>()
        );
        // Logical (0, 1) is the third stored element.
        assert_eq!(reference.get(&[0, 1]), Some(&Scalar::U16(2)));
        assert!(reference.flags().farray());
        assert!(reference.header().fortran_order);
    }

    #[test]
    fn c_fill_with_f_storage_transposes_storage_sequence() {
        let plan = SynthesisPlan {
            dtype: DType::I8,
            byte_order: ByteOrder::Little,
            shape: vec![2, 3],
            fill: MemoryOrder::C,
            storage: MemoryOrder::F,
            self_check: false,
            label: "corpus".to_string(),
        };
        let reference = synthesize(&plan).expect("synthesize");
        assert_eq!(
            reference.values,
            [0, 3, 1, 4, 2, 5].map(Scalar::I8).to_vec()
        );
        assert_eq!(reference.descr.byte_order, ByteOrder::NotApplicable);
    }

    #[test]
    fn unspecified_order_on_multi_byte_dtype_means_native() {
        let plan = SynthesisPlan {
            dtype: DType::I32,
            byte_order: ByteOrder::NotApplicable,
            shape: vec![2],
            fill: MemoryOrder::C,
            storage: MemoryOrder::C,
            self_check: true,
            label: "native".to_string(),
        };
        let reference = synthesize(&plan).expect("synthesize");
        assert_eq!(reference.descr.byte_order, ByteOrder::native());
        let decoded = read_npy_bytes(&reference.to_npy_bytes().expect("encode")).expect("decode");
        assert_eq!(decoded.header.descr.byte_order, ByteOrder::native());
    }

    #[test]
    fn values_wrap_at_type_boundaries() {
        let reference = synthesize(&SynthesisPlan::for_case(&case(
            DType::U8,
            ByteOrder::NotApplicable,
            MemoryOrder::C,
            &[300],
        )))
        .expect("synthesize");
        assert_eq!(reference.values[255], Scalar::U8(255));
        assert_eq!(reference.values[256], Scalar::U8(0));

        let bools = synthesize(&SynthesisPlan::for_case(&case(
            DType::Bool,
            ByteOrder::NotApplicable,
            MemoryOrder::C,
            &[3],
        )))
        .expect("synthesize");
        assert_eq!(
            bools.values,
            vec![Scalar::Bool(false), Scalar::Bool(true), Scalar::Bool(true)]
        );
    }

    #[test]
    fn self_check_rejects_fortran_request_on_effectively_1d_shape() {
        let err = synthesize(&SynthesisPlan::for_case(&case(
            DType::F32,
            ByteOrder::Little,
            MemoryOrder::F,
            &[1, 4],
        )))
        .expect_err("flags cannot show farray");
        assert!(matches!(
            err,
            SynthesisError::LayoutSelfCheck {
                carray: true,
                farray: false,
                ..
            }
        ));
    }

    #[test]
    fn effectively_1d_bytes_are_layout_invariant() {
        for shape in [&[5][..], &[1, 5], &[1, 1, 5, 1]] {
            let encode = |storage| {
                let plan = SynthesisPlan {
                    dtype: DType::Complex64,
                    byte_order: ByteOrder::Big,
                    shape: shape.to_vec(),
                    fill: storage,
                    storage,
                    self_check: false,
                    label: String::new(),
                };
                synthesize(&plan)
                    .expect("synthesize")
                    .to_npy_bytes()
                    .expect("encode")
            };
            assert_eq!(encode(MemoryOrder::C), encode(MemoryOrder::F));
        }
    }

    #[test]
    fn synthesis_is_reproducible() {
        let plan = SynthesisPlan::for_case(&case(
            DType::Complex128,
            ByteOrder::Big,
            MemoryOrder::F,
            &[2, 3, 5],
        ));
        let first = synthesize(&plan).expect("first");
        let second = synthesize(&plan).expect("second");
        assert_eq!(
            first.to_npy_bytes().expect("first bytes"),
            second.to_npy_bytes().expect("second bytes")
        );
    }

    fn effectively_1d_shape() -> impl Strategy<Value = Vec<usize>> {
        (1usize..=5, 0usize..5, 1usize..40).prop_map(|(rank, axis, extent)| {
            let mut shape = vec![1; rank];
            shape[axis % rank] = extent;
            shape
        })
    }

    fn any_dtype() -> impl Strategy<Value = DType> {
        prop::sample::select(DType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn effectively_1d_encoding_ignores_storage_order(
            shape in effectively_1d_shape(),
            dtype in any_dtype(),
            big_endian in any::<bool>(),
        ) {
            let byte_order = if big_endian { ByteOrder::Big } else { ByteOrder::Little };
            let encode = |storage| {
                let plan = SynthesisPlan {
                    dtype,
                    byte_order,
                    shape: shape.clone(),
                    fill: MemoryOrder::C,
                    storage,
                    self_check: false,
                    label: String::new(),
                };
                synthesize(&plan).expect("synthesize").to_npy_bytes().expect("encode")
            };
            prop_assert_eq!(encode(MemoryOrder::C), encode(MemoryOrder::F));
        }
    }
}
