//! Equivalence checks between library output and the reference model.

use crate::error::HarnessError;
use crate::synth::ReferenceArray;
use npc_io::{NpyArrayBytes, read_npy_bytes};
use std::fs;
use std::path::Path;

/// Compares a decoded file with the reference: descr, shape, contiguity
/// flags and every element, bitwise.
pub fn compare_decoded(reference: &ReferenceArray, decoded: &NpyArrayBytes) -> Result<(), String> {
    let header = &decoded.header;
    if header.descr != reference.descr {
        return Err(format!(
            "descr {} differs from reference {}",
            header.descr.encode(),
            reference.descr.encode()
        ));
    }
    if header.shape != reference.layout.shape {
        return Err(format!(
            "shape {:?} differs from reference {:?}",
            header.shape, reference.layout.shape
        ));
    }
    let flags = header.flags().map_err(|err| err.to_string())?;
    let expected = reference.flags();
    if flags.carray() != expected.carray() || flags.farray() != expected.farray() {
        return Err(format!(
            "flags carray={} farray={} differ from reference carray={} farray={}",
            flags.carray(),
            flags.farray(),
            expected.carray(),
            expected.farray()
        ));
    }

    // Equal flags mean equal storage order, so storage positions line up.
    let values = decoded.elements().map_err(|err| err.to_string())?;
    if let Some(position) = values
        .iter()
        .zip(&reference.values)
        .position(|(got, want)| !got.bit_eq(want))
    {
        return Err(format!(
            "element {position} in storage order is {} but reference holds {}",
            values[position], reference.values[position]
        ));
    }
    Ok(())
}

/// Loads `path` with the reference codec and compares it with `reference`.
pub fn verify_reencoded(
    case: &str,
    reference: &ReferenceArray,
    path: &Path,
) -> Result<(), HarnessError> {
    let bytes = fs::read(path).map_err(HarnessError::io(path))?;
    let decoded = read_npy_bytes(&bytes).map_err(|err| HarnessError::Equivalence {
        case: case.to_string(),
        detail: format!(
            "{} is not a readable .npy file ({}): {err}",
            path.display(),
            err.reason_code()
        ),
    })?;
    compare_decoded(reference, &decoded).map_err(|detail| HarnessError::Equivalence {
        case: case.to_string(),
        detail: format!("{}: {detail}", path.display()),
    })
}

/// Offset of the first differing byte; a strict prefix differs at its end.
#[must_use]
pub fn first_difference(lhs: &[u8], rhs: &[u8]) -> Option<usize> {
    lhs.iter()
        .zip(rhs)
        .position(|(a, b)| a != b)
        .or_else(|| (lhs.len() != rhs.len()).then(|| lhs.len().min(rhs.len())))
}

/// Raw byte comparison of two files, bypassing every decoder.
pub fn verify_byte_identical(case: &str, lhs: &Path, rhs: &Path) -> Result<(), HarnessError> {
    let left = fs::read(lhs).map_err(HarnessError::io(lhs))?;
    let right = fs::read(rhs).map_err(HarnessError::io(rhs))?;
    match first_difference(&left, &right) {
        None => Ok(()),
        Some(offset) => Err(HarnessError::Equivalence {
            case: case.to_string(),
            detail: format!(
                "{} ({} bytes) and {} ({} bytes) first differ at byte {offset}",
                lhs.display(),
                left.len(),
                rhs.display(),
                right.len()
            ),
        }),
    }
}
