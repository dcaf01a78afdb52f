//! Deterministic `.npy` fixture corpus for fuzzing the library.
//!
//! Independent of the conformance matrix: every dtype gets both explicit
//! byte orders and both layouts, content is always filled in C order, and
//! the requested byte order survives in the file name even when the file
//! itself records `|`.

use crate::error::HarnessError;
use crate::synth::{SynthesisPlan, synthesize};
use npc_dtype::{ByteOrder, DType};
use npc_io::shape_tuple_repr;
use npc_ndarray::{MemoryOrder, validate_shape};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";

const CORPUS_SHAPES: &[&[usize]] = &[
    &[1],
    &[3],
    &[1, 2],
    &[2, 2],
    &[2, 3],
    &[1, 1, 2],
    &[1, 2, 3],
    &[2, 2, 2],
    &[2, 3, 5],
    &[1, 1, 1, 2],
    &[1, 1, 2, 3],
    &[1, 2, 3, 5],
    &[2, 2, 2, 2, 2],
    &[2, 3, 5, 7],
    &[1, 1, 1, 1, 1],
];

/// Identity of one fixture file, recoverable from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureLabel {
    pub dtype: DType,
    /// As requested; single-byte files still store `|`.
    pub byte_order: ByteOrder,
    pub layout: MemoryOrder,
    pub shape: Vec<usize>,
}

impl FixtureLabel {
    /// `{code}_{order}_{layout}_{shape}.npy`, e.g. `i4_>_F_(2, 3).npy`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.npy",
            self.dtype.code(),
            self.byte_order.symbol(),
            self.layout.letter(),
            shape_tuple_repr(&self.shape)
        )
    }

    pub fn from_file_name(name: &str) -> Result<Self, HarnessError> {
        let invalid = || HarnessError::InvalidFixtureName(name.to_string());
        let stem = name.strip_suffix(".npy").ok_or_else(invalid)?;
        let mut parts = stem.splitn(4, '_');
        let (Some(code), Some(order), Some(layout), Some(shape)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let single_char = |token: &str| {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        };
        let dtype = DType::parse(code).ok_or_else(invalid)?;
        let byte_order = single_char(order)
            .and_then(ByteOrder::from_symbol)
            .ok_or_else(invalid)?;
        let layout = single_char(layout)
            .and_then(MemoryOrder::from_letter)
            .ok_or_else(invalid)?;
        let shape = shape
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(invalid)?
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| token.parse::<usize>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        validate_shape(&shape).map_err(|_| invalid())?;

        let label = Self {
            dtype,
            byte_order,
            layout,
            shape,
        };
        // Only canonical spellings are accepted.
        if label.file_name() != name {
            return Err(invalid());
        }
        Ok(label)
    }

    fn plan(&self) -> SynthesisPlan {
        SynthesisPlan {
            dtype: self.dtype,
            byte_order: self.byte_order,
            shape: self.shape.clone(),
            fill: MemoryOrder::C,
            storage: self.layout,
            self_check: false,
            label: self.file_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusCatalog {
    pub dtypes: Vec<DType>,
    pub layouts: Vec<MemoryOrder>,
    pub shapes: Vec<Vec<usize>>,
    pub byte_orders: Vec<ByteOrder>,
}

impl CorpusCatalog {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            dtypes: DType::ALL.to_vec(),
            layouts: vec![MemoryOrder::C, MemoryOrder::F],
            shapes: CORPUS_SHAPES.iter().map(|shape| shape.to_vec()).collect(),
            byte_orders: vec![ByteOrder::Little, ByteOrder::Big],
        }
    }

    /// Labels in dtype → layout → shape → byte order order.
    pub fn labels(&self) -> impl Iterator<Item = FixtureLabel> + '_ {
        self.dtypes.iter().flat_map(move |&dtype| {
            self.layouts.iter().flat_map(move |&layout| {
                self.shapes.iter().flat_map(move |shape| {
                    self.byte_orders
                        .iter()
                        .map(move |&byte_order| FixtureLabel {
                            dtype,
                            byte_order,
                            layout,
                            shape: shape.clone(),
                        })
                })
            })
        })
    }
}

impl Default for CorpusCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file_name: String,
    pub dtype: String,
    pub byte_order: String,
    pub layout: String,
    pub shape: Vec<usize>,
    pub byte_len: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusManifest {
    pub fixture_count: usize,
    pub fixtures: Vec<ManifestEntry>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

/// Encodes the fixture for `label` exactly as `numpy.save` would.
pub fn fixture_bytes(label: &FixtureLabel) -> Result<Vec<u8>, HarnessError> {
    let reference = synthesize(&label.plan())?;
    Ok(reference.to_npy_bytes()?)
}

/// Writes every fixture of `catalog` plus `manifest.json` into `out_dir`.
/// Files are overwritten; the directory is created if absent.
pub fn write_corpus(catalog: &CorpusCatalog, out_dir: &Path) -> Result<CorpusManifest, HarnessError> {
    fs::create_dir_all(out_dir).map_err(HarnessError::io(out_dir))?;

    let mut fixtures = Vec::new();
    for label in catalog.labels() {
        let bytes = fixture_bytes(&label)?;
        let file_name = label.file_name();
        let path = out_dir.join(&file_name);
        fs::write(&path, &bytes).map_err(HarnessError::io(&path))?;
        log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
        fixtures.push(ManifestEntry {
            file_name,
            dtype: label.dtype.code().to_string(),
            byte_order: label.byte_order.symbol().to_string(),
            layout: label.layout.letter().to_string(),
            shape: label.shape.clone(),
            byte_len: bytes.len(),
            sha256: sha256_hex(&bytes),
        });
    }

    let manifest = CorpusManifest {
        fixture_count: fixtures.len(),
        fixtures,
    };
    let manifest_path = out_dir.join(MANIFEST_FILE);
    let raw = serde_json::to_string_pretty(&manifest).map_err(|err| HarnessError::Io {
        path: manifest_path.clone(),
        source: err.into(),
    })?;
    fs::write(&manifest_path, raw).map_err(HarnessError::io(&manifest_path))?;
    log::info!(
        "wrote {} fixtures to {}",
        manifest.fixture_count,
        out_dir.display()
    );
    Ok(manifest)
}
