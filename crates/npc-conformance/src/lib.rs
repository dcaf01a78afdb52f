#![forbid(unsafe_code)]

//! Round-trip conformance harness for the `cnpy` C library.
//!
//! Each case of the dtype × byte order × layout × shape matrix is encoded
//! by the reference model, pushed through three generated C programs and
//! checked twice: the library's re-encoding must decode to the reference
//! content, and it must be byte-identical to the library's from-scratch
//! encoding.

pub mod cgen;
pub mod config;
pub mod corpus;
pub mod error;
pub mod harness;
pub mod matrix;
pub mod oracle;
pub mod orchestrator;
pub mod synth;
pub mod toolchain;

pub use config::{HarnessConfig, ToolchainConfig, init_logging};
pub use corpus::{CorpusCatalog, CorpusManifest, FixtureLabel, write_corpus};
pub use error::HarnessError;
pub use harness::{HarnessProgram, HarnessVariant, ScratchPaths};
pub use matrix::{CaseError, CatalogSpeed, TestCase, TestMatrix, parse_speed_args};
pub use orchestrator::{MatrixSummary, Orchestrator};
pub use synth::{ReferenceArray, SynthesisError, SynthesisPlan, synthesize};
pub use toolchain::{ProcessResult, SystemToolchain, Toolchain};

/// Runs `matrix` against the system compiler as configured by `config`.
pub fn run_conformance(
    config: &HarnessConfig,
    matrix: &TestMatrix,
) -> Result<MatrixSummary, HarnessError> {
    let toolchain = SystemToolchain::new(config.toolchain.clone(), &config.include_dir);
    Orchestrator::new(ScratchPaths::new(&config.scratch_dir), toolchain).run_matrix(matrix)
}
