use crate::matrix::CaseError;
use crate::synth::SynthesisError;
use crate::toolchain::ProcessResult;
use npc_io::IOError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal outcome of a harness run. Nothing here is retried.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The reference model could not build the requested array, either
    /// because its layout self-check failed or the shape was unusable. A
    /// harness bug, not a library bug.
    #[error("reference synthesis failed: {0}")]
    SelfCheck(#[from] SynthesisError),
    #[error("compilation of {program} failed for case {case}: {status}")]
    Compile {
        case: String,
        program: String,
        status: ProcessResult,
    },
    #[error("execution of {program} failed for case {case}: {status}")]
    Execute {
        case: String,
        program: String,
        status: ProcessResult,
    },
    #[error("equivalence check failed for case {case}: {detail}")]
    Equivalence { case: String, detail: String },
    #[error("invalid test case: {0}")]
    InvalidCase(#[from] CaseError),
    #[error("'{0}' is not a fixture file name")]
    InvalidFixtureName(String),
    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reference codec rejected data ({code}): {0}", code = .0.reason_code())]
    Codec(#[from] IOError),
    #[error("{0}")]
    Usage(String),
}

impl HarnessError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
