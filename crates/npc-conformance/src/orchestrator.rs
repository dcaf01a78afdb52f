use crate::error::HarnessError;
use crate::harness::{HarnessVariant, ScratchPaths, generate};
use crate::matrix::{TestCase, TestMatrix};
use crate::oracle::{verify_byte_identical, verify_reencoded};
use crate::synth::{SynthesisPlan, synthesize};
use crate::toolchain::Toolchain;
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MatrixSummary {
    pub cases_run: usize,
    pub programs_built: usize,
}

/// Walks cases one at a time through the scratch directory. The first
/// failure ends the run.
#[derive(Debug)]
pub struct Orchestrator<T> {
    paths: ScratchPaths,
    toolchain: T,
}

impl<T: Toolchain> Orchestrator<T> {
    pub fn new(paths: ScratchPaths, toolchain: T) -> Self {
        Self { paths, toolchain }
    }

    #[must_use]
    pub fn paths(&self) -> &ScratchPaths {
        &self.paths
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    pub fn run_matrix(&mut self, matrix: &TestMatrix) -> Result<MatrixSummary, HarnessError> {
        let mut summary = MatrixSummary::default();
        for case in matrix.cases() {
            summary.programs_built += self.run_case(&case)?;
            summary.cases_run += 1;
        }
        info!(
            "{} cases passed, {} programs built",
            summary.cases_run, summary.programs_built
        );
        Ok(summary)
    }

    /// Runs all three programs for `case`; returns how many were built.
    pub fn run_case(&mut self, case: &TestCase) -> Result<usize, HarnessError> {
        let label = case.to_string();
        info!("{label}");

        self.clean_scratch()?;
        let reference = synthesize(&SynthesisPlan::for_case(case))?;
        let reference_path = self.paths.reference();
        let bytes = reference.to_npy_bytes()?;
        fs::write(&reference_path, bytes).map_err(HarnessError::io(&reference_path))?;

        self.build_and_run(case, &label, HarnessVariant::DecodeReencode)?;
        verify_reencoded(&label, &reference, &self.paths.reencoded())?;
        info!(" round trip reference -> library -> reference ok");

        self.build_and_run(case, &label, HarnessVariant::CreateFromScratch)?;
        verify_byte_identical(&label, &self.paths.reencoded(), &self.paths.from_scratch())?;
        self.build_and_run(case, &label, HarnessVariant::ReopenVerify)?;
        info!(" round trip library -> library ok");

        Ok(HarnessVariant::ALL.len())
    }

    fn clean_scratch(&self) -> Result<(), HarnessError> {
        let dir = self.paths.dir();
        fs::create_dir_all(dir).map_err(HarnessError::io(dir))?;
        for artifact in self.paths.artifacts() {
            match fs::remove_file(&artifact) {
                Ok(()) => debug!("removed stale {}", artifact.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(HarnessError::io(&artifact)(err)),
            }
        }
        Ok(())
    }

    fn build_and_run(
        &mut self,
        case: &TestCase,
        label: &str,
        variant: HarnessVariant,
    ) -> Result<(), HarnessError> {
        let program = generate(case, variant, &self.paths);
        let source = self.paths.source(variant);
        let binary = self.paths.binary(variant);
        fs::write(&source, &program.source).map_err(HarnessError::io(&source))?;

        let compiled = self.toolchain.compile(&source, &binary)?;
        if !compiled.success() {
            return Err(HarnessError::Compile {
                case: label.to_string(),
                program: variant.program_name(),
                status: compiled,
            });
        }
        let executed = self.toolchain.execute(&binary)?;
        if !executed.success() {
            return Err(HarnessError::Execute {
                case: label.to_string(),
                program: variant.program_name(),
                status: executed,
            });
        }
        Ok(())
    }
}
