use env_logger::Env;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_COMPILER: &str = "cc";
pub const DEFAULT_INCLUDE_DIR: &str = "../../include";
pub const DEFAULT_SCRATCH_DIR: &str = "tests";
pub const DEFAULT_CORPUS_DIR: &str = "files";
pub const DEFAULT_LOG_FILTER: &str = "info";

const WARNING_FLAGS: [&str; 5] = [
    "-W",
    "-Wall",
    "-Werror",
    "-Wfatal-errors",
    "-Wno-unused-function",
];
const SANITIZER_FLAG: &str = "-fsanitize=address,undefined";

/// How harness programs are compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    pub compiler: String,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    /// Address/undefined-behaviour sanitizers; unavailable on OpenBSD.
    pub sanitize: bool,
}

impl ToolchainConfig {
    /// Reads `CC`, `CFLAGS` and `LDFLAGS` through `lookup`.
    ///
    /// An unset or blank `CC` falls back to `cc`. Flag variables are split
    /// on whitespace and passed through verbatim.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let compiler = non_blank(lookup("CC")).unwrap_or_else(|| DEFAULT_COMPILER.to_string());
        Self {
            compiler,
            cflags: split_words(lookup("CFLAGS")),
            ldflags: split_words(lookup("LDFLAGS")),
            sanitize: !cfg!(target_os = "openbsd"),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Arguments after the compiler name for building `source` into `binary`.
    #[must_use]
    pub fn compile_args(&self, include_dir: &Path, source: &Path, binary: &Path) -> Vec<String> {
        let mut args: Vec<String> = WARNING_FLAGS.iter().map(ToString::to_string).collect();
        args.push(format!("-I{}", include_dir.display()));
        if self.sanitize {
            args.push(SANITIZER_FLAG.to_string());
        }
        args.extend(self.cflags.iter().cloned());
        args.push(source.display().to_string());
        args.push("-o".to_string());
        args.push(binary.display().to_string());
        args.push("-lm".to_string());
        args.extend(self.ldflags.iter().cloned());
        args
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Trimmed value, or `None` when unset or blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn split_words(value: Option<String>) -> Vec<String> {
    value
        .map(|value| value.split_whitespace().map(ToString::to_string).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Reused per-case working directory; wiped at the start of every case.
    pub scratch_dir: PathBuf,
    /// Directory holding `cnpy.h`.
    pub include_dir: PathBuf,
    pub corpus_dir: PathBuf,
    pub toolchain: ToolchainConfig,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            include_dir: PathBuf::from(DEFAULT_INCLUDE_DIR),
            corpus_dir: PathBuf::from(DEFAULT_CORPUS_DIR),
            toolchain: ToolchainConfig::default(),
        }
    }

    /// Blank path variables count as unset, so binaries are never looked
    /// up through `PATH`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default_paths();
        Self {
            scratch_dir: non_blank(lookup("NPC_SCRATCH_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            include_dir: non_blank(lookup("NPC_INCLUDE_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.include_dir),
            corpus_dir: defaults.corpus_dir,
            toolchain: ToolchainConfig::from_lookup(lookup),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

/// Installs the `env_logger` backend; `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let env = Env::default().default_filter_or(DEFAULT_LOG_FILTER);
    let mut builder = env_logger::Builder::from_env(env);
    builder.format(|buf, record| writeln!(buf, "[{:<5}] {}", record.level(), record.args()));
    // A second initialisation (tests, repeated calls) keeps the first logger.
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::{HarnessConfig, ToolchainConfig};
    use crate::harness::{HarnessVariant, ScratchPaths};
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_cc_without_extra_flags() {
        let config = ToolchainConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.compiler, "cc");
        assert!(config.cflags.is_empty());
        assert!(config.ldflags.is_empty());

        let blank = ToolchainConfig::from_lookup(lookup_from(&[("CC", "  ")]));
        assert_eq!(blank.compiler, "cc");
    }

    #[test]
    fn flag_variables_split_on_whitespace() {
        let config = ToolchainConfig::from_lookup(lookup_from(&[
            ("CC", "clang"),
            ("CFLAGS", " -O2   -g "),
            ("LDFLAGS", "-L/opt/lib -lcnpy"),
        ]));
        assert_eq!(config.compiler, "clang");
        assert_eq!(config.cflags, vec!["-O2", "-g"]);
        assert_eq!(config.ldflags, vec!["-L/opt/lib", "-lcnpy"]);
    }

    #[test]
    fn compile_args_place_libraries_after_source() {
        let mut config = ToolchainConfig::from_lookup(lookup_from(&[
            ("CFLAGS", "-O1"),
            ("LDFLAGS", "-lcnpy"),
        ]));
        config.sanitize = false;
        let args = config.compile_args(
            Path::new("../../include"),
            Path::new("tests/test1.c"),
            Path::new("tests/test1"),
        );
        assert_eq!(
            args,
            vec![
                "-W",
                "-Wall",
                "-Werror",
                "-Wfatal-errors",
                "-Wno-unused-function",
                "-I../../include",
                "-O1",
                "tests/test1.c",
                "-o",
                "tests/test1",
                "-lm",
                "-lcnpy",
            ]
        );

        config.sanitize = true;
        let args = config.compile_args(Path::new("inc"), Path::new("a.c"), Path::new("a"));
        assert_eq!(args[6], "-fsanitize=address,undefined");
    }

    #[test]
    fn harness_paths_follow_overrides() {
        let config = HarnessConfig::from_lookup(lookup_from(&[
            ("NPC_SCRATCH_DIR", "/tmp/scratch"),
            ("NPC_INCLUDE_DIR", "/src/cnpy/include"),
        ]));
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/scratch"));
        assert_eq!(config.include_dir, PathBuf::from("/src/cnpy/include"));
        assert_eq!(config.corpus_dir, PathBuf::from("files"));
        assert_eq!(
            HarnessConfig::default_paths().scratch_dir,
            PathBuf::from("tests")
        );
    }

    #[test]
    fn blank_path_overrides_fall_back_to_defaults() {
        let config = HarnessConfig::from_lookup(lookup_from(&[
            ("NPC_SCRATCH_DIR", ""),
            ("NPC_INCLUDE_DIR", "   "),
        ]));
        assert_eq!(config.scratch_dir, PathBuf::from("tests"));
        assert_eq!(config.include_dir, PathBuf::from("../../include"));
        assert_eq!(
            ScratchPaths::new(&config.scratch_dir).binary(HarnessVariant::DecodeReencode),
            PathBuf::from("tests/test1")
        );
    }
}
