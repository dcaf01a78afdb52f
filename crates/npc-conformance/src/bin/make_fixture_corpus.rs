#![forbid(unsafe_code)]

use npc_conformance::{CorpusCatalog, HarnessConfig, init_logging, write_corpus};
use std::path::PathBuf;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("make_fixture_corpus failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut out_dir = HarnessConfig::default_paths().corpus_dir;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--out requires a value".to_string())?;
                out_dir = PathBuf::from(value);
            }
            "--help" | "-h" => {
                println!("Usage: make_fixture_corpus [--out <dir>]");
                return Ok(());
            }
            unknown => return Err(format!("unknown argument: {unknown}")),
        }
    }

    let manifest =
        write_corpus(&CorpusCatalog::standard(), &out_dir).map_err(|err| err.to_string())?;
    println!(
        "wrote {} fixtures and manifest to {}",
        manifest.fixture_count,
        out_dir.display()
    );
    Ok(())
}
