#![forbid(unsafe_code)]

use npc_conformance::{
    HarnessConfig, HarnessError, TestMatrix, init_logging, parse_speed_args, run_conformance,
};

fn main() {
    init_logging();
    match run() {
        Ok(()) => {}
        Err(HarnessError::Usage(usage)) => {
            eprintln!("{usage}");
            std::process::exit(1);
        }
        Err(err) => {
            log::error!("{err}");
            eprintln!("generate_and_run failed: {err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<(), HarnessError> {
    let mut args = std::env::args();
    let program = args
        .next()
        .unwrap_or_else(|| "generate_and_run".to_string());
    let rest: Vec<String> = args.collect();
    let speed = parse_speed_args(&program, &rest)?;

    let config = HarnessConfig::from_env();
    let matrix = TestMatrix::new(speed);
    log::info!(
        "{} cases, scratch directory {}",
        matrix.len(),
        config.scratch_dir.display()
    );
    let summary = run_conformance(&config, &matrix)?;
    println!(
        "conformance: cases={} programs={}",
        summary.cases_run, summary.programs_built
    );
    Ok(())
}
