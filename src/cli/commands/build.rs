//! One-shot compile of every source under a directory.

use std::path::Path;
use std::process::ExitCode;

use anyhow::ensure;
use sass_to_uss::{CompilerAdapter, Settings, build_all};

/// Compile everything once. Exits non-zero if any file failed.
pub fn run(settings: &Settings, dir: &Path) -> anyhow::Result<ExitCode> {
    ensure!(dir.is_dir(), "{} is not a directory", dir.display());

    let adapter = CompilerAdapter::from_settings(settings);
    let results = build_all(dir, &adapter);

    let mut failed = 0usize;
    for result in &results {
        match result.error_detail() {
            None => println!("Compiled: {}", result.output_path.display()),
            Some(detail) => {
                failed += 1;
                eprintln!("ERROR: {detail}");
            }
        }
    }

    println!(
        "Compiled {} file(s), {failed} failed",
        results.len() - failed
    );

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
