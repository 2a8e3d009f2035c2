use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use crate::check::SECURE_TARGET;

/// One `cargo doc` run and the crate index it must produce.
struct DocBuild {
    label: &'static str,
    /// `None` builds for the host.
    target: Option<&'static str>,
    args: &'static [&'static str],
    index_of: &'static str,
}

/// Host docs cover the decoding API; the secure-target build is the only one
/// that documents the register bank and the HardFault entry points.
const BUILDS: &[DocBuild] = &[
    DocBuild {
        label: "fault-core (host)",
        target: None,
        args: &["-p", "fault-core", "--features", "fault-core/serde,fault-core/std"],
        index_of: "fault_core",
    },
    DocBuild {
        label: "secure image (firmware, hardware feature)",
        target: Some(SECURE_TARGET),
        args: &["-p", "firmware", "--features", "hardware"],
        index_of: "firmware",
    },
];

fn target_dir() -> PathBuf {
    std::env::var_os("CARGO_TARGET_DIR").map_or_else(|| PathBuf::from("target"), PathBuf::from)
}

/// Where rustdoc writes `krate`'s index for `target`.
fn doc_index(target_dir: &Path, target: Option<&str>, krate: &str) -> PathBuf {
    let mut path = target_dir.to_path_buf();
    if let Some(triple) = target {
        path.push(triple);
    }
    path.join("doc").join(krate).join("index.html")
}

fn build(doc: &DocBuild, open: bool) -> Result<PathBuf> {
    println!("{}", format!("  Documenting {}...", doc.label).cyan());

    let mut cmd = Command::new("cargo");
    cmd.args(["doc", "--no-deps"]).args(doc.args);
    if let Some(triple) = doc.target {
        cmd.args(["--target", triple]);
    }
    if open {
        cmd.arg("--open");
    }

    let output = cmd
        .output()
        .with_context(|| format!("Failed to document {}", doc.label))?;
    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {} failed", doc.label).red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Documentation build failed: {}", doc.label);
    }

    let index = doc_index(&target_dir(), doc.target, doc.index_of);
    if !index.is_file() {
        anyhow::bail!("{} built but {} is missing", doc.label, index.display());
    }
    Ok(index)
}

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    println!();

    let start = Instant::now();

    let mut indexes = Vec::with_capacity(BUILDS.len());
    for (i, doc) in BUILDS.iter().enumerate() {
        // Only the host docs open in the browser.
        indexes.push(build(doc, open && i == 0)?);
    }

    println!(
        "{}",
        format!(
            "✓ Documentation built in {:.2}s",
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    for index in &indexes {
        println!("   {}", index.display().to_string().dimmed());
    }
    println!();

    Ok(())
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn host_index_sits_under_doc() {
        let index = doc_index(Path::new("target"), None, "fault_core");
        assert_eq!(index, Path::new("target/doc/fault_core/index.html"));
    }

    #[test]
    fn cross_index_sits_under_the_triple() {
        let index = doc_index(Path::new("/tmp/t"), Some(SECURE_TARGET), "firmware");
        assert_eq!(
            index,
            Path::new("/tmp/t/thumbv8m.main-none-eabihf/doc/firmware/index.html")
        );
    }

    #[test]
    fn firmware_docs_build_for_the_secure_target_only() {
        let firmware: Vec<_> = BUILDS
            .iter()
            .filter(|b| b.args.contains(&"firmware"))
            .collect();
        assert_eq!(firmware.len(), 1);
        assert_eq!(firmware[0].target, Some(SECURE_TARGET));
        assert!(firmware[0].args.contains(&"hardware"));
    }

    #[test]
    fn host_build_never_enables_hardware() {
        for doc in BUILDS.iter().filter(|b| b.target.is_none()) {
            assert!(!doc.args.iter().any(|a| a.contains("hardware")));
        }
    }
}
