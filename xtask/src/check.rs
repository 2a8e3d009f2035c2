use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Secure-world target of the RT6xx Cortex-M33.
pub const SECURE_TARGET: &str = "thumbv8m.main-none-eabihf";

/// One `cargo` invocation of the check run.
struct Step {
    label: &'static str,
    args: &'static [&'static str],
    /// Failure aborts the run; otherwise it is only reported.
    required: bool,
}

const STEPS: &[Step] = &[
    Step {
        label: "secure image (firmware, hardware feature)",
        args: &[
            "check",
            "-p",
            "firmware",
            "--target",
            SECURE_TARGET,
            "--features",
            "hardware",
        ],
        required: true,
    },
    Step {
        label: "fault-core (no_std)",
        args: &[
            "check",
            "-p",
            "fault-core",
            "--target",
            SECURE_TARGET,
            "--no-default-features",
            "--features",
            "defmt",
        ],
        required: true,
    },
    Step {
        label: "fault-core (host, all features)",
        args: &["check", "-p", "fault-core", "--all-features"],
        required: true,
    },
    Step {
        label: "clippy lints",
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        required: false,
    },
    Step {
        label: "code formatting",
        args: &["fmt", "--all", "--check"],
        required: false,
    },
];

fn run_step(step: &Step) -> Result<()> {
    println!("{}", format!("  Checking {}...", step.label).cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(step.args)
        .output()
        .with_context(|| format!("Failed to run cargo {}", step.args.join(" ")))?;

    if output.status.success() {
        println!(
            "{}",
            format!("  ✓ {} passed in {:.2}s", step.label, start.elapsed().as_secs_f64()).green()
        );
    } else if step.required {
        eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("{} failed", step.label);
    } else {
        eprintln!("{}", format!("  ⚠ {} reported problems", step.label).yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
    }
    println!();
    Ok(())
}

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking workspace...".cyan().bold());
    println!();

    let total_start = Instant::now();
    for step in STEPS {
        run_step(step)?;
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
