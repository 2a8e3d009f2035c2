//! `cargo xtask decode`: run the HardFault diagnosis offline.
//!
//! Register values come from a JSON dump (as written by a debugger script or
//! copied from an RTT log), from individual `--sfsr/--cfsr-s/...` arguments,
//! or from every `*.json` dump under a directory. Output is the same event
//! stream the firmware sends over defmt, coloured by severity.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use fault_core::config::AHB_LAYER_COUNT;
use fault_core::{
    DiagnosticEvent, Diagnosis, FaultDispatcher, LogSink, RegisterSnapshot, ReportEntry, Severity,
};
use walkdir::WalkDir;

/// Arguments of `cargo xtask decode`.
#[derive(Args, Debug, Default)]
pub struct DecodeArgs {
    /// JSON register dump; registers not listed read as zero
    #[arg(long, conflicts_with = "dir")]
    pub dump: Option<PathBuf>,
    /// Decode every *.json dump under this directory
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// SAU_SFSR
    #[arg(long, value_parser = parse_u32)]
    pub sfsr: Option<u32>,
    /// SAU_SFAR
    #[arg(long, value_parser = parse_u32)]
    pub sfar: Option<u32>,
    /// Secure SCB_CFSR
    #[arg(long = "cfsr-s", value_parser = parse_u32)]
    pub cfsr_s: Option<u32>,
    /// Secure SCB_MMFAR
    #[arg(long = "mmfar-s", value_parser = parse_u32)]
    pub mmfar_s: Option<u32>,
    /// Secure SCB_BFAR
    #[arg(long = "bfar-s", value_parser = parse_u32)]
    pub bfar_s: Option<u32>,
    /// Non-secure SCB_CFSR
    #[arg(long = "cfsr-ns", value_parser = parse_u32)]
    pub cfsr_ns: Option<u32>,
    /// Non-secure SCB_MMFAR
    #[arg(long = "mmfar-ns", value_parser = parse_u32)]
    pub mmfar_ns: Option<u32>,
    /// Non-secure SCB_BFAR
    #[arg(long = "bfar-ns", value_parser = parse_u32)]
    pub bfar_ns: Option<u32>,
    /// AHB violation, LAYER:INFO:ADDR (repeatable); sets the layer's validity bit
    #[arg(long = "ahb", value_parser = parse_layer)]
    pub ahb: Vec<LayerArg>,

    /// Lowest severity to print
    #[arg(long, value_enum, default_value_t = MinSeverity::Debug)]
    pub min_severity: MinSeverity,
    /// Print a JSON summary instead of coloured log lines
    #[arg(long)]
    pub json: bool,
}

/// Severity filter for the printed event stream.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MinSeverity {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl From<MinSeverity> for Severity {
    fn from(m: MinSeverity) -> Self {
        match m {
            MinSeverity::Trace => Severity::Trace,
            MinSeverity::Debug => Severity::Debug,
            MinSeverity::Info => Severity::Info,
            MinSeverity::Warn => Severity::Warn,
            MinSeverity::Error => Severity::Error,
        }
    }
}

/// One `--ahb LAYER:INFO:ADDR` argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerArg {
    pub layer: usize,
    pub info: u32,
    pub address: u32,
}

/// Parse `0x`-prefixed hex, `0b` binary or plain decimal.
pub fn parse_u32(s: &str) -> Result<u32, String> {
    let s = s.trim().replace('_', "");
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b") {
        u32::from_str_radix(bin, 2)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid register value '{s}': {e}"))
}

/// Parse `LAYER:INFO:ADDR`.
pub fn parse_layer(s: &str) -> Result<LayerArg, String> {
    let mut parts = s.split(':');
    let (Some(layer), Some(info), Some(address), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected LAYER:INFO:ADDR, got '{s}'"));
    };
    let layer: usize = layer
        .trim()
        .parse()
        .map_err(|e| format!("invalid layer '{layer}': {e}"))?;
    if layer >= AHB_LAYER_COUNT {
        return Err(format!(
            "layer {layer} out of range (0..{AHB_LAYER_COUNT})"
        ));
    }
    Ok(LayerArg {
        layer,
        info: parse_u32(info)?,
        address: parse_u32(address)?,
    })
}

/// Read a JSON register dump.
pub fn load_dump(path: &Path) -> Result<RegisterSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dump {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid register dump {}", path.display()))
}

/// Build a snapshot from an optional dump plus per-register overrides.
pub fn snapshot_from_args(args: &DecodeArgs) -> Result<RegisterSnapshot> {
    let mut snap = match &args.dump {
        Some(path) => load_dump(path)?,
        None => RegisterSnapshot::default(),
    };

    let overrides = [
        (args.sfsr, &mut snap.sau.sfsr),
        (args.sfar, &mut snap.sau.sfar),
        (args.cfsr_s, &mut snap.secure.cfsr),
        (args.mmfar_s, &mut snap.secure.mmfar),
        (args.bfar_s, &mut snap.secure.bfar),
        (args.cfsr_ns, &mut snap.non_secure.cfsr),
        (args.mmfar_ns, &mut snap.non_secure.mmfar),
        (args.bfar_ns, &mut snap.non_secure.bfar),
    ];
    for (value, slot) in overrides {
        if let Some(v) = value {
            *slot = v;
        }
    }

    for layer in &args.ahb {
        snap.ahb = snap.ahb.with_layer(layer.layer, layer.info, layer.address);
    }
    Ok(snap)
}

/// Every `*.json` file under `dir`, sorted by path.
pub fn find_dumps(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dumps = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let is_json = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            dumps.push(entry.into_path());
        }
    }
    Ok(dumps)
}

/// [`LogSink`] that prints to the terminal, coloured by severity.
pub struct ColoredSink {
    min: Severity,
}

impl ColoredSink {
    pub fn new(min: Severity) -> Self {
        Self { min }
    }
}

impl LogSink for ColoredSink {
    fn log(&mut self, severity: Severity, event: &DiagnosticEvent<'_>) {
        if severity < self.min {
            return;
        }
        let label = format!("{:<5}", severity.label());
        let label = match severity {
            Severity::Trace => label.dimmed(),
            Severity::Debug => label.cyan(),
            Severity::Info => label.green(),
            Severity::Warn => label.yellow().bold(),
            Severity::Error => label.red().bold(),
        };
        let text = event.to_string();
        let text = match event {
            DiagnosticEvent::Section(_) => text.bold(),
            _ => text.normal(),
        };
        println!("  {label} {text}");
    }
}

/// JSON view of a diagnosis, for scripts.
#[allow(clippy::use_debug)]
pub fn summary_json(name: &str, diagnosis: &Diagnosis) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = diagnosis
        .report
        .iter()
        .map(|entry| match entry {
            ReportEntry::Flag(flag) => serde_json::json!({
                "source": flag.source.to_string(),
                "kind": format!("{:?}", flag.kind),
                "description": flag.kind.description(),
                "detail": flag.detail,
            }),
            ReportEntry::Ahb(rec) => serde_json::json!({
                "source": "AHB_SECURE_CTRL",
                "layer": rec.layer,
                "address": rec.address,
                "master_number": rec.master_number,
                "master_security_level": rec.master_security_level.bits(),
                "antipolarity_consistent": rec.antipolarity_consistent(),
                "access": rec.access.label(),
            }),
        })
        .collect();
    serde_json::json!({
        "dump": name,
        "entries": entries,
        "recoverable": {
            "secure": diagnosis.recoverability.secure,
            "non_secure": diagnosis.recoverability.non_secure,
        },
        "dropped": diagnosis.dropped,
    })
}

fn decode_one(name: &str, mut snap: RegisterSnapshot, args: &DecodeArgs) -> Result<()> {
    if args.json {
        let diagnosis = fault_core::diagnose(&snap);
        let out = serde_json::to_string_pretty(&summary_json(name, &diagnosis))
            .context("Failed to serialise summary")?;
        println!("{out}");
        return Ok(());
    }

    println!("{}", format!("🔎 {name}").cyan().bold());
    if snap.is_quiet() {
        println!("   {}", "All fault status registers are zero".dimmed());
    }

    let halted =
        FaultDispatcher::new(ColoredSink::new(args.min_severity.into())).dispatch(&mut snap);
    let diagnosis = halted.diagnosis();

    let count = format!("{} report entries", diagnosis.report.len());
    if diagnosis.report.is_empty() {
        println!("   {}", count.green());
    } else {
        println!("   {}", count.red());
    }
    if diagnosis.recoverability.any() {
        println!(
            "   {}",
            format!(
                "MemManage address valid (S: {}, NS: {}): platform may choose to recover",
                diagnosis.recoverability.secure, diagnosis.recoverability.non_secure
            )
            .yellow()
        );
    }
    println!();
    Ok(())
}

pub fn run(args: &DecodeArgs) -> Result<()> {
    println!();

    if let Some(dir) = &args.dir {
        let dumps = find_dumps(dir)?;
        if dumps.is_empty() {
            anyhow::bail!("No *.json dumps under {}", dir.display());
        }
        for path in dumps {
            let snap = load_dump(&path)?;
            decode_one(&path.display().to_string(), snap, args)?;
        }
        return Ok(());
    }

    let snap = snapshot_from_args(args)?;
    let name = args
        .dump
        .as_ref()
        .map_or_else(|| "command line".to_string(), |p| p.display().to_string());
    decode_one(&name, snap, args)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use fault_core::{FaultSource, SecurityDomain, ViolationKind};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parse_u32_accepts_common_radixes() {
        assert_eq!(parse_u32("0x2000_1000").unwrap(), 0x2000_1000);
        assert_eq!(parse_u32("0X80").unwrap(), 0x80);
        assert_eq!(parse_u32("0b1000_0000").unwrap(), 0x80);
        assert_eq!(parse_u32("128").unwrap(), 128);
        assert!(parse_u32("0xZZ").is_err());
        assert!(parse_u32("0x1_0000_0000").is_err());
    }

    #[test]
    fn parse_layer_checks_shape_and_range() {
        assert_eq!(
            parse_layer("3:0x502:0x40000010").unwrap(),
            LayerArg {
                layer: 3,
                info: 0x502,
                address: 0x4000_0010
            }
        );
        assert!(parse_layer("3:0x502").is_err());
        assert!(parse_layer("3:1:2:4").is_err());
        assert!(parse_layer("19:0:0").is_err());
    }

    #[test]
    fn arguments_override_dump_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fault.json");
        fs::write(&path, r#"{ "secure": { "cfsr": 2, "mmfar": 16 } }"#).unwrap();

        let args = DecodeArgs {
            dump: Some(path),
            cfsr_s: Some(0x80),
            ahb: vec![LayerArg {
                layer: 1,
                info: 2,
                address: 0x100,
            }],
            ..DecodeArgs::default()
        };
        let snap = snapshot_from_args(&args).unwrap();
        assert_eq!(snap.secure.cfsr, 0x80);
        assert_eq!(snap.secure.mmfar, 16);
        assert_eq!(snap.ahb.valid, 0b10);
    }

    #[test]
    fn find_dumps_only_picks_json() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("board-a");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join("b.json"), "{}").unwrap();
        fs::write(nested.join("a.JSON"), "{}").unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let dumps = find_dumps(tmp.path()).unwrap();
        assert_eq!(dumps.len(), 2);
    }

    #[test]
    fn bad_dump_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_dump(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn summary_lists_entries_in_order() {
        let mut snap = RegisterSnapshot::default();
        snap.secure.cfsr = 0x80;
        snap.secure.mmfar = 0x2000_1000;
        snap.ahb = snap.ahb.with_layer(0, 2, 0x3000_0000);

        let diagnosis = fault_core::diagnose(&snap);
        let first = diagnosis.report.flags().next().unwrap();
        assert_eq!(first.kind, ViolationKind::MemManageFaultAddress);
        assert_eq!(first.source, FaultSource::Cfsr(SecurityDomain::Secure));

        let json = summary_json("t", &diagnosis);
        assert_eq!(json["entries"].as_array().unwrap().len(), 2);
        assert_eq!(json["entries"][0]["detail"], 0x2000_1000);
        assert_eq!(json["entries"][1]["access"], "read data access");
        assert_eq!(json["recoverable"]["secure"], true);
    }
}
