//! Command-line surface (`clap` derive), a flat flag set for this tool's
//! single operation.

use crate::constants::{LINKER_FIX, LINKER_FLX};
use crate::error::{Result, SffError};
use clap::Parser;
use std::path::PathBuf;

/// Converts SFF pyrosequencing reads into an assembler fragment-message
/// stream.
#[derive(Debug, Parser)]
#[command(name = "sff2frg", version, about)]
struct Cli {
    /// Library UID; the single library every emitted read belongs to.
    #[arg(long = "libraryname")]
    library_name: String,

    /// Output `.frg` path. A companion `<output>.tmpStore` directory is
    /// created alongside it for the duration of the run.
    #[arg(long = "output")]
    output: PathBuf,

    /// Mean and standard deviation of the library's insert size. Required
    /// together with `-linker`.
    #[arg(long = "insertsize", num_args = 2, value_names = ["MEAN", "STDDEV"])]
    insert_size: Option<Vec<f64>>,

    /// Linker to search for: `flx`, `fix`/`titanium`, or a literal sequence.
    #[arg(long = "linker")]
    linker: Option<String>,

    /// Append a log of every dropped/deleted/trimmed read to this file.
    #[arg(long = "log")]
    log: Option<PathBuf>,

    /// One or more `.sff` (optionally `.sff.gz`/`.sff.bz2`) input files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub library_name: String,
    pub output: PathBuf,
    pub insert_size: Option<(f64, f64)>,
    pub linker: Option<String>,
    pub log: Option<PathBuf>,
    pub inputs: Vec<PathBuf>,
}

/// Resolve a `-linker` argument to its literal probe sequence: the two named
/// presets, or the argument itself treated as a literal base sequence.
fn resolve_linker(arg: &str) -> String {
    match arg.to_ascii_lowercase().as_str() {
        "flx" => LINKER_FLX.to_string(),
        "fix" | "titanium" => LINKER_FIX.to_string(),
        _ => arg.to_string(),
    }
}

impl Config {
    /// Parse `argv` (including argv[0]) into a validated `Config`.
    pub fn parse_args<I, T>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(argv).map_err(|e| SffError::Config(e.to_string()))?;

        let insert_size = match &cli.insert_size {
            Some(v) if v.len() == 2 => Some((v[0], v[1])),
            Some(_) => unreachable!("clap enforces num_args = 2"),
            None => None,
        };

        if cli.linker.is_some() && insert_size.is_none() {
            return Err(SffError::Config(
                "-linker requires -insertsize <mean> <stddev>".to_string(),
            ));
        }

        Ok(Config {
            library_name: cli.library_name,
            output: cli.output,
            insert_size,
            linker: cli.linker.map(|s| resolve_linker(&s)),
            log: cli.log,
            inputs: cli.inputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cfg = Config::parse_args([
            "sff2frg",
            "--libraryname",
            "libA",
            "--output",
            "out.frg",
            "in.sff",
        ])
        .unwrap();
        assert_eq!(cfg.library_name, "libA");
        assert_eq!(cfg.inputs, vec![PathBuf::from("in.sff")]);
        assert!(cfg.linker.is_none());
    }

    #[test]
    fn linker_without_insertsize_is_rejected() {
        let err = Config::parse_args([
            "sff2frg",
            "--libraryname",
            "libA",
            "--output",
            "out.frg",
            "--linker",
            "flx",
            "in.sff",
        ])
        .unwrap_err();
        assert!(matches!(err, SffError::Config(_)));
    }

    #[test]
    fn linker_flx_resolves_to_probe_sequence() {
        let cfg = Config::parse_args([
            "sff2frg",
            "--libraryname",
            "libA",
            "--output",
            "out.frg",
            "--insertsize",
            "2000",
            "200",
            "--linker",
            "flx",
            "in.sff",
        ])
        .unwrap();
        assert_eq!(cfg.linker.as_deref(), Some(LINKER_FLX));
        assert_eq!(cfg.insert_size, Some((2000.0, 200.0)));
    }

    #[test]
    fn multiple_inputs_are_collected_in_order() {
        let cfg = Config::parse_args([
            "sff2frg",
            "--libraryname",
            "libA",
            "--output",
            "out.frg",
            "a.sff",
            "b.sff",
        ])
        .unwrap();
        assert_eq!(cfg.inputs, vec![PathBuf::from("a.sff"), PathBuf::from("b.sff")]);
    }
}
