use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use massprint::analysis::{self, PlotMode};
use massprint::config::AnalysisConfig;

/// Explore mass-spectrum signatures of pure compound samples.
#[derive(Debug, Parser)]
#[command(name = "massprint", version, about)]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root of the original dataset.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output directory for rendered plots.
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Decimal digits kept on mass values.
    #[arg(long, global = true)]
    digits: Option<u32>,

    #[arg(long, global = true)]
    mass_min: Option<f64>,

    #[arg(long, global = true)]
    mass_max: Option<f64>,

    /// Maximum number of samples drawn per class plot.
    #[arg(long, global = true)]
    max_lines: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check label/submission columns and summarise the feature archive.
    Inspect,
    /// Render one plot per compound class.
    Plot {
        /// Plot raw ion events sorted by mass instead of signatures.
        #[arg(long)]
        raw: bool,

        /// Leave zero-signal samples out instead of failing.
        #[arg(long)]
        skip_zero_signal: bool,
    },
}

impl Cli {
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut cfg = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = dir.clone();
        }
        if let Some(dir) = &self.out_dir {
            cfg.out_dir = dir.clone();
        }
        if let Some(digits) = self.digits {
            cfg.digits = digits;
        }
        if let Some(min) = self.mass_min {
            cfg.mass_min = min;
        }
        if let Some(max) = self.mass_max {
            cfg.mass_max = max;
        }
        if let Some(n) = self.max_lines {
            cfg.max_lines = n;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cfg = cli.resolve_config()?;

    match cli.command {
        Command::Inspect => {
            let report = analysis::inspect(&cfg)?;
            println!("Submission columns: {:?}", report.submission_header);
            println!("Label columns:      {:?}", report.label_header);
            println!(
                "Submission/labels are ordered in the same way: {}",
                report.alignment.ordered_match
            );
            println!(
                "{} archive entries, {} feature tables",
                report.archive_entries, report.archive_samples
            );
            println!(
                "{} labelled samples, {} pure",
                report.labelled_rows, report.pure_rows
            );
            for (class, n) in &report.pure_per_class {
                println!("  {class:<16} {n}");
            }
        }
        Command::Plot {
            raw,
            skip_zero_signal,
        } => {
            cfg.skip_zero_signal |= skip_zero_signal;
            let mode = if raw { PlotMode::Raw } else { PlotMode::Signature };
            let summary = analysis::run_plots(&cfg, mode)?;
            info!(
                "{} plots written, {} classes skipped, {} samples skipped",
                summary.plots.len(),
                summary.skipped_classes.len(),
                summary.skipped_samples.len()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "digits": 1, "max_lines": 4 }"#).unwrap();

        let cli = Cli::parse_from([
            "massprint",
            "--config",
            path.to_str().unwrap(),
            "plot",
            "--max-lines",
            "7",
            "--raw",
        ]);
        let cfg = cli.resolve_config().unwrap();
        assert_eq!(cfg.digits, 1);
        assert_eq!(cfg.max_lines, 7);
        assert!(matches!(cli.command, Command::Plot { raw: true, skip_zero_signal: false }));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
