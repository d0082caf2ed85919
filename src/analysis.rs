use std::fs;
use std::io::{Read, Seek};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::AnalysisConfig;
use crate::data::filter::{compound_groups, pure_samples, CompoundGroup};
use crate::data::loader::{load_label_table, read_header, FeatureArchive};
use crate::data::model::ColumnAlignment;
use crate::error::SignatureError;
use crate::plot::{render_class_plot, PlotLine};
use crate::signature::signature_of;

// ---------------------------------------------------------------------------
// Dataset inspection
// ---------------------------------------------------------------------------

/// What `inspect` found about the dataset layout.
#[derive(Debug, Clone)]
pub struct InspectReport {
    pub label_header: Vec<String>,
    pub submission_header: Vec<String>,
    pub alignment: ColumnAlignment,
    pub archive_entries: usize,
    pub archive_samples: usize,
    pub labelled_rows: usize,
    pub pure_rows: usize,
    /// Pure sample count per class, in header order.
    pub pure_per_class: Vec<(String, usize)>,
}

pub fn inspect(cfg: &AnalysisConfig) -> Result<InspectReport> {
    let submission_header = read_header(&cfg.submission_path())?;
    info!("submission columns: {submission_header:?}");

    let labels = load_label_table(&cfg.labels_path())?;
    info!("label columns: {:?}", labels.header);

    let alignment = labels.column_alignment(&submission_header);
    report_alignment(&alignment);

    let archive = FeatureArchive::open(&cfg.archive_path(), &cfg.archive_prefix)?;
    let archive_samples = archive.sample_ids().len();
    info!(
        "archive: {} entries, {archive_samples} feature tables under '{}'",
        archive.len(),
        cfg.archive_prefix
    );

    let pure_rows = pure_samples(&labels).len();
    let pure_per_class: Vec<(String, usize)> = compound_groups(&labels)
        .into_iter()
        .map(|g| (g.class_name, g.sample_ids.len()))
        .collect();
    info!("{} labelled samples, {pure_rows} pure", labels.len());
    for (class, n) in &pure_per_class {
        info!("  {class}: {n} pure samples");
    }

    Ok(InspectReport {
        label_header: labels.header.clone(),
        submission_header,
        alignment,
        archive_entries: archive.len(),
        archive_samples,
        labelled_rows: labels.len(),
        pure_rows,
        pure_per_class,
    })
}

fn report_alignment(alignment: &ColumnAlignment) {
    info!(
        "submission/labels are ordered in the same way: {}",
        alignment.ordered_match
    );
    if !alignment.missing_in_submission.is_empty() {
        warn!(
            "label columns missing from submission format: {:?}",
            alignment.missing_in_submission
        );
    }
    if !alignment.missing_in_labels.is_empty() {
        warn!(
            "submission columns missing from labels: {:?}",
            alignment.missing_in_labels
        );
    }
}

// ---------------------------------------------------------------------------
// Per-class plots
// ---------------------------------------------------------------------------

/// What each class plot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotMode {
    /// Normalized mass signature on the canonical grid.
    #[default]
    Signature,
    /// Raw ion events sorted by mass, intensities as recorded.
    Raw,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Label header compared against the submission format.
    pub alignment: ColumnAlignment,
    pub plots: Vec<PathBuf>,
    /// Classes that produced no plot.
    pub skipped_classes: Vec<String>,
    /// Zero-signal samples left out of their plot.
    pub skipped_samples: Vec<String>,
}

/// Render one plot per compound class with at least one usable pure sample.
pub fn run_plots(cfg: &AnalysisConfig, mode: PlotMode) -> Result<RunSummary> {
    // Reject a bad precision or range before any sample is read.
    cfg.signature().grid().context("checking mass grid settings")?;

    let submission_header = read_header(&cfg.submission_path())?;
    let labels = load_label_table(&cfg.labels_path())?;
    let alignment = labels.column_alignment(&submission_header);
    report_alignment(&alignment);

    let groups = compound_groups(&labels);
    let mut archive = FeatureArchive::open(&cfg.archive_path(), &cfg.archive_prefix)?;

    fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating {}", cfg.out_dir.display()))?;

    let mut summary = plot_groups(&groups, &mut archive, cfg, mode)?;
    summary.alignment = alignment;
    Ok(summary)
}

fn plot_groups<R: Read + Seek>(
    groups: &[CompoundGroup],
    archive: &mut FeatureArchive<R>,
    cfg: &AnalysisConfig,
    mode: PlotMode,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut style = cfg.plot_style();
    if mode == PlotMode::Raw {
        style.line_offset = 0.0;
    }

    for group in groups {
        info!("processing group {} ({})", group.index, group.class_name);
        if group.is_empty() {
            info!("no pure samples for '{}', skipping", group.class_name);
            summary.skipped_classes.push(group.class_name.clone());
            continue;
        }

        let lines = collect_lines(group, archive, cfg, mode, &mut summary.skipped_samples)?;
        if lines.is_empty() {
            info!("no usable samples for '{}', skipping", group.class_name);
            summary.skipped_classes.push(group.class_name.clone());
            continue;
        }

        let path = cfg.out_dir.join(plot_file_name(group));
        let drawn = render_class_plot(&path, &group.class_name, &lines, &style)
            .with_context(|| format!("plotting class '{}'", group.class_name))?;
        info!("wrote {} ({drawn} lines)", path.display());
        summary.plots.push(path);
    }

    Ok(summary)
}

/// Load samples of one group until `max_lines` lines are available.
fn collect_lines<R: Read + Seek>(
    group: &CompoundGroup,
    archive: &mut FeatureArchive<R>,
    cfg: &AnalysisConfig,
    mode: PlotMode,
    skipped: &mut Vec<String>,
) -> Result<Vec<PlotLine>> {
    let signature_cfg = cfg.signature();
    let mut lines = Vec::new();

    for id in &group.sample_ids {
        if lines.len() >= cfg.max_lines {
            break;
        }
        let sample = archive.read_sample(id)?;

        let points: Vec<(f64, f64)> = match mode {
            PlotMode::Raw => sample.sorted_by_mass(),
            PlotMode::Signature => match signature_of(&sample, &signature_cfg) {
                Ok(sig) => sig.points().collect(),
                Err(SignatureError::ZeroSignal { .. }) if cfg.skip_zero_signal => {
                    warn!("sample {id} has no signal, leaving it out of '{}'", group.class_name);
                    skipped.push(id.clone());
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("building signature for class '{}'", group.class_name)
                    })
                }
            },
        };

        lines.push(PlotLine {
            sample_id: id.clone(),
            points,
        });
    }

    Ok(lines)
}

fn plot_file_name(group: &CompoundGroup) -> String {
    let name: String = group
        .class_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{:02}_{name}.png", group.index)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::loader::tests::zip_bytes;

    const HEADER: &str = "sample_id,basalt,carbonate,sulfate";

    /// Lay out a tiny dataset the way the tool expects to find it.
    fn dataset(root: &Path, submission_header: &str) -> AnalysisConfig {
        let data_dir = root.join("orig");
        fs::create_dir_all(data_dir.join("phase1")).unwrap();

        fs::write(
            data_dir.join("phase1/train_labels.csv"),
            format!("{HEADER}\nS0000,1,0,0\nS0001,1,0,0\nS0002,0,1,0\nS0003,0,1,1\n"),
        )
        .unwrap();
        fs::write(
            data_dir.join("submission_format.csv"),
            format!("{submission_header}\nS0100,0.5,0.5,0.5\n"),
        )
        .unwrap();

        let zip = zip_bytes(&[
            ("train_features/S0000.csv", "time,mass,intensity\n0,18.0,4.0\n1,44.0,8.0\n2,44.001,2.0\n"),
            ("train_features/S0001.csv", "time,mass,intensity\n0,32.0,1.0\n1,700.0,3.0\n"),
            ("train_features/S0002.csv", "time,mass,intensity\n0,18.0,0.0\n1,44.0,0.0\n"),
            ("train_features/S0003.csv", "time,mass,intensity\n0,64.0,5.0\n"),
        ]);
        fs::write(data_dir.join("phase1/train_features.zip"), zip).unwrap();

        AnalysisConfig {
            data_dir,
            out_dir: root.join("proc/phase1"),
            image_width: 240,
            image_height: 160,
            ..Default::default()
        }
    }

    #[test]
    fn inspect_reports_layout() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dataset(dir.path(), HEADER);
        let report = inspect(&cfg).unwrap();

        assert!(report.alignment.ordered_match);
        assert_eq!(report.archive_entries, 4);
        assert_eq!(report.archive_samples, 4);
        assert_eq!(report.labelled_rows, 4);
        assert_eq!(report.pure_rows, 3);
        assert_eq!(
            report.pure_per_class,
            vec![
                ("basalt".to_string(), 2),
                ("carbonate".to_string(), 1),
                ("sulfate".to_string(), 0),
            ]
        );
    }

    #[test]
    fn column_mismatch_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dataset(dir.path(), "sample_id,carbonate,basalt,sulfate");
        let report = inspect(&cfg).unwrap();
        assert!(!report.alignment.ordered_match);
        assert_ne!(report.label_header, report.submission_header);
    }

    #[test]
    fn zero_signal_sample_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dataset(dir.path(), HEADER);
        let err = run_plots(&cfg, PlotMode::Signature).unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("S0002"), "{msg}");
        assert!(msg.contains("carbonate"), "{msg}");
        let cause = err.downcast_ref::<SignatureError>();
        assert!(matches!(cause, Some(SignatureError::ZeroSignal { .. })));
    }

    #[test]
    fn skipping_zero_signal_and_empty_groups() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AnalysisConfig {
            skip_zero_signal: true,
            ..dataset(dir.path(), HEADER)
        };
        let summary = run_plots(&cfg, PlotMode::Signature).unwrap();

        assert_eq!(summary.plots, vec![cfg.out_dir.join("00_basalt.png")]);
        assert!(summary.plots[0].exists());
        assert_eq!(summary.skipped_classes, vec!["carbonate", "sulfate"]);
        assert_eq!(summary.skipped_samples, vec!["S0002"]);
        assert!(!cfg.out_dir.join("02_sulfate.png").exists());
    }

    #[test]
    fn plot_run_reports_column_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dataset(dir.path(), "sample_id,carbonate,basalt,sulfate");
        let summary = run_plots(&cfg, PlotMode::Raw).unwrap();

        assert!(!summary.alignment.ordered_match);
        assert!(summary.alignment.missing_in_labels.is_empty());
        assert_eq!(summary.plots.len(), 2);

        let aligned = run_plots(&dataset(dir.path(), HEADER), PlotMode::Raw).unwrap();
        assert!(aligned.alignment.ordered_match);
    }

    #[test]
    fn oversized_precision_fails_before_reading_samples() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AnalysisConfig {
            digits: 7,
            ..dataset(dir.path(), HEADER)
        };
        let err = run_plots(&cfg, PlotMode::Signature).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SignatureError>(),
            Some(SignatureError::InvalidGrid(_))
        ));
        assert!(!cfg.out_dir.exists());
    }

    #[test]
    fn raw_mode_plots_unnormalized_samples() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dataset(dir.path(), HEADER);
        let summary = run_plots(&cfg, PlotMode::Raw).unwrap();

        assert_eq!(summary.plots.len(), 2);
        assert!(cfg.out_dir.join("01_carbonate.png").exists());
        assert_eq!(summary.skipped_classes, vec!["sulfate"]);
        assert!(summary.skipped_samples.is_empty());
    }

    #[test]
    fn max_lines_limits_samples_read() {
        let groups = vec![CompoundGroup {
            index: 0,
            class_name: "basalt".into(),
            sample_ids: vec!["S0000".into(), "S0001".into(), "missing".into()],
        }];
        let zip = zip_bytes(&[
            ("train_features/S0000.csv", "time,mass,intensity\n0,18.0,4.0\n"),
            ("train_features/S0001.csv", "time,mass,intensity\n0,32.0,1.0\n"),
        ]);
        let mut archive =
            FeatureArchive::from_reader(std::io::Cursor::new(zip), "train_features/").unwrap();
        let cfg = AnalysisConfig {
            max_lines: 2,
            ..Default::default()
        };

        let mut skipped = Vec::new();
        let lines =
            collect_lines(&groups[0], &mut archive, &cfg, PlotMode::Signature, &mut skipped).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].sample_id, "S0001");
        assert_eq!(lines[0].points.len(), cfg.signature().grid().unwrap().len());
    }

    #[test]
    fn file_names_are_sanitized() {
        let group = CompoundGroup {
            index: 3,
            class_name: "iron oxide/ii".into(),
            sample_ids: Vec::new(),
        };
        assert_eq!(plot_file_name(&group), "03_iron_oxide_ii.png");
    }
}
