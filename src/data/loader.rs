use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;
use zip::ZipArchive;

use super::model::{IonEvent, LabelRow, LabelTable, Sample};

// ---------------------------------------------------------------------------
// Label table / submission format
// ---------------------------------------------------------------------------

/// Read only the header row of a CSV file (e.g. the submission format).
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading CSV headers of {}", path.display()))?;
    Ok(headers.iter().map(|h| h.to_string()).collect())
}

/// CSV layout: `sample_id,<class_1>,...,<class_n>` with numeric indicators.
pub fn load_label_table(path: &Path) -> Result<LabelTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_label_table(BufReader::new(file))
        .with_context(|| format!("parsing label table {}", path.display()))
}

fn parse_label_table<R: Read>(source: R) -> Result<LabelTable> {
    let mut reader = csv::Reader::from_reader(source);
    let header: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if header.len() < 2 {
        bail!("expected an id column followed by class columns, got {header:?}");
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let sample_id = record.get(0).unwrap_or("").to_string();

        let indicators = record
            .iter()
            .enumerate()
            .skip(1)
            .map(|(col_idx, cell)| {
                cell.trim().parse::<f64>().with_context(|| {
                    format!(
                        "row {row_no}, column '{}': '{cell}' is not a number",
                        header[col_idx]
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        rows.push(LabelRow {
            sample_id,
            indicators,
        });
    }

    Ok(LabelTable { header, rows })
}

// ---------------------------------------------------------------------------
// Feature archive
// ---------------------------------------------------------------------------

/// Zip archive holding one `<prefix><sample_id>.csv` feature table per sample.
pub struct FeatureArchive<R: Read + Seek = BufReader<File>> {
    archive: ZipArchive<R>,
    prefix: String,
}

impl FeatureArchive {
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::from_reader(BufReader::new(file), prefix)
            .with_context(|| format!("reading zip archive {}", path.display()))
    }
}

impl<R: Read + Seek> FeatureArchive<R> {
    pub fn from_reader(reader: R, prefix: &str) -> Result<Self> {
        let archive = ZipArchive::new(reader).context("reading zip central directory")?;
        debug!("feature archive holds {} entries", archive.len());
        Ok(FeatureArchive {
            archive,
            prefix: prefix.to_string(),
        })
    }

    /// Every entry name in the archive, in archive order.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(|n| n.to_string()).collect()
    }

    /// Sample ids that have a feature table under the configured prefix.
    pub fn sample_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .archive
            .file_names()
            .filter_map(|n| n.strip_prefix(self.prefix.as_str()))
            .filter_map(|n| n.strip_suffix(".csv"))
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .map(|id| id.to_string())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Read the feature table of one sample.
    pub fn read_sample(&mut self, sample_id: &str) -> Result<Sample> {
        let name = format!("{}{sample_id}.csv", self.prefix);
        let entry = self
            .archive
            .by_name(&name)
            .with_context(|| format!("archive entry '{name}'"))?;

        let mut reader = csv::Reader::from_reader(entry);
        let mut events = Vec::new();
        for (row_no, result) in reader.deserialize::<IonEvent>().enumerate() {
            let event = result.with_context(|| format!("'{name}', row {row_no}"))?;
            events.push(event);
        }
        debug!("read {} ion events for {sample_id}", events.len());

        Ok(Sample::new(sample_id, events))
    }

    /// Read several samples, in the given order.
    pub fn read_samples<S: AsRef<str>>(&mut self, sample_ids: &[S]) -> Result<Vec<Sample>> {
        sample_ids
            .iter()
            .map(|id| self.read_sample(id.as_ref()))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    /// Build an in-memory archive from (entry name, CSV body) pairs.
    pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn parses_label_table() {
        let csv = "sample_id,basalt,sulfate\nS0000,1,0\nS0001,0.0,1.0\n";
        let table = parse_label_table(csv.as_bytes()).unwrap();
        assert_eq!(table.class_names(), &["basalt".to_string(), "sulfate".to_string()][..]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].sample_id, "S0001");
        assert_eq!(table.rows[1].indicators, vec![0.0, 1.0]);
    }

    #[test]
    fn bad_indicator_names_row_and_column() {
        let csv = "sample_id,basalt,sulfate\nS0000,1,yes\n";
        let err = parse_label_table(csv.as_bytes()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("row 0"), "{msg}");
        assert!(msg.contains("sulfate"), "{msg}");
    }

    #[test]
    fn header_only_table_needs_class_columns() {
        assert!(parse_label_table("sample_id\n".as_bytes()).is_err());
    }

    #[test]
    fn reads_header_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submission_format.csv");
        std::fs::write(&path, "sample_id,basalt,sulfate\nS0100,0.5,0.5\n").unwrap();
        assert_eq!(read_header(&path).unwrap(), vec!["sample_id", "basalt", "sulfate"]);
    }

    #[test]
    fn reads_samples_from_archive() {
        let bytes = zip_bytes(&[
            ("train_features/S0000.csv", "time,mass,intensity\n0.0,4.0,10.5\n0.1,18.02,3.0\n"),
            ("train_features/S0001.csv", "time,mass,intensity\n0.0,44.0,1.0\n"),
            ("README.txt", "not a sample"),
        ]);
        let mut archive = FeatureArchive::from_reader(Cursor::new(bytes), "train_features/").unwrap();

        assert_eq!(archive.len(), 3);
        assert_eq!(archive.entry_names().len(), 3);
        assert_eq!(archive.sample_ids(), vec!["S0000", "S0001"]);

        let sample = archive.read_sample("S0000").unwrap();
        assert_eq!(sample.id, "S0000");
        assert_eq!(sample.events.len(), 2);
        assert_eq!(
            sample.events[1],
            IonEvent { time: 0.1, mass: 18.02, intensity: 3.0 }
        );

        let both = archive.read_samples(&["S0001", "S0000"]).unwrap();
        assert_eq!(both[0].id, "S0001");
    }

    #[test]
    fn extra_columns_are_ignored() {
        let bytes = zip_bytes(&[(
            "train_features/S0002.csv",
            "time,mass,intensity,instrument\n1.5,12.0,2.0,sam\n",
        )]);
        let mut archive = FeatureArchive::from_reader(Cursor::new(bytes), "train_features/").unwrap();
        let sample = archive.read_sample("S0002").unwrap();
        assert_eq!(sample.events[0].mass, 12.0);
    }

    #[test]
    fn missing_sample_names_the_entry() {
        let bytes = zip_bytes(&[("train_features/S0000.csv", "time,mass,intensity\n")]);
        let mut archive = FeatureArchive::from_reader(Cursor::new(bytes), "train_features/").unwrap();
        let err = archive.read_sample("S9999").unwrap_err();
        assert!(format!("{err:#}").contains("train_features/S9999.csv"));
    }

    #[test]
    fn malformed_row_is_an_error() {
        let bytes = zip_bytes(&[(
            "train_features/S0003.csv",
            "time,mass,intensity\n0.0,abc,1.0\n",
        )]);
        let mut archive = FeatureArchive::from_reader(Cursor::new(bytes), "train_features/").unwrap();
        let err = archive.read_sample("S0003").unwrap_err();
        assert!(format!("{err:#}").contains("row 0"));
    }
}
