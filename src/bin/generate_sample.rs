//! Writes a small synthetic dataset laid out like the real one:
//!
//! ```text
//! <root>/submission_format.csv
//! <root>/phase1/train_labels.csv
//! <root>/phase1/train_features.zip   (train_features/<sample_id>.csv)
//! ```
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CLASSES: [&str; 10] = [
    "basalt",
    "carbonate",
    "chloride",
    "iron_oxide",
    "oxalate",
    "oxychlorine",
    "phyllosilicate",
    "silicate",
    "sulfate",
    "sulfide",
];

/// Characteristic fragment masses released by each class.
fn class_peaks(class: usize) -> &'static [f64] {
    const PEAKS: [&[f64]; 10] = [
        &[18.0, 44.0, 16.0],
        &[44.0, 12.0, 28.0],
        &[36.0, 35.0, 38.0],
        &[32.0, 16.0, 56.0],
        &[44.0, 28.0, 18.0],
        &[32.0, 70.0, 35.0],
        &[18.0, 17.0, 20.0],
        &[28.0, 60.0, 18.0],
        &[64.0, 48.0, 32.0],
        &[34.0, 64.0, 32.0],
    ];
    PEAKS[class]
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }
}

/// Ion events for one sample: every compound releases its fragments around
/// its own release time, recorded as (time, mass, intensity).
fn generate_features(compounds: &[usize], rng: &mut SimpleRng) -> Vec<(f64, f64, f64)> {
    let mut rows = Vec::new();
    let release: Vec<f64> = compounds.iter().map(|_| 5.0 + rng.next_f64() * 20.0).collect();

    for step in 0..30 {
        let time = step as f64;
        for (&class, &centre) in compounds.iter().zip(&release) {
            for (rank, &mass) in class_peaks(class).iter().enumerate() {
                let amplitude = 1.0e-9 / (rank + 1) as f64;
                let jitter = (rng.next_f64() - 0.5) * 0.01;
                let intensity = gaussian(time, centre, 3.0, amplitude) * (0.9 + 0.2 * rng.next_f64());
                rows.push((time, mass + jitter, intensity));
            }
        }
        // Background helium and water.
        rows.push((time, 4.0, 2.0e-11 * rng.next_f64()));
        rows.push((time, 18.0 + (rng.next_f64() - 0.5) * 0.01, 1.0e-11 * rng.next_f64()));
    }
    rows
}

fn csv_bytes(header: &[&str], rows: impl IntoIterator<Item = Vec<String>>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV buffer: {}", e.error()))
}

fn main() -> Result<()> {
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/orig"));
    fs::create_dir_all(root.join("phase1"))
        .with_context(|| format!("creating {}", root.display()))?;

    let mut rng = SimpleRng::new(42);
    let n_samples = 60;

    let mut header = vec!["sample_id"];
    header.extend(CLASSES);

    let archive_file = File::create(root.join("phase1/train_features.zip"))
        .context("creating feature archive")?;
    let mut archive = ZipWriter::new(archive_file);
    let mut label_rows = Vec::with_capacity(n_samples);

    for i in 0..n_samples {
        let sample_id = format!("S{i:04}");
        let first = rng.below(CLASSES.len());
        let mut compounds = vec![first];
        // About a third of the samples are two-compound mixtures.
        if rng.next_f64() < 0.35 {
            let second = (first + 1 + rng.below(CLASSES.len() - 1)) % CLASSES.len();
            compounds.push(second);
        }

        let features = generate_features(&compounds, &mut rng);
        let body = csv_bytes(
            &["time", "mass", "intensity"],
            features
                .iter()
                .map(|(t, m, v)| vec![t.to_string(), format!("{m:.4}"), format!("{v:e}")]),
        )?;
        archive
            .start_file(format!("train_features/{sample_id}.csv"), SimpleFileOptions::default())
            .with_context(|| format!("adding {sample_id} to archive"))?;
        archive.write_all(&body)?;

        let mut row = vec![sample_id];
        row.extend((0..CLASSES.len()).map(|c| u8::from(compounds.contains(&c)).to_string()));
        label_rows.push(row);
    }
    archive.finish().context("finishing feature archive")?;

    fs::write(
        root.join("phase1/train_labels.csv"),
        csv_bytes(&header, label_rows)?,
    )
    .context("writing train_labels.csv")?;

    let submission_rows = (0..10).map(|i| {
        let mut row = vec![format!("S{:04}", n_samples + i)];
        row.extend(CLASSES.iter().map(|_| "0.5".to_string()));
        row
    });
    fs::write(
        root.join("submission_format.csv"),
        csv_bytes(&header, submission_rows)?,
    )
    .context("writing submission_format.csv")?;

    println!(
        "Wrote {n_samples} samples ({} classes) to {}",
        CLASSES.len(),
        root.display()
    );
    Ok(())
}
