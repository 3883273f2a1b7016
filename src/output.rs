use anyhow::{Context, Result};
use corona_common::{FinalCoordinate, TimeSeries};
use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// On-disk encoding of the recorded time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Bincode,
    MessagePack,
}

impl SnapshotFormat {
    /// Parses the `output.format` config value, falling back to JSON.
    pub fn from_config(format: Option<&str>) -> Self {
        match format.unwrap_or("json") {
            "json" => SnapshotFormat::Json,
            "bincode" => SnapshotFormat::Bincode,
            "messagepack" => SnapshotFormat::MessagePack,
            other => {
                warn!("Unknown output format: {}. Using JSON instead.", other);
                SnapshotFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Bincode => "bin",
            SnapshotFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes the whole series as `{stem}_snapshots.{ext}` and returns the path.
pub fn write_snapshots(series: &TimeSeries, stem: &str, format: SnapshotFormat) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{}_snapshots.{}", stem, format.extension()));
    let file = File::create(&path)
        .with_context(|| format!("Error creating snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        SnapshotFormat::Json => serde_json::to_writer(&mut writer, series)
            .context("Error serializing snapshots to JSON")?,
        SnapshotFormat::Bincode => bincode::serialize_into(&mut writer, series)
            .context("Error serializing snapshots to bincode")?,
        SnapshotFormat::MessagePack => rmp_serde::encode::write(&mut writer, series)
            .context("Error serializing snapshots to MessagePack")?,
    }
    writer.flush()?;

    info!("{} snapshots saved to {}", series.snapshots.len(), path.display());
    Ok(path)
}

/// Reads a series written by `write_snapshots`, picking the decoder from the extension.
pub fn read_snapshots(path: &Path) -> Result<TimeSeries> {
    let file = File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let reader = std::io::BufReader::new(file);
    let series = match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => bincode::deserialize_from(reader).context("Failed to decode bincode snapshots")?,
        Some("msgpack") => rmp_serde::decode::from_read(reader).context("Failed to decode MessagePack snapshots")?,
        _ => serde_json::from_reader(reader).context("Failed to decode JSON snapshots")?,
    };
    Ok(series)
}

/// Time series as a table: `time`, one column per label, analytic columns, totals.
pub fn write_time_series_csv(series: &TimeSeries, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;

    let with_analytic = series.snapshots.first().is_some_and(|s| s.analytic.is_some());
    let mut header = vec!["time_s".to_string()];
    header.extend(series.labels.iter().cloned());
    if with_analytic {
        header.extend(series.species_names.iter().enumerate().map(|(i, name)| format!("analytic_{}_{}", i, name)));
    }
    header.push("total".to_string());
    header.push("total_coverage".to_string());
    writer.write_record(&header)?;

    for snapshot in &series.snapshots {
        let mut row = vec![format!("{}", snapshot.time)];
        row.extend(snapshot.counts.iter().map(|n| n.to_string()));
        if with_analytic {
            if let Some(values) = &snapshot.analytic {
                row.extend(values.iter().map(|v| format!("{:.6}", v)));
            }
        }
        row.push(snapshot.total_count.to_string());
        row.push(format!("{:.6}", snapshot.total_coverage));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    info!("Time series saved to {}", path.display());
    Ok(())
}

/// Final particle centres: `species_id, x, y, z, radius` (nm).
pub fn write_final_coords_csv(coords: &[FinalCoordinate], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    for coord in coords {
        writer.serialize(coord)?;
    }
    writer.flush()?;
    info!("Final positions of {} particles saved to {}", coords.len(), path.display());
    Ok(())
}

/// Reads a file written by `write_final_coords_csv`.
pub fn read_final_coords_csv(path: &Path) -> Result<Vec<FinalCoordinate>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    let mut coords = Vec::new();
    for record in reader.deserialize() {
        coords.push(record?);
    }
    Ok(coords)
}
