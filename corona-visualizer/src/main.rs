use anyhow::{Context, Result};
use clap::Parser;
use corona_common::{FinalCoordinate, TimeSeries, Vec3};
use corona_kmc::output::{read_final_coords_csv, read_snapshots};
use env_logger::Builder;
use log::{info, warn, LevelFilter};
use plotters::prelude::*;
use std::f64::consts::{PI, TAU};
use std::path::PathBuf;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Snapshot file written by corona-kmc (.json, .bin or .msgpack)
    #[arg(short, long)]
    input: PathBuf,

    /// Output image for the bound-count curves
    #[arg(short, long, default_value = "corona_counts.png")]
    output: PathBuf,

    /// Optional final-coordinates CSV to draw as a surface map
    #[arg(long)]
    coords: Option<PathBuf>,

    /// Output image for the surface map
    #[arg(long, default_value = "corona_surface.png")]
    map_output: PathBuf,

    /// Image width in pixels
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 768)]
    height: u32,

    /// Plot total coverage instead of per-column counts
    #[arg(long)]
    coverage: bool,
}

/// One labelled curve of (time, value) points.
struct Curve {
    label: String,
    points: Vec<(f64, f64)>,
}

/// Bound counts per reported column, or the total coverage when `coverage` is set.
fn count_curves(series: &TimeSeries, coverage: bool) -> Vec<Curve> {
    if coverage {
        return vec![Curve {
            label: "coverage".to_string(),
            points: series.snapshots.iter().map(|s| (s.time, s.total_coverage)).collect(),
        }];
    }
    series
        .labels
        .iter()
        .enumerate()
        .map(|(col, label)| Curve {
            label: label.clone(),
            points: series
                .snapshots
                .iter()
                .filter_map(|s| s.counts.get(col).map(|&n| (s.time, n as f64)))
                .collect(),
        })
        .collect()
}

/// Mean-field predictions per species id, empty if the run had no overlay.
fn analytic_curves(series: &TimeSeries) -> Vec<Curve> {
    series
        .species_names
        .iter()
        .enumerate()
        .map(|(id, name)| Curve {
            label: format!("{} (mean field)", name),
            points: series
                .snapshots
                .iter()
                .filter_map(|s| s.analytic.as_ref().and_then(|a| a.get(id)).map(|&v| (s.time, v)))
                .collect(),
        })
        .filter(|c| !c.points.is_empty())
        .collect()
}

fn axis_limits<'a>(curves: impl IntoIterator<Item = &'a Curve>) -> (f64, f64) {
    let mut max_time = 0.0_f64;
    let mut max_value = 0.0_f64;
    for (t, v) in curves.into_iter().flat_map(|c| c.points.iter()) {
        max_time = max_time.max(*t);
        max_value = max_value.max(*v);
    }
    (max_time.max(1e-9), (max_value * 1.1).max(1.0))
}

/// Azimuth in [0, 2pi) and polar angle in [0, pi] of a particle centre.
fn surface_angles(coord: &FinalCoordinate) -> (f64, f64) {
    let r = Vec3::new(coord.x, coord.y, coord.z).length();
    if r == 0.0 {
        return (0.0, 0.0);
    }
    let theta = (coord.z / r).clamp(-1.0, 1.0).acos();
    let phi = coord.y.atan2(coord.x).rem_euclid(TAU);
    (if phi >= TAU { 0.0 } else { phi }, theta)
}

fn plot_counts(series: &TimeSeries, args: &Args) -> Result<()> {
    let curves = count_curves(series, args.coverage);
    let overlay = if args.coverage { Vec::new() } else { analytic_curves(series) };
    let (max_time, max_value) = axis_limits(curves.iter().chain(overlay.iter()));

    let root = BitMapBackend::new(&args.output, (args.width, args.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Protein corona", ("sans-serif", 32).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..max_time, 0.0..max_value)?;

    chart
        .configure_mesh()
        .x_desc("time (s)")
        .y_desc(if args.coverage { "coverage" } else { "bound proteins" })
        .draw()?;

    for (idx, curve) in curves.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(curve.points.iter().copied(), color.stroke_width(2)))?
            .label(curve.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    // Mean-field curves are thinner and half transparent.
    for (idx, curve) in overlay.iter().enumerate() {
        let color = Palette99::pick(idx).mix(0.5);
        chart
            .draw_series(LineSeries::new(curve.points.iter().copied(), color.stroke_width(1)))?
            .label(curve.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(1)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    info!("Count plot saved to {}", args.output.display());
    Ok(())
}

fn plot_surface_map(coords: &[FinalCoordinate], args: &Args) -> Result<()> {
    let root = BitMapBackend::new(&args.map_output, (args.width, args.width / 2 + 60)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Final surface ({} particles)", coords.len()), ("sans-serif", 28).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..TAU, 0.0..PI)?;

    chart.configure_mesh().x_desc("phi").y_desc("theta").draw()?;

    let max_radius = coords.iter().map(|c| c.radius).fold(0.0_f64, f64::max).max(1e-9);
    chart.draw_series(coords.iter().map(|coord| {
        let (phi, theta) = surface_angles(coord);
        let size = (2.0 + 6.0 * coord.radius / max_radius).round() as i32;
        Circle::new((phi, theta), size, Palette99::pick(coord.species_id).filled())
    }))?;

    root.present()?;
    info!("Surface map saved to {}", args.map_output.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    Builder::from_default_env().filter(None, LevelFilter::Info).init();

    info!("Starting Corona Visualizer...");
    let series = read_snapshots(&args.input)
        .with_context(|| format!("Failed to load snapshots from {}", args.input.display()))?;
    info!("Loaded {} snapshots with columns {:?}", series.snapshots.len(), series.labels);

    if series.snapshots.is_empty() {
        warn!("No snapshots in {}, nothing to plot.", args.input.display());
    } else {
        plot_counts(&series, &args)?;
    }

    if let Some(path) = &args.coords {
        let coords = read_final_coords_csv(path)?;
        plot_surface_map(&coords, &args)?;
    }

    info!("Visualization Complete.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corona_common::Snapshot;

    fn series() -> TimeSeries {
        TimeSeries {
            labels: vec!["Fib".into(), "HSA".into()],
            species_names: vec!["HSA".into(), "Fib".into()],
            snapshots: vec![
                Snapshot { time: 0.0, counts: vec![0, 0], total_count: 0, total_coverage: 0.0, analytic: Some(vec![0.0, 0.0]) },
                Snapshot { time: 5.0, counts: vec![2, 7], total_count: 9, total_coverage: 0.1, analytic: Some(vec![6.5, 1.5]) },
            ],
            final_state: None,
        }
    }

    #[test]
    fn count_curves_follow_columns() {
        let curves = count_curves(&series(), false);
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[1].label, "HSA");
        assert_eq!(curves[1].points, vec![(0.0, 0.0), (5.0, 7.0)]);

        let coverage = count_curves(&series(), true);
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].points[1], (5.0, 0.1));
    }

    #[test]
    fn analytic_curves_skip_missing_overlay() {
        assert_eq!(analytic_curves(&series()).len(), 2);
        let mut plain = series();
        for s in &mut plain.snapshots {
            s.analytic = None;
        }
        assert!(analytic_curves(&plain).is_empty());
    }

    #[test]
    fn axis_limits_pad_the_maximum() {
        let (t, v) = axis_limits(&count_curves(&series(), false));
        assert_eq!(t, 5.0);
        assert!((v - 7.7).abs() < 1e-12);
    }

    #[test]
    fn surface_angles_of_axis_points() {
        let north = FinalCoordinate { species_id: 0, x: 0.0, y: 0.0, z: 10.0, radius: 1.0 };
        let (_, theta) = surface_angles(&north);
        assert!(theta.abs() < 1e-12);

        let west = FinalCoordinate { species_id: 0, x: 0.0, y: -10.0, z: 0.0, radius: 1.0 };
        let (phi, theta) = surface_angles(&west);
        assert!((phi - 1.5 * PI).abs() < 1e-12);
        assert!((theta - PI / 2.0).abs() < 1e-12);
    }
}
