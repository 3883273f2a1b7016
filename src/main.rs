use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use corona_common::{default_species, load_species_file, SimulationConfig};
use corona_kmc::output::{write_final_coords_csv, write_snapshots, write_time_series_csv, SnapshotFormat};
use corona_kmc::{run_replicates, CoarseGrainSummary, MeanFieldModel, ReplicatePlan, ReplicateStatistics, SpeciesTable};

/// Kinetic Monte Carlo simulation of protein adsorption onto a spherical nanoparticle.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used if it does not exist.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Nanoparticle radius (nm), overrides the config
    #[arg(short, long)]
    radius: Option<f64>,

    /// Species file: name, concentration (M), radius (nm), kon (1/(M s)), koff (1/s)
    #[arg(short, long)]
    proteins: Option<PathBuf>,

    /// Enable surface diffusion
    #[arg(short, long)]
    diffuse: bool,

    /// Report an effective single-protein summary at the end
    #[arg(long)]
    coarse: bool,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    replicates: Option<u32>,

    /// Tag appended to output file names
    #[arg(long)]
    file_id: Option<String>,
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = if args.config.exists() {
        SimulationConfig::load(&args.config)?
    } else {
        warn!("Config file '{}' not found, using defaults.", args.config.display());
        SimulationConfig::default()
    };

    // --- Command line overrides ---
    if let Some(radius) = args.radius {
        config.nanoparticle.radius_nm = radius;
    }
    if let Some(path) = &args.proteins {
        config.species.file = Some(path.clone());
    }
    if args.diffuse {
        config.diffusion.enabled = true;
    }
    if args.coarse {
        config.species.coarse_grain = true;
    }
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    if let Some(replicates) = args.replicates {
        config.run.replicates = replicates;
    }
    if let Some(file_id) = &args.file_id {
        config.output.file_id = file_id.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Corona KMC...");
    let args = Args::parse();
    let config = load_config(&args)?;
    debug!("Configuration: {:#?}", config);

    // --- Species ---
    let species_params = match &config.species.file {
        Some(path) => {
            info!("Loading species from {}", path.display());
            load_species_file(path)?
        }
        None => {
            info!("No species file given, using the built-in HSA/HDL/Fib set.");
            default_species()
        }
    };
    let params = config.run_params();
    let species = SpeciesTable::new(&species_params, params.np_radius)?;
    info!("NP radius {} nm, {} species:", params.np_radius, species.len());
    for (id, s) in species.iter().enumerate() {
        info!(
            "  [{}] {:<8} c = {:.3e} M, r = {} nm, kon = {:.3e}, koff = {:.3e}, binding sites = {:.1}",
            id, s.name, s.concentration, s.radius, s.kon, s.koff, s.max_binding_sites
        );
    }

    // --- Mean-field overlay ---
    let analytic = if config.output.analytic {
        match MeanFieldModel::new(&species) {
            Ok(model) => {
                info!("Mean-field steady state: {:?}", model.steady_state());
                Some(model)
            }
            Err(e) => {
                warn!("Skipping mean-field overlay: {}", e);
                None
            }
        }
    } else {
        None
    };

    // --- Run ---
    info!("Using {} Rayon threads.", rayon::current_num_threads());
    let plan = ReplicatePlan {
        params,
        base_seed: config.run.seed,
        replicates: config.run.replicates,
        group_by_name: config.species.group_by_name,
        analytic,
    };
    let start_time = Instant::now();
    let results = run_replicates(&plan, &species)?;
    info!("All replicates finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());

    if results.len() > 1 {
        let stats = ReplicateStatistics::from_results(&results);
        for (id, s) in species.iter().enumerate() {
            info!(
                "  {:<8} final count {:.2} +/- {:.2} over {} replicates",
                s.name, stats.mean_counts[id], stats.std_counts[id], stats.replicates
            );
        }
    }

    // --- Save Recorded Data ---
    let base_stem = config.output_stem();
    let format = SnapshotFormat::from_config(config.output.format.as_deref());
    for result in &results {
        let stem = if results.len() > 1 {
            format!("{}_r{}", base_stem, result.seed)
        } else {
            base_stem.clone()
        };

        if config.output.save_stats {
            if let Err(e) = write_snapshots(&result.series, &stem, format) {
                error!("{:#}", e);
            }
        } else {
            info!("Skipping saving snapshots as per config (save_stats is false).");
        }

        if config.output.save_time_series {
            let path = PathBuf::from(format!("{}.csv", stem));
            if let Err(e) = write_time_series_csv(&result.series, &path) {
                error!("{:#}", e);
            }
        }

        if config.output.save_final_coords {
            let path = PathBuf::from(format!("{}_final_coords.csv", stem));
            if let Err(e) = write_final_coords_csv(&result.coords, &path) {
                error!("{:#}", e);
            }
        }

        if config.species.coarse_grain {
            match &result.series.final_state {
                Some(final_state) => {
                    let summary =
                        CoarseGrainSummary::from_snapshot(final_state, plan.params.np_radius, species.total_concentration());
                    info!(
                        "Coarse-grained (seed {}): {} bound, coverage {:.4}, effective radius {:?} nm, Keq*c {:?}, dG {:?} kT",
                        result.seed,
                        summary.total_count,
                        summary.total_coverage,
                        summary.effective_radius,
                        summary.keq_concentration,
                        summary.delta_g
                    );
                }
                None => warn!("No final state recorded for seed {}", result.seed),
            }
        }
    }

    info!("Simulation Complete.");
    Ok(())
}
