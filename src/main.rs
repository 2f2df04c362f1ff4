//! rust_mutsig command-line interface

use clap::Parser;
use log::{info, warn, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;

use rust_mutsig::cli::{Cli, Commands};
use rust_mutsig::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok();
    }

    let result = match cli.command {
        Some(Commands::Refit {
            matrix,
            signatures,
            output,
            opportunity,
            data_type,
            lambda,
            bootstraps,
            seed,
            cohort_summary,
            max_iter,
            tol,
        }) => run_refit(
            &matrix,
            &signatures,
            &output,
            opportunity.as_deref(),
            &data_type,
            lambda,
            bootstraps,
            seed,
            cohort_summary.as_deref(),
            RefitParams { max_iter, tol },
        ),
        Some(Commands::Denovo {
            matrix,
            n_signatures,
            lambda,
            exposures,
            signatures,
            opportunity,
            reference,
            similarity,
            em_steps,
            gd_steps,
            seed,
            tol,
        }) => {
            let params = DenovoParams {
                em_steps,
                gd_steps,
                tol,
                ..DenovoParams::new(n_signatures, lambda)
            };
            run_denovo(
                &matrix,
                &exposures,
                &signatures,
                opportunity.as_deref(),
                reference.as_deref(),
                similarity.as_deref(),
                &params,
                seed,
            )
        }
        Some(Commands::Bootstrap {
            matrix,
            signatures,
            mean,
            std,
            opportunity,
            data_type,
            lambda,
            bootstraps,
            seed,
        }) => run_bootstrap(
            &matrix,
            &signatures,
            &mean,
            &std,
            opportunity.as_deref(),
            &data_type,
            lambda,
            bootstraps,
            seed,
        ),
        Some(Commands::Similarity {
            signatures,
            reference,
            output,
            json,
        }) => run_similarity(&signatures, &reference, &output, json.as_deref()),
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_no_args() {
    println!("rust_mutsig v{}", VERSION);
    println!("Run `rust_mutsig -h` for usage or `rust_mutsig --help` for detailed information.");
}

// ---------------------------------------------------------------------------
// Shared input handling
// ---------------------------------------------------------------------------

fn load_opportunity(counts: &MutationCounts, path: Option<&str>) -> Result<ndarray::Array2<f64>> {
    let source = match path {
        Some(path) => {
            info!("Loading opportunity weights from: {}", path);
            Some(read_opportunity(path)?)
        }
        None => None,
    };
    normalize_opportunity(counts.counts(), source.as_ref())
}

fn resolve_lambda(data_type: &str, lambda: Option<f64>) -> Result<f64> {
    let data_type: DataType = data_type.parse()?;
    Ok(lambda.unwrap_or_else(|| data_type.default_lambda()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn run_refit(
    matrix_path: &str,
    signatures_path: &str,
    output_path: &str,
    opportunity_path: Option<&str>,
    data_type: &str,
    lambda: Option<f64>,
    n_bootstraps: usize,
    seed: u64,
    cohort_summary_path: Option<&str>,
    params: RefitParams,
) -> Result<()> {
    let lambda = resolve_lambda(data_type, lambda)?;

    info!("Loading mutation counts from: {}", matrix_path);
    let counts = read_mutation_counts(matrix_path)?;
    info!("Loading signature catalog from: {}", signatures_path);
    let catalog = read_signature_catalog(signatures_path)?;
    let opportunity = load_opportunity(&counts, opportunity_path)?;

    let result = refit_counts(&counts, &catalog, opportunity.view(), lambda, &params)?;
    info!(
        "Refit finished after {} iterations (objective {:.6e})",
        result.iterations, result.objective
    );

    if let Some(exposures) = result.single_sample() {
        let summary = bootstrap_counts(
            &counts,
            &catalog,
            opportunity.view(),
            n_bootstraps,
            lambda,
            &params,
            seed,
        )?;
        let (_, std_dev) = summary.single_sample().ok_or_else(|| MutSigError::EmptyData {
            reason: "bootstrap summary has no rows".to_string(),
        })?;

        info!("Writing exposures with bootstrap standard deviations to: {}", output_path);
        write_single_sample_exposures(output_path, exposures, std_dev, catalog.names())?;
        if cohort_summary_path.is_some() {
            warn!("--cohort-summary is ignored for single-sample input");
        }
    } else {
        info!("Writing exposures to: {}", output_path);
        write_exposures(
            output_path,
            result.exposures.view(),
            counts.sample_ids(),
            catalog.names(),
        )?;
        if let Some(path) = cohort_summary_path {
            info!("Writing cohort mean exposures to: {}", path);
            write_cohort_summary(path, result.cohort_mean().view(), catalog.names())?;
        }
    }

    info!("Done!");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_denovo(
    matrix_path: &str,
    exposures_path: &str,
    signatures_path: &str,
    opportunity_path: Option<&str>,
    reference_path: Option<&str>,
    similarity_path: Option<&str>,
    params: &DenovoParams,
    seed: u64,
) -> Result<()> {
    info!("Loading mutation counts from: {}", matrix_path);
    let counts = read_mutation_counts(matrix_path)?;
    let opportunity = load_opportunity(&counts, opportunity_path)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let result = denovo_counts(&counts, opportunity.view(), params, &mut rng)?;
    info!(
        "De novo extraction finished after {} EM iterations (log-likelihood {:.4})",
        result.em_iterations, result.log_likelihood
    );

    let names = denovo_signature_names(params.n_signatures);
    info!("Writing exposures to: {}", exposures_path);
    write_exposures(exposures_path, result.exposures.view(), counts.sample_ids(), &names)?;
    info!("Writing signatures to: {}", signatures_path);
    write_signatures(signatures_path, result.signatures.view(), &names, counts.categories())?;

    if let Some(reference_path) = reference_path {
        info!("Loading reference catalog from: {}", reference_path);
        let catalog = read_signature_catalog(reference_path)?;
        let report = match_to_catalog(result.signatures.view(), &catalog)?;
        info!(
            "Mean cosine similarity of matched signatures: {:.3}",
            report.mean_assigned_similarity()
        );
        if let Some(path) = similarity_path {
            info!("Writing similarity matrix to: {}", path);
            write_similarity(path, report.similarity.view(), &names, catalog.names())?;
        }
    }

    info!("Done!");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_bootstrap(
    matrix_path: &str,
    signatures_path: &str,
    mean_path: &str,
    std_path: &str,
    opportunity_path: Option<&str>,
    data_type: &str,
    lambda: Option<f64>,
    n_bootstraps: usize,
    seed: u64,
) -> Result<()> {
    let lambda = resolve_lambda(data_type, lambda)?;

    info!("Loading mutation counts from: {}", matrix_path);
    let counts = read_mutation_counts(matrix_path)?;
    info!("Loading signature catalog from: {}", signatures_path);
    let catalog = read_signature_catalog(signatures_path)?;
    let opportunity = load_opportunity(&counts, opportunity_path)?;

    let summary = bootstrap_counts(
        &counts,
        &catalog,
        opportunity.view(),
        n_bootstraps,
        lambda,
        &RefitParams::default(),
        seed,
    )?;

    info!("Writing bootstrap mean to: {} and std to: {}", mean_path, std_path);
    write_bootstrap_summary(
        mean_path,
        std_path,
        &summary,
        counts.sample_ids(),
        catalog.names(),
    )?;

    info!("Done!");
    Ok(())
}

fn run_similarity(
    signatures_path: &str,
    reference_path: &str,
    output_path: &str,
    json_path: Option<&str>,
) -> Result<()> {
    info!("Loading signatures from: {}", signatures_path);
    let signatures = read_signature_catalog(signatures_path)?;
    info!("Loading reference catalog from: {}", reference_path);
    let reference = read_signature_catalog(reference_path)?;

    let report = match_to_catalog(signatures.signatures(), &reference)?;

    info!("Writing similarity matrix to: {}", output_path);
    write_similarity(
        output_path,
        report.similarity.view(),
        signatures.names(),
        reference.names(),
    )?;
    if let Some(path) = json_path {
        info!("Writing signature assignment to: {}", path);
        write_matches_json(path, &report)?;
    }

    info!("Done!");
    Ok(())
}
