//! Command-line interface for rust_mutsig

use clap::{Parser, Subcommand};

use crate::bootstrap::DEFAULT_BOOTSTRAPS;

#[derive(Parser)]
#[command(name = "rust_mutsig")]
#[command(version)]
#[command(about = "Mutational signature refitting, de novo extraction and bootstrap confidence")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of threads for bootstrap iterations (0 = auto) [default: 0]
    #[arg(short = 't', long, global = true, default_value = "0")]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate exposures to known signatures
    #[command(
        long_about = "Estimate exposures to a known signature catalog.\n\n\
            Fits each sample's counts as a non-negative combination of the catalog\n\
            signatures under a Poisson model with an L1 penalty on exposures.\n\
            A single-sample input also gets bootstrap standard deviations.",
        after_long_help = "\
Examples:
  # Cohort refit, with the mean exposure per signature
  rust_mutsig refit -m counts.tsv -s COSMIC_v3.csv -o exposures.tsv \\
    --cohort-summary cohort.tsv

  # Single sample with 200 bootstrap iterations
  rust_mutsig refit -m sample.tsv -s COSMIC_v3.csv -o exposures.tsv --bootstraps 200"
    )]
    Refit {
        /// Path to mutation count matrix
        #[arg(short = 'm', long,
            long_help = "Path to mutation count matrix.\n\
                Format: header of category labels, one row per sample,\n\
                optional first column of sample IDs.\n\
                Supports both CSV (comma) and TSV (tab) delimiters (auto-detected).")]
        matrix: String,

        /// Path to signature catalog
        #[arg(short, long,
            long_help = "Path to signature catalog.\n\
                Either one signature per row, or the COSMIC layout with one row\n\
                per mutation context and one column per signature.")]
        signatures: String,

        /// Output exposure table
        #[arg(short, long)]
        output: String,

        /// Opportunity weights (headerless, tab-delimited)
        #[arg(long,
            long_help = "Opportunity weights, headerless.\n\
                One row = per-category weights shared by all samples;\n\
                one row per sample = per-sample weights.\n\
                Without this file every weight is 1.")]
        opportunity: Option<String>,

        /// Sequencing data type: exome or genome [default: exome]
        #[arg(long, default_value = "exome")]
        data_type: String,

        /// Regularization strength (overrides the data-type default)
        #[arg(long)]
        lambda: Option<f64>,

        /// Bootstrap iterations for single-sample input [default: 100]
        #[arg(long, default_value_t = DEFAULT_BOOTSTRAPS)]
        bootstraps: usize,

        /// Random seed for bootstrap resampling [default: 10000]
        #[arg(long, default_value = "10000")]
        seed: u64,

        /// Write the mean exposure per signature over the cohort
        #[arg(long, value_name = "FILE")]
        cohort_summary: Option<String>,

        /// Maximum solver iterations per fit [default: 1000]
        #[arg(long, default_value = "1000")]
        max_iter: usize,

        /// Relative objective tolerance for convergence [default: 1e-8]
        #[arg(long, default_value = "1e-8")]
        tol: f64,
    },

    /// Extract signatures de novo
    #[command(
        long_about = "Extract signatures and exposures jointly from a cohort.\n\n\
            Alternates exposure refits with projected gradient steps on the\n\
            signatures. With --reference, extracted signatures are matched to\n\
            a known catalog by cosine similarity.",
        after_long_help = "\
Examples:
  rust_mutsig denovo -m counts.tsv -k 4 --lambda 0.2 \\
    -e exposures.tsv -s signatures.tsv

  rust_mutsig denovo -m counts.tsv -k 4 --lambda 0.2 -e exposures.tsv -s signatures.tsv \\
    --reference COSMIC_v3.csv --similarity similarity.tsv"
    )]
    Denovo {
        /// Path to mutation count matrix
        #[arg(short = 'm', long)]
        matrix: String,

        /// Number of signatures to extract
        #[arg(short = 'k', long)]
        n_signatures: usize,

        /// Regularization strength
        #[arg(long)]
        lambda: f64,

        /// Output exposure table
        #[arg(short = 'e', long)]
        exposures: String,

        /// Output signature table (categories x signatures)
        #[arg(short = 's', long)]
        signatures: String,

        /// Opportunity weights (headerless, tab-delimited)
        #[arg(long)]
        opportunity: Option<String>,

        /// Reference catalog to match extracted signatures against
        #[arg(long)]
        reference: Option<String>,

        /// Output similarity matrix (requires --reference)
        #[arg(long, requires = "reference")]
        similarity: Option<String>,

        /// Outer EM iterations [default: 2]
        #[arg(long, default_value = "2")]
        em_steps: usize,

        /// Gradient steps per M-step [default: 50]
        #[arg(long, default_value = "50")]
        gd_steps: usize,

        /// Random seed for signature initialization [default: 10000]
        #[arg(long, default_value = "10000")]
        seed: u64,

        /// Stop early when the relative objective change falls below this
        #[arg(long)]
        tol: Option<f64>,
    },

    /// Bootstrap exposure means and standard deviations
    #[command(
        long_about = "Estimate exposure uncertainty by multinomial resampling.\n\n\
            Each iteration resamples every sample's counts with its observed\n\
            proportions and refits the catalog.",
        after_long_help = "\
Examples:
  rust_mutsig bootstrap -m counts.tsv -s COSMIC_v3.csv --mean mean.tsv --std std.tsv"
    )]
    Bootstrap {
        /// Path to mutation count matrix
        #[arg(short = 'm', long)]
        matrix: String,

        /// Path to signature catalog
        #[arg(short, long)]
        signatures: String,

        /// Output table of mean exposures
        #[arg(long)]
        mean: String,

        /// Output table of exposure standard deviations
        #[arg(long)]
        std: String,

        /// Opportunity weights (headerless, tab-delimited)
        #[arg(long)]
        opportunity: Option<String>,

        /// Sequencing data type: exome or genome [default: exome]
        #[arg(long, default_value = "exome")]
        data_type: String,

        /// Regularization strength (overrides the data-type default)
        #[arg(long)]
        lambda: Option<f64>,

        /// Bootstrap iterations [default: 100]
        #[arg(long, default_value_t = DEFAULT_BOOTSTRAPS)]
        bootstraps: usize,

        /// Random seed [default: 10000]
        #[arg(long, default_value = "10000")]
        seed: u64,
    },

    /// Match signatures against a reference catalog
    #[command(
        after_long_help = "\
Examples:
  rust_mutsig similarity -s signatures.tsv -r COSMIC_v3.csv -o similarity.tsv --json matches.json"
    )]
    Similarity {
        /// Signatures to match (e.g. de novo output)
        #[arg(short, long)]
        signatures: String,

        /// Reference catalog
        #[arg(short, long)]
        reference: String,

        /// Output similarity matrix
        #[arg(short, long)]
        output: String,

        /// Write the one-to-one assignment as JSON
        #[arg(long)]
        json: Option<String>,
    },
}
