use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use permsearch::algebra::{Element, FieldBuilder};
use permsearch::permutations::write_permutations;
use permsearch::{Search, SearchConfig, SearchOptions};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "permsearch",
    about = "Search for permutation polynomials and permutation rational functions over GF(p^r)"
)]
struct Cli {
    /// Log at debug level and report every accepted candidate.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for normalized f/g (or f when the denominator degree is 0).
    Search {
        /// Field characteristic.
        p: u32,
        /// Extension degree.
        r: u32,
        /// Numerator degree.
        f_degree: usize,
        /// Denominator degree; omit or 0 for polynomials.
        #[arg(default_value_t = 0)]
        g_degree: usize,
        /// Fix a numerator coefficient, `DEGREE=VALUE` (value as element index).
        #[arg(long = "fix", value_parser = parse_fix)]
        fixed: Vec<(usize, Element)>,
        /// Seed for choosing the defining polynomial.
        #[arg(long)]
        seed: Option<u64>,
        /// Sweep every value of every free coefficient.
        #[arg(long)]
        no_reduce: bool,
        /// Seconds between checkpoints.
        #[arg(long, default_value_t = 60)]
        checkpoint_secs: u64,
        /// Directory for the result and checkpoint files.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Build GF(p^r) and list the powers of its generator.
    Field {
        /// Field characteristic.
        p: u32,
        /// Extension degree.
        r: u32,
        /// Seed for choosing the defining polynomial.
        #[arg(long)]
        seed: Option<u64>,
        /// Defining polynomial, lowest degree first.
        #[arg(long, num_args = 1..)]
        poly: Option<Vec<u32>>,
    },
    /// Expand a result file into explicit permutations.
    Perms {
        /// Result file written by `search`.
        results: PathBuf,
        /// Only the normalized member of each family.
        #[arg(long)]
        norm: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Search {
            p,
            r,
            f_degree,
            g_degree,
            fixed,
            seed,
            no_reduce,
            checkpoint_secs,
            out,
        } => {
            let mut config = SearchConfig::new(p, r, f_degree, g_degree);
            for (degree, value) in fixed {
                config.fix(degree, value);
            }
            config.seed = seed;
            config.reduce = !no_reduce;
            config.verbose = cli.verbose;
            let options = SearchOptions {
                output_dir: out,
                checkpoint_interval: Duration::from_secs(checkpoint_secs.max(1)),
                ..SearchOptions::default()
            };
            run_search(config, options)?
        }
        Commands::Field { p, r, seed, poly } => run_field(p, r, seed, poly)?,
        Commands::Perms { results, norm } => {
            let written = write_permutations(&results, norm)
                .with_context(|| format!("failed to expand {}", results.display()))?;
            println!(
                "{} permutations from {} results written to {}",
                written.count,
                written.results,
                written.path.display()
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_search(config: SearchConfig, options: SearchOptions) -> Result<()> {
    let search = Search::new(config, options.clone()).context("invalid search parameters")?;
    stop_on_interrupt(options.stop)?;
    let outcome = search.run().context("search failed")?;
    let summary = outcome.summary();
    if outcome.is_complete() {
        println!(
            "{} results over the field defined by {} written to {}",
            summary.found,
            summary.irreducible,
            summary.results_path.display()
        );
    } else {
        println!(
            "stopped after {} of {} candidates; rerun to resume from {}",
            summary.count,
            summary.total,
            summary.checkpoint_path.display()
        );
    }
    Ok(())
}

/// Let Ctrl-C finish the current candidate and checkpoint instead of
/// killing the process mid-write.
fn stop_on_interrupt(stop: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        if stop.swap(true, Ordering::SeqCst) {
            warn!("second interrupt, exiting without a checkpoint");
            std::process::exit(130);
        }
        warn!("interrupt received, stopping at the next candidate");
    })
    .context("failed to install the interrupt handler")
}

fn run_field(p: u32, r: u32, seed: Option<u64>, poly: Option<Vec<u32>>) -> Result<()> {
    let mut builder = FieldBuilder::new(p, r);
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    if let Some(coeffs) = poly {
        builder = builder.irreducible(coeffs);
    }
    let field = builder
        .build()
        .with_context(|| format!("failed to build GF({p}^{r})"))?;

    println!("{}", field.irreducible());
    for k in field.nonzero() {
        println!("[{k}] x^{} = {}", k - 1, field.residue(k));
    }
    Ok(())
}

fn parse_fix(text: &str) -> Result<(usize, Element), String> {
    let (degree, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected DEGREE=VALUE, got {text:?}"))?;
    let degree = degree
        .trim()
        .parse()
        .map_err(|_| format!("bad degree {degree:?}"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("bad value {value:?}"))?;
    Ok((degree, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fix() {
        assert_eq!(parse_fix("3=0"), Ok((3, 0)));
        assert_eq!(parse_fix(" 2 = 5 "), Ok((2, 5)));
        assert!(parse_fix("3").is_err());
        assert!(parse_fix("a=1").is_err());
    }

    #[test]
    fn test_interrupt_handler_leaves_the_flag_clear() {
        let stop = Arc::new(AtomicBool::new(false));
        stop_on_interrupt(Arc::clone(&stop)).unwrap();
        assert!(!stop.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "permsearch", "search", "2", "4", "5", "2", "--fix", "3=0", "--no-reduce", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Search {
                g_degree,
                fixed,
                no_reduce,
                ..
            } => {
                assert_eq!(g_degree, 2);
                assert_eq!(fixed, vec![(3, 0)]);
                assert!(no_reduce);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
