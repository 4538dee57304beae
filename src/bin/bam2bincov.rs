use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;

use bincov::alignment_policy::AlignmentPolicy;
use bincov::bam::bin_bam_file;
use bincov::bigwig::write_bigwig;
use bincov::chrom_sizes::ChromSizes;
use bincov::cli::BinCovCli;
use bincov::merge::write_merged;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = BinCovCli::parse();
    if let Err(e) = run(&opts) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn is_bigwig(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("bw") | Some("bigwig")
    )
}

fn run(opts: &BinCovCli) -> Result<()> {
    if opts.width == 0 {
        bail!("bin width must be a positive integer");
    }
    let bigwig_out = is_bigwig(&opts.outfile);
    if bigwig_out && opts.input.is_some() {
        bail!("BigWig holds a single value track; merged two-sample output is text only");
    }

    let sizes = ChromSizes::from_path(&opts.chrom_sizes, opts.max_chroms)
        .with_context(|| format!("loading chromosome sizes from {}", opts.chrom_sizes.display()))?;
    log::info!("{} chromosomes, bin width {}", sizes.len(), opts.width);

    let policy = AlignmentPolicy::from_cli(opts);

    match &opts.input {
        Some(input) => {
            // independent accumulators, no shared state: bin both samples
            // in parallel and join at merge time
            let (treatment, control) = rayon::join(
                || bin_bam_file(&opts.bam, &sizes, opts.width, &policy),
                || bin_bam_file(input, &sizes, opts.width, &policy),
            );
            let treatment = treatment
                .with_context(|| format!("binning treatment sample {}", opts.bam.display()))?;
            let control =
                control.with_context(|| format!("binning control sample {}", input.display()))?;

            let file = File::create(&opts.outfile)
                .with_context(|| format!("opening output file {}", opts.outfile.display()))?;
            let mut writer = BufWriter::new(file);
            write_merged(&treatment, &control, &mut writer)
                .context("writing merged table (output may be incomplete)")?;
            writer.flush()?;
        }
        None => {
            let profile = bin_bam_file(&opts.bam, &sizes, opts.width, &policy)
                .with_context(|| format!("binning sample {}", opts.bam.display()))?;

            if bigwig_out {
                write_bigwig(&profile, &opts.outfile)
                    .with_context(|| format!("writing BigWig {}", opts.outfile.display()))?;
            } else {
                let file = File::create(&opts.outfile)
                    .with_context(|| format!("opening output file {}", opts.outfile.display()))?;
                let mut writer = BufWriter::new(file);
                profile
                    .write_table(&mut writer)
                    .context("writing coverage table (output may be incomplete)")?;
                writer.flush()?;
            }
        }
    }

    Ok(())
}
