use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use pefilter::{bam_merge, detect, scheduler, stats, ChromMode, Protocol, ValidTags};

/// Filter false paired-end mappings by their strand orientation tags.
///
/// Reads an indexed, coordinate-sorted BAM whose records carry a `ZS`
/// orientation tag, keeps the pairs whose two-mate signature is valid for the
/// library preparation protocol, and reports per-tag-pair statistics. With no
/// protocol option the protocol is auto-detected from the start of the file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input BAM file. It should be indexed.
    #[arg(short, long)]
    infile: PathBuf,

    /// Output BAM file. To save the filtered BAM file.
    #[arg(short, long, required_unless_present = "stats_only")]
    outfile: Option<PathBuf>,

    /// Pico library preparation protocol (skips auto-detection).
    #[arg(short, long, conflicts_with = "traditional")]
    pico: bool,

    /// Traditional library preparation protocol (skips auto-detection).
    #[arg(long)]
    traditional: bool,

    /// Report PE tag statistics only but not generate filtered BAM file.
    #[arg(short, long)]
    stats_only: bool,

    /// Number of threads. Ensure enough memory for many threads.
    #[arg(short = 't', long, default_value_t = 1)]
    threads: usize,

    /// Valid tag pair in the format `tag1,tag2` for two ends. `N` means
    /// mapping not found. Repeatable, e.g. `-d ++,+- -d -+,--`.
    #[arg(short = 'd', long = "valid-tag")]
    valid_tags: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.threads == 0 {
        bail!("--threads must be a positive integer");
    }

    if args.stats_only {
        let counts = scheduler::run(&args.infile, args.threads, &ChromMode::ClassifyOnly)?;
        print!("{}", stats::format_table(&counts));
        return Ok(());
    }

    let outfile = args
        .outfile
        .context("-o|--outfile must be specified")?;

    let valid = if !args.valid_tags.is_empty() {
        println!("Using customized PE tags");
        ValidTags::custom(&args.valid_tags)?
    } else if args.pico {
        ValidTags::builtin(Protocol::Pico)
    } else if args.traditional {
        ValidTags::builtin(Protocol::Traditional)
    } else {
        let report = detect::detect_protocol(&args.infile)?;
        detect::print_report(&report);
        ValidTags::builtin(report.protocol)
    };

    let mode = ChromMode::Filter {
        out_stem: &outfile,
        valid: &valid,
    };
    let counts = scheduler::run(&args.infile, args.threads, &mode)?;

    let chroms = scheduler::reference_names(&args.infile)?;
    bam_merge::merge_chrom_bams(&args.infile, &outfile, &chroms)?;
    bam_merge::remove_temp_files(&outfile, &chroms)?;

    print!("{}", stats::format_table(&counts));
    // Positive rate is not meaningful for customized tag lists.
    if !valid.is_custom() {
        stats::print_positive_rate(&counts, &valid);
    }
    Ok(())
}
