use crate::utils::Result;
use clap::{ArgAction, Parser};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// Where targeted variations come from. The literal argument "None" disables
/// all variant work for the batch.
#[derive(Debug, Clone)]
pub enum VariationSource {
    SkipFiltering,
    Path(PathBuf),
}

#[derive(Parser)]
#[command(name="varcell",
          version,
          about = "Assigns single-cell reads to wild-type and mutant cell populations for targeted variants",
          long_about = None,
          disable_help_subcommand = true,
          )]
pub struct Cli {
    #[clap(required = true)]
    #[clap(help = "Text file listing alignment BAM paths, one per line")]
    #[clap(value_name = "BAM_LIST")]
    #[arg(value_parser = check_file_exists)]
    pub alignments_path: PathBuf,

    #[clap(required = true)]
    #[clap(help = "Targeted-variation file (chrom, start, end; tab-separated), or 'None' to skip variant work")]
    #[clap(value_name = "VARIANTS")]
    #[arg(value_parser = variation_source_from_string)]
    pub variants: VariationSource,

    #[clap(required = true)]
    #[clap(help = "Path to reference genome FASTA")]
    #[clap(value_name = "GENOME")]
    #[arg(value_parser = check_file_exists)]
    pub genome_path: PathBuf,

    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(help = "Directory for per-sample JSON results")]
    #[clap(value_name = "OUTPUT_DIR")]
    #[clap(default_value = "output")]
    pub output_dir: PathBuf,

    #[clap(long = "vcf-dir")]
    #[clap(help = "Working directory for per-sample VCF files")]
    #[clap(value_name = "VCF_DIR")]
    #[clap(default_value = "vcf")]
    pub vcf_dir: PathBuf,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads for per-variation classification")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-coverage")]
    #[clap(value_name = "MIN_COVERAGE")]
    #[clap(help = "Minimum coverage passed to the variant caller")]
    #[clap(default_value = "5")]
    pub min_coverage: u32,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "caller")]
    #[clap(value_name = "CALLER")]
    #[clap(help = "Variant caller executable")]
    #[clap(default_value = "freebayes")]
    pub caller: String,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "caller-timeout")]
    #[clap(value_name = "SECONDS")]
    #[clap(help = "Kill an external tool invocation after this many seconds")]
    pub caller_timeout: Option<u64>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "sample-renames")]
    #[clap(value_name = "RENAMES")]
    #[clap(help = "Tab-separated file mapping derived sample names to output names")]
    #[arg(value_parser = check_file_exists)]
    pub sample_renames: Option<PathBuf>,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn variation_source_from_string(s: &str) -> Result<VariationSource> {
    if s == "None" {
        Ok(VariationSource::SkipFiltering)
    } else {
        Ok(VariationSource::Path(PathBuf::from(s)))
    }
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}
