use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use peak_panda::output::OverwritePolicy;
use peak_panda::pipeline::{self, PipelineReport};
use peak_panda::{ClassifiedPeak, Domain, PipelineConfig, SortOrder};

#[derive(Parser)]
#[command(name = "peak-panda", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect, classify and export the peaks of one spectrum
    Run(RunArgs),
    /// Run every configuration of a JSON file (one object or an array)
    Batch {
        config: PathBuf,
    },
    /// Classify an existing `x,y` peak list into a publication table
    Classify {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = Domain::Ir)]
        domain: Domain,
        #[arg(long, value_enum)]
        order: Option<SortOrder>,
        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, value_enum)]
    domain: Domain,
    /// Instrument export to analyse
    input: PathBuf,
    /// Classified peak table (.csv, or .tsv/.txt for tab separated)
    #[arg(short, long)]
    output: PathBuf,
    /// Inclusive x window searched for peaks
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"], allow_negative_numbers = true)]
    range: Option<Vec<f64>>,
    /// Search the whole series, ignoring the domain's default window
    #[arg(long, conflicts_with = "range")]
    full_range: bool,
    /// Minimum peak height (domain default if omitted)
    #[arg(long, allow_negative_numbers = true)]
    height: Option<f64>,
    /// Minimum peak prominence (domain default if omitted)
    #[arg(long)]
    prominence: Option<f64>,
    #[arg(long, value_enum)]
    order: Option<SortOrder>,
    /// Save a PNG figure next to the output
    #[arg(long)]
    plot: bool,
    #[arg(long, requires = "plot")]
    plot_path: Option<PathBuf>,
    /// Replace existing output files
    #[arg(long)]
    overwrite: bool,
    /// Also write the raw x,y,height,prominence list
    #[arg(long)]
    peak_list: Option<PathBuf>,
}

impl RunArgs {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.domain, self.input, self.output);
        if let Some(range) = self.range {
            config.x_range = Some([range[0], range[1]]);
        }
        if self.full_range {
            config.x_range = None;
        }
        if let Some(height) = self.height {
            config.min_height = height;
        }
        if let Some(prominence) = self.prominence {
            config.min_prominence = prominence;
        }
        config.sort_order = self.order;
        config.save_plot = self.plot;
        config.plot_path = self.plot_path;
        config.overwrite = self.overwrite;
        config.peak_list_path = self.peak_list;
        config
    }
}

fn print_peaks(peaks: &[ClassifiedPeak], label: &str) {
    println!("{label:>12}  normalized  intensity");
    for p in peaks.iter().take(10) {
        println!(
            "{:>12.4}  {:>10.3}  {}",
            p.position, p.normalized_height, p.intensity_class
        );
    }
    if peaks.len() > 10 {
        println!("... {} more", peaks.len() - 10);
    }
}

fn print_report(report: &PipelineReport, domain: Domain) {
    println!(
        "{domain} {}: {} samples, searched {:?}",
        report.input_path.display(),
        report.samples,
        report.window
    );
    for (key, value) in &report.metadata {
        println!("  {key}: {value}");
    }
    println!("{}", report.summary);
    print_peaks(&report.classified, domain.column_label());
    println!(
        "Exported {} peaks to '{}'",
        report.classified.len(),
        report.output_path.display()
    );
    if let Some(plot) = &report.plot_path {
        println!("Figure saved as '{}'", plot.display());
    }
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Run(args) => {
            let config = args.into_config();
            let report = pipeline::run(&config)
                .with_context(|| format!("analysing {}", config.input_path.display()))?;
            print_report(&report, config.domain);
        }
        Command::Batch { config } => {
            let configs = PipelineConfig::from_json_file(&config)
                .with_context(|| format!("reading batch file {}", config.display()))?;
            let results = pipeline::run_batch(&configs);
            let mut failed = 0;
            for (config, result) in configs.iter().zip(&results) {
                match result {
                    Ok(report) => print_report(report, config.domain),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {e}", config.input_path.display());
                    }
                }
                println!();
            }
            if failed > 0 {
                bail!("{failed} of {} files failed", configs.len());
            }
        }
        Command::Classify {
            input,
            output,
            domain,
            order,
            overwrite,
        } => {
            let order = order.unwrap_or_else(|| domain.default_sort_order());
            let classified = pipeline::reclassify(
                &input,
                &output,
                domain,
                order,
                OverwritePolicy::from_flag(overwrite),
            )
            .with_context(|| format!("classifying {}", input.display()))?;
            print_peaks(&classified, domain.column_label());
            println!("Results saved to '{}'", output.display());
        }
    }
    Ok(())
}
