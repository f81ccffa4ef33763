use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use colored::Colorize;
use unpaired::{
    dataset::Dataset,
    get_dls, logging,
    metrics::{fid, PooledPixels},
    save_batch, DlsConfig, Result, Stats,
};

/// Print the normalization statistics of a dataset.
#[derive(Parser, Debug)]
struct StatsCmd {
    #[clap(short, long)]
    config: PathBuf,
}

impl StatsCmd {
    fn exec(self) -> Result<()> {
        let mut cfg = DlsConfig::load(&self.config)?;
        cfg.normalize = true;
        cfg.batch_tfms = None;
        let dls = get_dls(&cfg)?;
        if let Some(stats) = &dls.stats {
            print_stats("A", &stats.a);
            print_stats("B", &stats.b);
        }
        Ok(())
    }
}

fn print_stats(domain: &str, stats: &Stats) {
    println!("{} mean: {:.5?}", format!("domain {}", domain).bold(), stats.mean);
    println!("{} std : {:.5?}", format!("domain {}", domain).bold(), stats.std);
}

/// Save decoded batches as PNG files.
#[derive(Parser, Debug)]
struct BatchCmd {
    #[clap(short, long)]
    config: PathBuf,
    #[clap(short, long)]
    out: PathBuf,
    #[clap(short = 'n', long, default_value = "1")]
    count: usize,
}

impl BatchCmd {
    fn exec(self) -> Result<()> {
        let cfg = DlsConfig::load(&self.config)?;
        let dls = get_dls(&cfg)?;
        println!("{} items, {} batches per epoch", dls.train.dataset().len(), dls.train.len());
        for (i, batch) in dls.train.iter().take(self.count).enumerate() {
            let decoded = dls.decode_batch(batch?)?;
            let dir = self.out.join(format!("batch{:0>4}", i));
            let written = save_batch(&decoded, &dir)?;
            println!("{} {} images -> {}", "saved".green(), written.len(), dir.display());
        }
        Ok(())
    }
}

/// Fréchet distance between two image directories.
#[derive(Parser, Debug)]
struct FidCmd {
    #[clap(long)]
    real: PathBuf,
    #[clap(long)]
    fake: PathBuf,
    #[clap(long, default_value = "64")]
    size: u32,
    #[clap(long, default_value = "4")]
    grid: usize,
}

impl FidCmd {
    fn exec(self) -> Result<()> {
        let extractor = PooledPixels::new(self.grid)?;
        let fd = fid(&extractor, &self.real, &self.fake, self.size)?;
        println!("{}: {:.6}", "fid".bold(), fd);
        Ok(())
    }
}

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
enum SubCommand {
    Stats(StatsCmd),
    Batch(BatchCmd),
    Fid(FidCmd),
}

fn main() -> ExitCode {
    logging::init("info");
    let result = match SubCommand::parse() {
        SubCommand::Stats(cmd) => cmd.exec(),
        SubCommand::Batch(cmd) => cmd.exec(),
        SubCommand::Fid(cmd) => cmd.exec(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
