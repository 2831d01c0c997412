//! Command line interface for building windowed kline datasets
//!
//! - Build look-back windows and profit records from archive dumps
//! - Export the (ds, y) series consumed by a forecasting engine
//! - Print the future timestamp grid and forecast trend directions
//! - Convert saved klines JSON into the archive layout

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use binance_dataset::data::{filter_by_date, parse_klines, DATE_FORMAT};
use binance_dataset::forecast::{
    future_timestamps, load_forecast_csv, parse_interval, trend_directions, ForecastSeries,
};
use binance_dataset::{setup_logging, BinanceDataset, Config, DateBound, KlineArchiveStore};

#[derive(Parser)]
#[command(name = "binance_dataset")]
#[command(version = "0.1.0")]
#[command(about = "Windowed datasets from Binance kline dumps", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build look-back windows and profit records
    Build {
        /// Start date (%Y-%m-%d %H:%M:%S or -1)
        #[arg(long)]
        start: Option<String>,

        /// End date (%Y-%m-%d %H:%M:%S or -1)
        #[arg(long)]
        end: Option<String>,

        /// Look-back window size
        #[arg(short, long)]
        window_size: Option<usize>,

        /// Directory to write windows.csv and profits.csv into
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Export the (ds, y) mean price series for a forecaster
    ExportSeries {
        /// Symbol to export (defaults to all configured symbols)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Output CSV path
        #[arg(short, long, default_value = "data/series.csv")]
        output: PathBuf,
    },

    /// Print the timestamps a forecast should cover
    Future {
        /// First forecast timestamp (%Y-%m-%d %H:%M:%S)
        #[arg(short, long)]
        start: String,

        /// Number of steps after the start
        #[arg(short, long)]
        periods: Option<usize>,
    },

    /// Print trend directions of a forecast CSV (ds,yhat,yhat_lower,yhat_upper)
    Trend {
        /// Forecast CSV path
        forecast: PathBuf,
    },

    /// Convert a saved klines JSON payload into an archive
    Convert {
        /// Klines JSON file
        input: PathBuf,

        /// Trading symbol (e.g., BTCUSDT)
        #[arg(short, long)]
        symbol: String,

        /// Archive name without extension (e.g., BTCUSDT-30m-2024-01)
        #[arg(short, long)]
        name: String,
    },

    /// Write the default configuration file
    InitConfig,

    /// Show the active configuration
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    setup_logging(log_level)?;

    if !cli.config.exists() {
        warn!("Config {:?} not found, using defaults", cli.config);
    }

    match cli.command {
        Commands::Build {
            start,
            end,
            window_size,
            export,
        } => build(config, start, end, window_size, export.as_deref()),
        Commands::ExportSeries { symbol, output } => export_series(&config, symbol, &output),
        Commands::Future { start, periods } => show_future(&config, &start, periods),
        Commands::Trend { forecast } => show_trend(&forecast),
        Commands::Convert {
            input,
            symbol,
            name,
        } => convert(&config, &input, &symbol, &name),
        Commands::InitConfig => {
            Config::create_default(&cli.config)?;
            info!("Wrote default configuration to {:?}", cli.config);
            Ok(())
        }
        Commands::Info => {
            show_info(&config);
            Ok(())
        }
    }
}

fn build(
    mut config: Config,
    start: Option<String>,
    end: Option<String>,
    window_size: Option<usize>,
    export: Option<&Path>,
) -> Result<()> {
    if let Some(start) = start {
        config.dataset.start_date = start;
    }
    if let Some(end) = end {
        config.dataset.end_date = end;
    }
    if let Some(size) = window_size {
        config.dataset.window_size = size;
    }

    let dataset = BinanceDataset::new(&config.dataset)?;
    let (windows, profits) = dataset.get_dataset();

    println!("\nWindowed Dataset");
    println!("═══════════════════════════════════════════════════════════════\n");
    println!("  Symbols:     {}", config.dataset.crypto_symbols.join(", "));
    println!("  Features:    {}", dataset.feature_names().join(", "));
    println!("  Window size: {}", dataset.window_size());
    println!("  Windows:     {}", windows.len());

    if let (Some(first), Some(last)) = (profits.first(), profits.last()) {
        let mean_return =
            profits.iter().map(|p| p.return_pct()).sum::<f64>() / profits.len() as f64;
        let rising = profits.iter().filter(|p| p.profit() > 0.0).count();

        println!("  Labels from: {}", first.timestamp.format(DATE_FORMAT));
        println!("  Labels to:   {}", last.timestamp.format(DATE_FORMAT));
        println!("  Mean return: {:.4}%", mean_return);
        println!(
            "  Rising:      {} ({:.1}%)",
            rising,
            rising as f64 / profits.len() as f64 * 100.0
        );
    }
    println!();

    if let Some(dir) = export {
        export_dataset(&dataset, dir)?;
    }

    Ok(())
}

fn export_dataset(dataset: &BinanceDataset, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let profits_path = dir.join("profits.csv");
    let mut writer = csv::Writer::from_path(&profits_path)
        .with_context(|| format!("Failed to create file: {:?}", profits_path))?;
    for record in dataset.profit_records() {
        writer.serialize(record)?;
    }
    writer.flush()?;

    let windows_path = dir.join("windows.csv");
    let file = File::create(&windows_path)
        .with_context(|| format!("Failed to create file: {:?}", windows_path))?;
    let mut out = BufWriter::new(file);

    let mut header = vec!["end_timestamp".to_string()];
    for step in 0..dataset.window_size() {
        for name in dataset.feature_names() {
            header.push(format!("{}_t{}", name, step));
        }
    }
    writeln!(out, "{}", header.join(","))?;

    for window in dataset.windows() {
        let values: Vec<String> = window.values.iter().map(|v| v.to_string()).collect();
        writeln!(
            out,
            "{},{}",
            window.end_timestamp.format(DATE_FORMAT),
            values.join(",")
        )?;
    }
    out.flush()?;

    info!("Exported {} windows to {:?}", dataset.len(), dir);
    Ok(())
}

fn export_series(config: &Config, symbol: Option<String>, output: &Path) -> Result<()> {
    let symbols = match symbol {
        Some(symbol) => vec![symbol],
        None => config.dataset.crypto_symbols.clone(),
    };

    let store = KlineArchiveStore::new(&config.dataset.dataset_path, &config.dataset.interval);
    let bars = store.load_symbols(&symbols)?;
    let bars = filter_by_date(
        &bars,
        config.dataset.start_date.parse()?,
        config.dataset.end_date.parse()?,
    )?;

    let series = ForecastSeries::from_bars(&bars);
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    series.to_csv(output)?;

    info!("Saved {} points to {:?}", series.len(), output);
    Ok(())
}

fn show_future(config: &Config, start: &str, periods: Option<usize>) -> Result<()> {
    let start = match start.parse::<DateBound>()? {
        DateBound::At(ts) => ts,
        DateBound::Natural => bail!("Future start must be an explicit timestamp"),
    };
    let step = parse_interval(&config.forecast.interval)?;
    let periods = periods.unwrap_or(config.forecast.periods);

    for ds in future_timestamps(start, periods, step)? {
        println!("{}", ds.format(DATE_FORMAT));
    }

    Ok(())
}

fn show_trend(path: &Path) -> Result<()> {
    let points = load_forecast_csv(path)?;
    let trends = trend_directions(&points);

    println!(
        "{:>20} {:>14} {:>14} {:>14} {:>6}",
        "Date Time", "Predicted", "Lower", "Upper", "Trend"
    );
    println!("{:-<72}", "");

    for (point, trend) in points.iter().zip(&trends) {
        println!(
            "{:>20} {:>14.4} {:>14.4} {:>14.4} {:>6}",
            point.ds.format(DATE_FORMAT).to_string(),
            point.yhat,
            point.yhat_lower,
            point.yhat_upper,
            trend.arrow()
        );
    }

    Ok(())
}

fn convert(config: &Config, input: &Path, symbol: &str, name: &str) -> Result<()> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read file: {:?}", input))?;
    let bars = parse_klines(&json)?;

    let store = KlineArchiveStore::new(&config.dataset.dataset_path, &config.dataset.interval);
    let path = store.write_archive(symbol, name, &bars)?;

    info!("Wrote {} bars to {:?}", bars.len(), path);
    Ok(())
}

fn show_info(config: &Config) {
    println!("\nBinance Dataset v0.1.0");
    println!("═══════════════════════════════════════════════════════════════\n");

    println!("Dataset:");
    println!("  Path:          {}", config.dataset.dataset_path.display());
    println!("  Interval:      {}", config.dataset.interval);
    println!("  Symbols:       {}", config.dataset.crypto_symbols.join(", "));
    println!("  Features:      {}", config.dataset.main_features.join(", "));
    println!("  Start date:    {}", config.dataset.start_date);
    println!("  End date:      {}", config.dataset.end_date);
    println!("  Window Size:   {}", config.dataset.window_size);
    println!();

    println!("Forecast:");
    println!("  Periods:       {}", config.forecast.periods);
    println!("  Interval:      {}", config.forecast.interval);
    println!();

    println!("═══════════════════════════════════════════════════════════════\n");
}
