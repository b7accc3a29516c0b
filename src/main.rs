use clap::Parser;
use log::debug;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tempwatch::present::{render_describe, render_seasonal};
use tempwatch::{
    DashboardConfig, DashboardError, DashboardReport, PassInput, SimpleLogger, TemperatureUnit,
    run_pass, write_city_outputs, write_json,
};

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Historical dataset (.csv or .parquet) with city, timestamp and temperature columns
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// City to analyze (defaults to the first city of the list)
    #[arg(short, long)]
    city: Option<String>,

    /// OpenWeatherMap API key; the live comparison is skipped without one
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Month (1-12) used to pick the season for the live comparison. Defaults to the current month.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Temperature unit for analysis and output
    #[arg(long)]
    unit: Option<TemperatureUnit>,

    /// Rolling window length in records
    #[arg(long)]
    window: Option<usize>,

    /// Band half-width in standard deviations
    #[arg(long)]
    threshold: Option<f64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base name (will create dir containing .csv, .json, and .parquet files)
    #[arg(short, long, default_value = "output")]
    output: String,

    /// Also analyze every city in the dataset and write a combined summary
    #[arg(long, default_value_t = false)]
    all_cities: bool,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,
}

fn main() -> Result<(), DashboardError> {
    let total_start = Instant::now();
    log::set_logger(&LOGGER).map_err(|e| DashboardError::Data(e.to_string()))?;

    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }

    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(unit) = args.unit {
        config.analysis.unit = unit;
    }
    if let Some(window) = args.window {
        config.analysis.window = window;
    }
    if let Some(threshold) = args.threshold {
        config.analysis.threshold = threshold;
    }

    println!("Temperature analysis dashboard");

    let input = PassInput {
        input_file: args.input_file.clone(),
        city: args.city.clone(),
        api_key: args.api_key.clone(),
        month: args.month,
        all_cities: args.all_cities,
    };
    let processing_start = Instant::now();
    let Some(outcome) = run_pass(&config, &input)? else {
        return Ok(());
    };
    let analysis = &outcome.analysis;
    let city = &analysis.city;
    println!(
        "Analyzed {} of {} records in {:.2?}",
        analysis.series.len(),
        outcome.records,
        processing_start.elapsed()
    );

    // Historical section
    println!("\nDescriptive statistics ({})", city);
    print!("{}", render_describe(analysis.summary.as_ref()));
    println!("\nSeasonal statistics ({})", city);
    print!("{}", render_seasonal(&analysis.seasonal));
    let outliers = analysis.series.iter().filter(|r| r.rolling.is_outlier).count();
    println!("\nOutliers outside the rolling band: {}", outliers);

    // Live section
    let report = &outcome.report;
    if input.usable_api_key().is_some() {
        println!("\nCurrent temperature analysis");
        for line in &report.summary_lines {
            println!("{}", line);
        }
        if let Some(message) = &report.weather_error {
            println!("{}", message);
        }
    }

    // Outputs
    let output_dir = PathBuf::from(format!("./output/{}", args.output));
    fs::create_dir_all(&output_dir)?;
    let output_name = args
        .output
        .split(['/', '\\'])
        .next_back()
        .unwrap_or(&args.output);
    let io_start = Instant::now();
    write_city_outputs(analysis, &outcome.chart, report, &output_dir, output_name)?;

    if args.all_cities {
        for other in &outcome.all_cities {
            println!("\nSeasonal statistics ({})", other.city);
            print!("{}", render_seasonal(&other.seasonal));
        }
        let summaries: Vec<DashboardReport> = outcome
            .all_cities
            .iter()
            .map(|a| DashboardReport::historical(a, report.unit))
            .collect();
        write_json(&summaries, &output_dir.join(format!("{}_cities.json", output_name)))?;
    }
    debug!("Output files took {:.2?}", io_start.elapsed());
    println!("\nWrote files to directory: {}", output_dir.display());

    println!("Total runtime: {:.2?}", total_start.elapsed());
    Ok(())
}
