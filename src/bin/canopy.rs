use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use canopy_watch::api::{AnalysisPoll, ApiClient};
use canopy_watch::chart::render_timeseries_rgba;
use canopy_watch::classify::{DEFAULT_ALERT_THRESHOLD, DatasetStats, HealthCategory, alerts, classify_point};
use canopy_watch::config::AppConfig;
use canopy_watch::form::FormController;
use canopy_watch::form::preview::load_preview;
use canopy_watch::lifecycle::{LifecycleEffect, TrackingStatus, track};
use canopy_watch::model::{CitizenReport, Coordinates};
use canopy_watch::spatial::build_neighbors;

#[derive(Parser, Debug)]
#[command(
    name = "canopy",
    about = "Query vegetation-health data and file citizen reports",
    version
)]
struct Cli {
    /// Base URL of the monitoring API
    #[arg(long = "api-url", env = "CANOPY_API_URL", global = true)]
    api_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List monitored points with their health category
    Points {
        /// Only show points in this category (e.g. "critical-decrease")
        #[arg(long)]
        category: Option<String>,
    },
    /// Points whose NDVI dropped below a threshold
    Alerts {
        #[arg(long, default_value_t = DEFAULT_ALERT_THRESHOLD, allow_negative_numbers = true)]
        threshold: f64,
    },
    /// Points ordered by distance from one point
    Neighbors {
        point_id: String,
        /// Show at most this many entries
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// All citizen reports
    Reports,
    /// Report history of one tree, newest first
    History { tree_id: String },
    /// File a report and wait for its analysis
    Submit {
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
        /// Follow up on an existing tree instead of giving a location
        #[arg(long = "tree-id")]
        tree_id: Option<String>,
        #[arg(long, default_value_t = 3)]
        severity: u8,
        #[arg(long = "report-type")]
        report_type: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Photo to attach
        #[arg(long)]
        image: Option<PathBuf>,
        /// Return right after the backend accepts the report
        #[arg(long = "no-wait")]
        no_wait: bool,
    },
    /// Fetch the analysis result of a report once
    Result { report_id: String },
    /// Parks available for the time-series view
    Parks,
    /// Render a park's NDVI/NDRE/PSRI time series to a PNG
    Chart {
        park_id: String,
        #[arg(short, long, default_value = "timeseries.png")]
        out: PathBuf,
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 320)]
        height: u32,
    },
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.3}")).unwrap_or_else(|| "--".to_string())
}

fn print_report(report: &CitizenReport) {
    println!(
        "{:<12} {:<19} {:<10} sev {}  tree {}  {}",
        report.id,
        report.timestamp.as_deref().unwrap_or("-"),
        report.status.label(),
        report.severity,
        report.tree_id.as_deref().unwrap_or("-"),
        report.ai_prediction.as_deref().unwrap_or(""),
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    canopy_watch::init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.api_url {
        config = config.with_api_base(url);
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout = Duration::from_secs(secs.max(1));
    }
    let api = ApiClient::new(&config)?;

    match cli.command {
        Command::Points { category } => {
            let decoded = api.ndvi_points().await?;
            let wanted = match category.as_deref() {
                Some(raw) => Some(
                    HealthCategory::ALL
                        .into_iter()
                        .find(|c| c.label().eq_ignore_ascii_case(raw))
                        .ok_or_else(|| format!("unknown category {raw:?}"))?,
                ),
                None => None,
            };
            for point in &decoded.items {
                let class = classify_point(point);
                if wanted.is_some_and(|w| w != class.category) {
                    continue;
                }
                println!(
                    "{:<12} {:<20} ndvi {:>7} prev {:>7} delta {:>7}  {}",
                    point.id,
                    point.species.as_deref().unwrap_or("-"),
                    opt(point.ndvi_current),
                    opt(point.ndvi_previous_year),
                    opt(point.ndvi_delta),
                    class.category.label(),
                );
            }
            let stats = DatasetStats::from_points(&decoded.items);
            println!(
                "\n{} points, {} with data, {} skipped; increase {} stable {} decrease {} (critical {}) no data {}",
                stats.total_points,
                stats.processed_points,
                decoded.skipped,
                stats.increase_count,
                stats.stable_count,
                stats.decrease_count,
                stats.critical_count,
                stats.no_data_count,
            );
            if let Some(mean) = stats.mean_delta {
                println!("mean delta {mean:+.4}");
            }
        }
        Command::Alerts { threshold } => {
            let decoded = api.ndvi_points().await?;
            let list = alerts(&decoded.items, threshold);
            if list.is_empty() {
                println!("No points below {threshold}");
            }
            for alert in list {
                println!(
                    "{:<12} {:<20} {:+.3}  {:?}",
                    alert.point_id,
                    alert.species.as_deref().unwrap_or("-"),
                    alert.ndvi_delta,
                    alert.severity,
                );
            }
        }
        Command::Neighbors { point_id, limit } => {
            let dataset: Vec<Arc<_>> = api.ndvi_points().await?.items.into_iter().map(Arc::new).collect();
            let reference = dataset
                .iter()
                .find(|p| p.id == point_id)
                .cloned()
                .ok_or_else(|| format!("no point with id {point_id}"))?;
            let state = build_neighbors(&dataset, &reference);
            for (i, neighbor) in state.neighbors().iter().take(limit).enumerate() {
                println!(
                    "{i:>3}  {:<12} {:.6} deg  {}",
                    neighbor.point.id,
                    neighbor.distance,
                    classify_point(&neighbor.point).category.label()
                );
            }
        }
        Command::Reports => {
            let decoded = api.citizen_reports().await?;
            for report in &decoded.items {
                print_report(report);
            }
            if decoded.skipped > 0 {
                eprintln!("{} malformed reports skipped", decoded.skipped);
            }
        }
        Command::History { tree_id } => {
            let reports = api.tree_reports(&tree_id).await?;
            if reports.is_empty() {
                println!("No reports for tree {tree_id}");
            }
            for report in &reports {
                print_report(report);
            }
        }
        Command::Submit {
            lat,
            lon,
            tree_id,
            severity,
            report_type,
            description,
            image,
            no_wait,
        } => {
            let mut form = FormController::new(config.map_center);
            if let Some(tree_id) = tree_id {
                form.start_follow_up(tree_id);
            }
            if let (Some(lat), Some(lon)) = (lat, lon) {
                form.apply_device_location(Ok(Coordinates::new(lat, lon)));
            }
            form.set_severity(severity);
            if let Some(report_type) = report_type {
                form.set_report_type(report_type);
            }
            form.set_description(description);
            if let Some(path) = image {
                let preview = load_preview(path).await?;
                println!("Attaching {}", preview.caption());
                form.attach_preview(preview);
            }

            let submission = form.begin_submit()?;
            let ack = match api.submit(&submission).await {
                Ok(ack) => ack,
                Err(err) => {
                    form.submit_failed(&err);
                    return Err(err.into());
                }
            };
            let mut lifecycle = form.submit_succeeded(&submission, ack, config.retry);
            println!("Report {} submitted", lifecycle.report_id());
            if let Some(eta) = lifecycle.estimated_analysis_time() {
                println!("Estimated analysis time: {eta}");
            }
            if no_wait {
                return Ok(());
            }

            for effect in track(&mut lifecycle, &api).await {
                match effect {
                    LifecycleEffect::ShowSummary(summary) => println!("\n{summary}"),
                    LifecycleEffect::ShowStillAnalyzing => println!(
                        "Still analyzing after {} polls; check later with `result {}`",
                        lifecycle.attempts(),
                        lifecycle.report_id()
                    ),
                    LifecycleEffect::RefreshReportLayer | LifecycleEffect::RefreshHistory(_) => {}
                }
            }
            if lifecycle.status() == TrackingStatus::TimedOut {
                std::process::exit(2);
            }
        }
        Command::Result { report_id } => match api.analysis_result(&report_id).await? {
            AnalysisPoll::Complete(result) => print!("{}", result.summary()),
            AnalysisPoll::Pending => println!("Report {report_id} is still being analyzed"),
        },
        Command::Parks => {
            let decoded = api.parks().await?;
            for park in &decoded.items {
                println!("{:<12} {:<30} {}", park.id, park.name, park.centroid);
            }
        }
        Command::Chart {
            park_id,
            out,
            width,
            height,
        } => {
            let samples = api.timeseries(&park_id).await?;
            if samples.is_empty() {
                return Err(format!("no time series for park {park_id}").into());
            }
            let pixels = render_timeseries_rgba(width, height, &samples)?;
            let rgba = image::RgbaImage::from_raw(width, height, pixels)
                .ok_or_else(|| format!("failed to build {width}x{height} image"))?;
            rgba.save(&out)?;
            println!("Wrote {} ({} samples)", out.display(), samples.len());
        }
    }

    Ok(())
}
