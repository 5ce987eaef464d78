use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod anomaly;
mod cost;
mod filter;
mod forecast;
mod loader;
mod metrics;
mod models;
mod notify;
mod report;

use cost::CostModel;
use filter::{CategorySelection, CourseFilter};
use models::{DerivedCourse, Metric};

#[derive(Parser)]
#[command(name = "course-insights")]
#[command(
    about = "Portfolio metrics, forecasts and anomaly alerts for e-learning courses",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print KPI figures, quadrant counts and the subject breakdown
    Summary {
        #[command(flatten)]
        table: CourseArgs,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown portfolio report
    Report {
        #[command(flatten)]
        table: CourseArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List the courses available in a monthly series file
    Courses {
        #[arg(long)]
        series: PathBuf,
    },
    /// Fit a trend, forecast ahead and explain the latest anomaly for one course
    Forecast {
        #[command(flatten)]
        query: SeriesArgs,
        #[arg(long, default_value_t = forecast::DEFAULT_HORIZON)]
        horizon: usize,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Send a webhook alert when the latest month of a course is anomalous
    Alert {
        #[command(flatten)]
        query: SeriesArgs,
        #[arg(long, env = "ALERT_WEBHOOK_URL", hide_env_values = true)]
        webhook_url: Option<String>,
    },
}

#[derive(Args)]
struct CourseArgs {
    #[arg(long)]
    courses: PathBuf,
    #[arg(long)]
    price_min: Option<f64>,
    #[arg(long)]
    price_max: Option<f64>,
    #[arg(long)]
    satisfaction_min: Option<f64>,
    #[arg(long)]
    satisfaction_max: Option<f64>,
    /// Restrict to one subject; "All" or absent means every subject
    #[arg(long)]
    category: Option<String>,
    /// Drop a subject at load time (repeatable)
    #[arg(long)]
    exclude_subject: Vec<String>,
    #[arg(long, value_enum, default_value_t = CostSource::Supplied)]
    cost: CostSource,
    #[arg(long, default_value_t = 0.625)]
    cost_ratio: f64,
    #[arg(long, default_value_t = CostModel::DEFAULT_SEED)]
    cost_seed: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum CostSource {
    /// program_cost column
    Supplied,
    /// fixed share of revenue
    Ratio,
    /// seeded random share of revenue
    Seeded,
}

#[derive(Args)]
struct SeriesArgs {
    #[arg(long)]
    series: PathBuf,
    #[arg(long)]
    course: String,
    #[arg(long, value_enum, default_value_t = Metric::Revenue)]
    metric: Metric,
}

impl CourseArgs {
    fn cost_model(&self) -> CostModel {
        match self.cost {
            CostSource::Supplied => CostModel::Supplied,
            CostSource::Ratio => CostModel::Ratio(self.cost_ratio),
            CostSource::Seeded => CostModel::seeded(self.cost_seed),
        }
    }

    /// Observed ranges of the table unless overridden.
    fn filter(&self, rows: &[DerivedCourse]) -> CourseFilter {
        let observed = CourseFilter::spanning(rows);
        CourseFilter {
            price: self.price_min.unwrap_or(*observed.price.start())
                ..=self.price_max.unwrap_or(*observed.price.end()),
            satisfaction: self
                .satisfaction_min
                .unwrap_or(*observed.satisfaction.start())
                ..=self
                    .satisfaction_max
                    .unwrap_or(*observed.satisfaction.end()),
            category: CategorySelection::from_arg(self.category.clone()),
        }
    }

    /// Loads and derives the full table, then filters it. Ranks stay relative to the full table.
    fn load(&self) -> anyhow::Result<(CourseFilter, CostModel, Vec<DerivedCourse>)> {
        let courses = loader::load_courses(&self.courses, &self.exclude_subject)
            .context("failed to load course table")?;
        let cost_model = self.cost_model();
        let derived = metrics::derive(&courses, &cost_model);
        let filter = self.filter(&derived);
        let rows = filter.apply(&derived);
        Ok((filter, cost_model, rows))
    }
}

impl SeriesArgs {
    fn load(&self) -> anyhow::Result<Vec<(chrono::NaiveDate, f64)>> {
        let points = loader::load_series(&self.series).context("failed to load monthly series")?;
        let series = loader::series_for(&points, &self.course, self.metric);
        if series.is_empty() {
            anyhow::bail!(
                "no monthly data for course '{}' in {}",
                self.course,
                self.series.display()
            );
        }
        Ok(series)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session = Uuid::new_v4();
    run(cli)
        .instrument(tracing::info_span!("session", id = %session))
        .await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Summary { table, json } => {
            let (filter, cost_model, rows) = table.load()?;
            let kpis = metrics::kpis(&rows);
            let quadrants = metrics::quadrants(&rows);
            let subjects = metrics::by_subject(&rows);

            if json {
                let value = serde_json::json!({
                    "kpis": kpis,
                    "quadrants": quadrants,
                    "subjects": subjects,
                    "roi_authoritative": cost_model.is_authoritative(),
                    "courses": rows,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }

            if rows.is_empty() {
                println!("No courses match this filter.");
                return Ok(());
            }

            tracing::debug!(?filter, "summary view");
            println!("Total revenue: {}", report::format_currency(kpis.total_revenue));
            println!(
                "Participants: {}",
                report::format_number(kpis.total_participants as f64, 0)
            );
            println!(
                "Avg. satisfaction: {}/5",
                report::format_optional(kpis.avg_satisfaction, 2)
            );
            println!(
                "Engagement index: {}",
                report::format_optional(kpis.avg_engagement_index, 2)
            );
            println!("Avg. ROI: {}", report::format_optional(kpis.avg_roi, 2));
            if !cost_model.is_authoritative() {
                println!("  (ROI not authoritative: program cost {})", cost_model.describe());
            }
            println!(
                "Quadrants over {} courses: high/high {}, high/low {}, low/high {}, low/low {}",
                quadrants.total(),
                quadrants.high_revenue_high_satisfaction,
                quadrants.high_revenue_low_satisfaction,
                quadrants.low_revenue_high_satisfaction,
                quadrants.low_revenue_low_satisfaction
            );
            println!("Subjects:");
            for subject in subjects {
                println!(
                    "- {}: {} across {} courses (avg satisfaction {:.2})",
                    subject.subject,
                    report::format_currency(subject.total_revenue),
                    subject.course_count,
                    subject.avg_satisfaction
                );
            }
        }
        Commands::Report { table, out } => {
            let (filter, cost_model, rows) = table.load()?;
            let report = report::build_dashboard_report(&filter, &cost_model, &rows);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Courses { series } => {
            let points = loader::load_series(&series).context("failed to load monthly series")?;
            for name in loader::course_names(&points) {
                println!("{name}");
            }
        }
        Commands::Forecast {
            query,
            horizon,
            out,
        } => {
            let series = query.load()?;
            let report =
                report::build_forecast_report(&query.course, query.metric, &series, horizon);
            match out {
                Some(out) => {
                    std::fs::write(&out, report)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("Forecast written to {}.", out.display());
                }
                None => print!("{report}"),
            }
        }
        Commands::Alert { query, webhook_url } => {
            let series = query.load()?;
            let scan = anomaly::detect(&series);
            let Some(latest) = anomaly::latest_anomaly(&scan) else {
                println!("No anomaly in the latest month; alert not sent.");
                return Ok(());
            };

            let url = webhook_url
                .filter(|url| !url.trim().is_empty())
                .context("ALERT_WEBHOOK_URL or --webhook-url must be set to send alerts")?;
            let text = report::alert_message(&query.course, query.metric, &latest);
            match notify::WebhookNotifier::new(url).send(&text).await {
                Ok(()) => println!("Alert sent for {}.", query.course),
                Err(err) => {
                    tracing::error!(error = %err, course = %query.course, "alert delivery failed");
                    println!("Alert not delivered: {err}");
                }
            }
        }
    }

    Ok(())
}
