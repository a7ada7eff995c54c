use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use sales_dashboard::config::{AppConfig, SourceKind};
use sales_dashboard::source::{CustomerSource, FileSource, GeneratedSource, PgSource, SalesSource};
use sales_dashboard::{db, matrix, report};
use sales_dashboard::{AnalysisService, FilterCriteria, SatisfactionTier};

#[derive(Parser)]
#[command(name = "sales-dashboard")]
#[command(about = "Filter and summarize sales and customer records", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./dashboard.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Record source, overriding the configuration
    #[arg(long, global = true, value_enum)]
    source: Option<SourceKind>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load generated mock data into empty tables
    Seed,
    /// Import sales from CSV and/or customers from JSON
    Import {
        #[arg(long)]
        sales: Option<PathBuf>,
        #[arg(long)]
        customers: Option<PathBuf>,
    },
    #[command(flatten)]
    Query(Query),
}

#[derive(Subcommand)]
enum Query {
    /// Available filter values and ranges
    Options,
    /// Sales records matching the filters
    Sales {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Customer records matching the filters
    Customers {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summary metrics
    Metrics {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Chart-ready series
    Chart {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Cross-tab matrix
    Matrix {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = MatrixKind::CategoryRegion)]
        kind: MatrixKind,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MatrixKind {
    CategoryRegion,
    MonthCategory,
    AgeSatisfaction,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// JSON file holding a full filter criteria object; flags below override it
    #[arg(long)]
    criteria: Option<PathBuf>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long = "region")]
    regions: Vec<String>,
    #[arg(long)]
    min_sales: Option<f64>,
    #[arg(long)]
    max_sales: Option<f64>,
    #[arg(long)]
    min_age: Option<i32>,
    #[arg(long)]
    max_age: Option<i32>,
    #[arg(long = "gender")]
    genders: Vec<String>,
    /// high (4-5), medium (3) or low (1-2)
    #[arg(long)]
    satisfaction: Option<SatisfactionTier>,
}

impl FilterArgs {
    fn to_criteria(&self) -> anyhow::Result<FilterCriteria> {
        let mut criteria = match &self.criteria {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read criteria file {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("invalid criteria in {}", path.display()))?
            }
            None => FilterCriteria::default(),
        };

        if self.from.is_some() || self.to.is_some() {
            criteria.date_range = Some((
                self.from.unwrap_or(NaiveDate::MIN),
                self.to.unwrap_or(NaiveDate::MAX),
            ));
        }
        if !self.categories.is_empty() {
            criteria.categories = Some(self.categories.iter().cloned().collect());
        }
        if !self.regions.is_empty() {
            criteria.regions = Some(self.regions.iter().cloned().collect());
        }
        if self.min_sales.is_some() || self.max_sales.is_some() {
            criteria.sales_range = Some((
                self.min_sales.unwrap_or(0.0),
                self.max_sales.unwrap_or(f64::INFINITY),
            ));
        }
        if self.min_age.is_some() || self.max_age.is_some() {
            criteria.age_range = Some((self.min_age.unwrap_or(0), self.max_age.unwrap_or(150)));
        }
        if !self.genders.is_empty() {
            criteria.genders = Some(self.genders.iter().cloned().collect());
        }
        if self.satisfaction.is_some() {
            criteria.satisfaction_tier = self.satisfaction;
        }

        criteria.validate()?;
        Ok(criteria)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

async fn run_query<S, C>(service: &AnalysisService<S, C>, query: Query) -> anyhow::Result<()>
where
    S: SalesSource,
    C: CustomerSource,
{
    match query {
        Query::Options => print_json(&service.filter_options().await?)?,
        Query::Sales { filters, limit } => {
            let mut sales = service.filtered_sales(&filters.to_criteria()?).await?;
            if let Some(limit) = limit {
                sales.truncate(limit);
            }
            print_json(&sales)?;
        }
        Query::Customers { filters, limit } => {
            let mut customers = service.filtered_customers(&filters.to_criteria()?).await?;
            if let Some(limit) = limit {
                customers.truncate(limit);
            }
            print_json(&customers)?;
        }
        Query::Metrics { filters } => {
            print_json(&service.metrics(&filters.to_criteria()?).await?)?;
        }
        Query::Chart { filters } => {
            print_json(&service.chart_data(&filters.to_criteria()?).await?)?;
        }
        Query::Matrix { filters, kind } => {
            let criteria = filters.to_criteria()?;
            let table = match kind {
                MatrixKind::CategoryRegion => {
                    matrix::category_region(&service.filtered_sales(&criteria).await?)
                }
                MatrixKind::MonthCategory => {
                    matrix::month_category(&service.filtered_sales(&criteria).await?)
                }
                MatrixKind::AgeSatisfaction => {
                    matrix::age_satisfaction(&service.filtered_customers(&criteria).await?)
                }
            };
            print_json(&table)?;
        }
        Query::Report { filters, out } => {
            let criteria = filters.to_criteria()?;
            let snapshot = service.snapshot(&criteria).await?;
            let report = report::build_report(&criteria, &snapshot);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(
                sales = snapshot.sales.len(),
                customers = snapshot.customers.len(),
                "Report written to {}.",
                out.display()
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config.source = source;
    }
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            info!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            let summary = db::seed(&pool, &config.generator).await?;
            info!(
                sales = summary.sales,
                customers = summary.customers,
                "Seed data inserted."
            );
        }
        Commands::Import { sales, customers } => {
            if sales.is_none() && customers.is_none() {
                anyhow::bail!("nothing to import: pass --sales and/or --customers");
            }
            let pool = connect(&config).await?;
            if let Some(path) = sales {
                let inserted = db::import_sales_csv(&pool, &path).await?;
                info!("Inserted {inserted} sales records from {}.", path.display());
            }
            if let Some(path) = customers {
                let inserted = db::import_customers_json(&pool, &path).await?;
                info!("Inserted {inserted} customers from {}.", path.display());
            }
        }
        Commands::Query(query) => match config.source {
            SourceKind::Generated => {
                let source = GeneratedSource::new(&config.generator)?;
                run_query(&AnalysisService::new(source.clone(), source), query).await?;
            }
            SourceKind::Files => {
                let source =
                    FileSource::new(&config.files.sales_csv, &config.files.customers_json);
                run_query(&AnalysisService::new(source.clone(), source), query).await?;
            }
            SourceKind::Postgres => {
                let source = PgSource::new(connect(&config).await?);
                run_query(&AnalysisService::new(source.clone(), source), query).await?;
            }
        },
    }

    Ok(())
}
