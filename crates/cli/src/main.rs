//! jobq CLI - command-line surface described in SPEC_FULL §6.2.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tabled::{Table, Tabled};

use jobq_core::application::{EnqueueSpec, QueueService, WorkerManager};
use jobq_core::domain::Job;
use jobq_core::port::{IdProvider, UuidProvider};
use jobq_infra_sqlite::{create_pool, run_migrations, SqliteConfig, SqliteJobRepository, SqliteWorkerRegistry};
use jobq_infra_system::{SubprocessExecutor, SystemClock};
use jobq_sdk::{EnqueueRequest, JobqClient};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:7878";
const DEFAULT_DB_PATH: &str = "sqlite://data/queue.sqlite";

#[derive(Parser)]
#[command(name = "jobq")]
#[command(about = "Command-line client for the job queue daemon", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Daemon RPC endpoint.
    #[arg(long, env = "JOBQ_RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    rpc_url: String,

    /// Database file, used by `worker start` and `enqueue --local`.
    #[arg(long, env = "JOBQ_DB_PATH", default_value = DEFAULT_DB_PATH, global = true)]
    db_path: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue a job from a JSON spec (SPEC_FULL §6.1).
    Enqueue {
        /// `{"command": "...", "max_retries"?, "priority"?, "run_at"?, "id"?}`
        json: String,

        /// Write directly to the database file instead of calling the daemon.
        #[arg(long)]
        local: bool,
    },

    /// Start N in-process workers against the database file directly.
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },

    /// Print the job state histogram.
    Status,

    /// List jobs, optionally filtered by state.
    List {
        #[arg(long)]
        state: Option<String>,
    },

    /// Dead-letter queue administration.
    Dlq {
        #[command(subcommand)]
        action: DlqAction,
    },

    /// Show a job's metadata and log lines.
    Logs { job_id: String },

    /// Print aggregate execution metrics.
    Metrics,

    /// Read or write a durable config key.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum WorkerAction {
    /// Run N workers until SIGINT, then drain and exit.
    Start {
        #[arg(short = 'c', long, default_value = "1")]
        count: usize,
    },
}

#[derive(Subcommand)]
enum DlqAction {
    List,
    /// Retry one dead job by id, or every dead job if omitted.
    Retry { id: Option<String> },
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    Get { key: String },
    Set { key: String, value: String },
}

#[derive(Tabled)]
struct JobRow {
    id: String,
    state: String,
    attempts: i64,
    priority: i32,
    updated_at: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            state: job.state.to_string(),
            attempts: job.attempts,
            priority: job.priority,
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("{}", "no jobs".yellow());
        return;
    }
    let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
    println!("{}", Table::new(rows));
}

async fn local_queue_service(db_path: &str) -> Result<Arc<QueueService>> {
    let pool = create_pool(db_path)
        .await
        .map_err(|e| anyhow::anyhow!("db pool creation failed: {e}"))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("migration failed: {e}"))?;

    let repo = Arc::new(SqliteJobRepository::new(pool.clone()));
    let config: Arc<dyn jobq_core::port::Config> = Arc::new(SqliteConfig::new(pool));
    let clock: Arc<dyn jobq_core::port::Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdProvider> = Arc::new(UuidProvider);
    Ok(Arc::new(QueueService::new(repo, config, clock, ids)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Enqueue { json, local } => {
            let spec: EnqueueSpecJson =
                serde_json::from_str(&json).context("invalid job JSON")?;

            let id = if local {
                let queue = local_queue_service(&cli.db_path).await?;
                queue
                    .enqueue(EnqueueSpec {
                        id: spec.id,
                        command: spec.command,
                        max_retries: spec.max_retries,
                        priority: spec.priority,
                        run_at: spec.run_at,
                    })
                    .await?
            } else {
                let client = JobqClient::connect(&cli.rpc_url).await?;
                client
                    .enqueue(EnqueueRequest {
                        id: spec.id,
                        command: spec.command,
                        max_retries: spec.max_retries,
                        priority: spec.priority,
                        run_at: spec.run_at,
                    })
                    .await?
                    .id
            };

            println!("{}", id);
        }

        Commands::Worker {
            action: WorkerAction::Start { count },
        } => {
            let queue = local_queue_service(&cli.db_path).await?;
            let pool = create_pool(&cli.db_path)
                .await
                .map_err(|e| anyhow::anyhow!("db pool creation failed: {e}"))?;
            let registry = Arc::new(SqliteWorkerRegistry::new(pool));
            let executor = Arc::new(SubprocessExecutor::new());
            let clock: Arc<dyn jobq_core::port::Clock> = Arc::new(SystemClock);

            let manager = WorkerManager::new(queue, executor, clock, registry);
            manager.start(count).await?;
            println!("{}", format!("{count} worker(s) started, press Ctrl+C to stop").green());

            tokio::signal::ctrl_c().await?;
            println!("shutting down...");
            manager.stop().await;
        }

        Commands::Status => {
            let client = JobqClient::connect(&cli.rpc_url).await?;
            let status = client.status().await?;
            println!("{}", "Queue status".cyan().bold());
            println!("  scheduled:     {}", status.scheduled);
            println!("  pending:       {} ({} ready)", status.pending, status.ready_pending);
            println!("  processing:    {}", status.processing);
            println!("  waiting:       {}", status.waiting);
            println!("  completed:     {}", status.completed);
            println!("  dead:          {}", status.dead);
        }

        Commands::List { state } => {
            let client = JobqClient::connect(&cli.rpc_url).await?;
            let response = client.list(state).await?;
            print_jobs(&response.jobs);
        }

        Commands::Dlq { action } => {
            let client = JobqClient::connect(&cli.rpc_url).await?;
            match action {
                DlqAction::List => {
                    let response = client.dlq_list().await?;
                    print_jobs(&response.jobs);
                }
                DlqAction::Retry { id } => {
                    let response = client.dlq_retry(id).await?;
                    println!("{}", format!("{} job(s) requeued", response.count).green());
                }
                DlqAction::Clear => {
                    let response = client.dlq_clear().await?;
                    println!("{}", format!("{} dead job(s) cleared", response.count).green());
                }
            }
        }

        Commands::Logs { job_id } => {
            let client = JobqClient::connect(&cli.rpc_url).await?;
            let response = client.logs(job_id).await?;
            println!("{}", format!("job {}", response.job.id).cyan().bold());
            println!("  state: {}  attempts: {}", response.job.state, response.job.attempts);
            if let Some(err) = &response.job.last_error {
                println!("  last_error: {err}");
            }
            println!();
            for line in &response.logs {
                println!("[{}] {}", line.recorded_at, line.message);
            }
        }

        Commands::Metrics => {
            let client = JobqClient::connect(&cli.rpc_url).await?;
            let metrics = client.metrics().await?;
            println!("{}", "Execution metrics".cyan().bold());
            println!("  total executions: {}", metrics.total_executions);
            println!("  succeeded:        {}", metrics.succeeded);
            println!("  failed:           {}", metrics.failed);
            println!("  avg duration:     {:.3}s", metrics.avg_duration_secs);
            println!("  max duration:     {:.3}s", metrics.max_duration_secs);
        }

        Commands::Config { action } => {
            let client = JobqClient::connect(&cli.rpc_url).await?;
            match action {
                ConfigAction::Get { key } => {
                    let response = client.config_get(&key).await?;
                    match response.value {
                        Some(v) => println!("{v}"),
                        None => println!("{}", "(unset)".yellow()),
                    }
                }
                ConfigAction::Set { key, value } => {
                    client.config_set(&key, &value).await?;
                    println!("{}", format!("{key} = {value}").green());
                }
            }
        }
    }

    Ok(())
}

/// A `Job` spec supplied on the `enqueue` command line, per SPEC_FULL §6.1.
#[derive(serde::Deserialize)]
struct EnqueueSpecJson {
    id: Option<String>,
    command: String,
    max_retries: Option<i64>,
    priority: Option<i32>,
    run_at: Option<String>,
}
