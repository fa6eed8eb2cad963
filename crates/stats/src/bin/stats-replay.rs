//! stats-replay: recompute every statistic for a fixture dataset.
//!
//! Loads a JSON fixture into a [`MemoryStore`], enqueues course statistics
//! for every course and user statistics for every enrolled student, waits
//! for the queue to drain, then prints the stored results as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use gradetrend_core::config::{self, Config};
use gradetrend_core::{CourseStatistics, Fixture, MemoryStore, StatisticsStore, UserCourseStatistics};
use gradetrend_queue::QueueMetricsSnapshot;
use gradetrend_stats::StatisticsService;

// ── CLI ─────────────────────────────────────────────────────────────

/// Replay statistics recomputation over a fixture file.
#[derive(Parser, Debug)]
#[command(name = "stats-replay", version, about)]
struct Cli {
    /// Path to the JSON fixture (courses, assignments, submissions, enrollments).
    #[arg(long, env = "STATS_FIXTURE")]
    fixture: PathBuf,

    /// Override the configured worker count.
    #[arg(long)]
    workers: Option<usize>,

    /// Override the configured queue capacity.
    #[arg(long)]
    capacity: Option<usize>,

    /// Give up waiting for the queue to drain after this many seconds.
    #[arg(long, default_value_t = 30)]
    drain_timeout_secs: u64,
}

#[derive(Serialize)]
struct Report {
    courses: Vec<CourseStatistics>,
    users: Vec<UserCourseStatistics>,
    queue: QueueMetricsSnapshot,
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    config::load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(workers) = cli.workers {
        config.queue.workers = workers;
    }
    if let Some(capacity) = cli.capacity {
        config.queue.capacity = capacity;
    }
    config.log_summary();

    let fixture = Fixture::from_file(&cli.fixture)
        .with_context(|| format!("loading fixture {}", cli.fixture.display()))?;
    let store = Arc::new(MemoryStore::from_fixture(fixture));
    let suggestions = gradetrend_llm::suggestion_generator(&config.llm)
        .context("building suggestion generator")?;

    let service = StatisticsService::from_config(&config, store.clone(), suggestions);
    service.start();

    let mut accepted = 0usize;
    for course_id in store.course_ids().await {
        let course = store.course(course_id).await?;
        match service.enqueue_course_statistics(
            course_id,
            course.teacher_id,
            &replay_email(course.teacher_id),
        ) {
            Ok(()) => accepted += 1,
            Err(e) => warn!(course_id, error = %e, "Course statistics not enqueued"),
        }

        for user_id in store.enrolled_students(course_id).await {
            match service.enqueue_user_course_statistics(course_id, user_id, &replay_email(user_id))
            {
                Ok(()) => accepted += 1,
                Err(e) => warn!(course_id, user_id, error = %e, "User statistics not enqueued"),
            }
        }
    }
    info!(accepted, "Replay tasks enqueued");

    let drain = async {
        while service.outstanding() > 0 {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(cli.drain_timeout_secs), drain)
        .await
        .is_err()
    {
        warn!(
            outstanding = service.outstanding(),
            timeout_secs = cli.drain_timeout_secs,
            "Queue did not drain in time, stopping anyway"
        );
    }
    service.stop().await;

    let report = Report {
        courses: store.all_course_statistics().await,
        users: store.all_user_statistics().await,
        queue: service.metrics(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn replay_email(user_id: i64) -> String {
    format!("user-{user_id}@replay.local")
}
