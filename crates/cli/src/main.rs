//! sitegate CLI - construction schedule and quality-gate tool.

mod logging;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use sitegate_core::{
    AlertId, AlertStatus, ChecklistItemId, Date, Priority, ProjectId, QaAlert, SitegateConfig,
    Task, TaskId, TaskPatch, TaskStatus,
};
use sitegate_schedule::RemovalMode;
use sitegate_storage::JsonStorage;
use sitegate_work::{ProjectCoordinator, TimelineRequest};
use tracing::debug;

#[derive(Parser)]
#[command(name = "sitegate")]
#[command(about = "Construction schedule and quality-gate tool", long_about = None)]
struct Cli {
    /// Project to operate on
    #[arg(long, global = true, env = "SITEGATE_PROJECT")]
    project: Option<ProjectId>,

    /// Configuration file
    #[arg(long, global = true, default_value = ".sitegate/config.json")]
    config: PathBuf,

    /// Log filter (e.g. "debug", "sitegate_quality=trace")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh project id
    Init,
    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Show the Gantt layout
    Timeline {
        /// First visible day
        #[arg(long)]
        from: Option<Date>,
        /// Visible days
        #[arg(long)]
        days: Option<u32>,
        /// Pixels per day
        #[arg(long)]
        zoom: Option<f64>,
        /// Print the raw layout as JSON
        #[arg(long)]
        json: bool,
    },
    /// Quality alerts
    #[command(subcommand)]
    Qa(QaCommand),
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task
    Add(AddTask),
    /// List tasks in dependency order
    List,
    /// Update fields of a task
    Update(UpdateTask),
    /// Shift a task by a number of days, cascading to dependents
    Move {
        /// Task id
        id: TaskId,
        /// Days to shift (negative moves earlier)
        #[arg(allow_negative_numbers = true)]
        days: i64,
        /// Show the proposal without applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove a task
    Remove {
        /// Task id
        id: TaskId,
        /// Drop the reference from dependents instead of refusing
        #[arg(long)]
        detach: bool,
    },
}

#[derive(Args)]
struct AddTask {
    /// Task title
    title: String,
    /// Trade category (Concrete, Steel, Foundation, ...)
    #[arg(long, default_value = "General")]
    category: String,
    /// Start day (YYYY-MM-DD)
    #[arg(long)]
    start: Date,
    /// End day (YYYY-MM-DD)
    #[arg(long)]
    end: Date,
    /// Prerequisite task; repeatable
    #[arg(long = "after")]
    after: Vec<TaskId>,
    #[arg(long, default_value = "medium")]
    priority: Priority,
    #[arg(long)]
    assignee: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args)]
struct UpdateTask {
    /// Task id
    id: TaskId,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    status: Option<TaskStatus>,
    #[arg(long)]
    progress: Option<u8>,
    #[arg(long)]
    start: Option<Date>,
    #[arg(long)]
    end: Option<Date>,
    #[arg(long)]
    priority: Option<Priority>,
    /// Replace prerequisites; repeatable
    #[arg(long = "after", conflicts_with = "clear_deps")]
    after: Vec<TaskId>,
    /// Remove every prerequisite
    #[arg(long)]
    clear_deps: bool,
    #[arg(long)]
    assignee: Option<String>,
}

#[derive(Subcommand)]
enum QaCommand {
    /// Raise alerts for tasks starting soon
    Scan,
    /// List alerts
    List {
        /// Include completed alerts
        #[arg(long)]
        all: bool,
    },
    /// Complete a checklist item
    Complete {
        alert: AlertId,
        item: ChecklistItemId,
        /// Who did the check
        #[arg(long)]
        by: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Override an alert's status
    Status {
        alert: AlertId,
        status: AlertStatus,
        #[arg(long)]
        by: Option<String>,
    },
    /// Delete an alert
    Delete { alert: AlertId },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref())?;

    if let Commands::Init = cli.command {
        println!("{}", ProjectId::new());
        return Ok(());
    }

    let config = load_config(&cli.config).await?;
    let Some(project) = cli.project else {
        bail!("no project selected; pass --project or set SITEGATE_PROJECT (see `sitegate init`)");
    };

    let storage = JsonStorage::new(&config.storage_dir)
        .await
        .with_context(|| format!("opening storage at {}", config.storage_dir.display()))?;
    let mut coord = ProjectCoordinator::open(project, storage, config).await?;

    match cli.command {
        Commands::Init => {}
        Commands::Task(cmd) => run_task(&mut coord, project, cmd).await?,
        Commands::Timeline { from, days, zoom, json } => {
            let layout = coord.timeline(&TimelineRequest { from, days, pixels_per_day: zoom });
            if json {
                println!("{}", serde_json::to_string_pretty(&layout)?);
            } else {
                for rect in &layout.rows {
                    let title = coord.graph().get(rect.task_id).map_or("?", |t| t.title.as_str());
                    println!(
                        "{:>3} | x={:>7.1} w={:>6.1} {} | {}",
                        rect.row,
                        rect.x,
                        rect.width,
                        if rect.in_window { " " } else { "~" },
                        title
                    );
                }
                println!("{} rows, {} arrows, {:.0}x{:.0}px", layout.rows.len(), layout.arrows.len(), layout.width, layout.height);
            }
        }
        Commands::Qa(cmd) => run_qa(&mut coord, cmd).await?,
    }

    Ok(())
}

async fn run_task(
    coord: &mut ProjectCoordinator<JsonStorage>,
    project: ProjectId,
    cmd: TaskCommand,
) -> Result<()> {
    match cmd {
        TaskCommand::Add(args) => {
            let mut task = Task::new(project, args.title, args.category, args.start, args.end)
                .with_dependencies(args.after)
                .with_priority(args.priority);
            task.assignee = args.assignee;
            task.description = args.description.unwrap_or_default();

            let outcome = coord.add_task(task).await?;
            println!("Added task: {} - {}", outcome.value.id, outcome.value.title);
            print_raised(&outcome.raised);
        }
        TaskCommand::List => {
            let order = coord.graph().topological_order()?;
            println!("Tasks ({})", order.len());
            for id in order {
                if let Some(task) = coord.graph().get(id) {
                    print_task(task);
                }
            }
        }
        TaskCommand::Update(args) => {
            let dependencies = if args.clear_deps {
                Some(Vec::new())
            } else if args.after.is_empty() {
                None
            } else {
                Some(args.after)
            };
            let patch = TaskPatch {
                title: args.title,
                status: args.status,
                progress_percentage: args.progress,
                start_date: args.start,
                end_date: args.end,
                priority: args.priority,
                dependencies,
                assignee: args.assignee.map(|a| Some(a).filter(|a| !a.trim().is_empty())),
                ..Default::default()
            };
            let outcome = coord.update_task(args.id, &patch).await?;
            print_task(&outcome.value);
            print_raised(&outcome.raised);
        }
        TaskCommand::Move { id, days, dry_run } => {
            if dry_run {
                let proposal = coord.propose_move(id, days)?;
                for (task_id, update) in &proposal.updates {
                    println!("  {task_id} -> {} .. {}", update.start_date, update.end_date);
                }
                return Ok(());
            }
            let outcome = coord.move_task(id, days).await?;
            println!("Moved {} task(s)", outcome.value.len());
            for task in &outcome.value {
                print_task(task);
            }
            print_raised(&outcome.raised);
        }
        TaskCommand::Remove { id, detach } => {
            let mode = if detach { RemovalMode::DetachDependents } else { RemovalMode::Strict };
            let removal = coord.remove_task(id, mode).await?;
            println!("Removed task: {} - {}", removal.removed.id, removal.removed.title);
            for task in &removal.detached {
                println!("  detached {}", task.id);
            }
        }
    }
    Ok(())
}

async fn run_qa(coord: &mut ProjectCoordinator<JsonStorage>, cmd: QaCommand) -> Result<()> {
    match cmd {
        QaCommand::Scan => {
            let raised = coord.scan_schedule().await?;
            println!("Scan raised {} alert(s)", raised.len());
            print_raised(&raised);
        }
        QaCommand::List { all } => {
            let alerts = coord.alerts().await?;
            let shown: Vec<&QaAlert> = alerts
                .iter()
                .filter(|a| all || a.status != AlertStatus::Completed)
                .collect();
            println!("Alerts ({})", shown.len());
            for alert in shown {
                print_alert(alert);
            }
        }
        QaCommand::Complete { alert, item, by, notes } => {
            let (alert, outcome) = coord.complete_checklist_item(alert, item, &by, notes).await?;
            debug!(?outcome, "Checklist item recorded");
            print_alert(&alert);
        }
        QaCommand::Status { alert, status, by } => {
            let alert = coord.set_alert_status(alert, status, by).await?;
            print_alert(&alert);
        }
        QaCommand::Delete { alert } => {
            coord.delete_alert(alert).await?;
            println!("Deleted alert {alert}");
        }
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<SitegateConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => SitegateConfig::from_json(&text)
            .with_context(|| format!("parsing {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SitegateConfig::default()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn print_task(task: &Task) {
    println!(
        "  {} | {:<11} | {} .. {} | {:>3}% | {} ({})",
        task.id,
        task.status,
        task.start_date,
        task.end_date,
        task.progress_percentage,
        task.title,
        task.category,
    );
}

fn print_alert(alert: &QaAlert) {
    let (done, total) = alert.completion_ratio();
    println!(
        "  {} | {:<11} | {:<8} | due {} | {}/{} | {}",
        alert.id, alert.status, alert.priority, alert.due_date, done, total, alert.title
    );
    for item in &alert.checklist {
        println!(
            "      [{}] {} {}{}",
            if item.completed { "x" } else { " " },
            item.id,
            item.text,
            if item.required { "" } else { " (optional)" }
        );
    }
}

fn print_raised(alerts: &[QaAlert]) {
    for alert in alerts {
        println!("  QA alert raised: {} ({})", alert.title, alert.rule_type);
    }
}
