use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ponto::admin::{self, Assignment, NewClient};
use ponto::catalog::Catalog;
use ponto::config::AppConfig;
use ponto::dates::{MonthWindow, parse_date};
use ponto::duration::{effective_minutes, format_minutes};
use ponto::grouping::Timesheet;
use ponto::models::{EntityStatus, TimeRecord};
use ponto::persistence::Repository;
use ponto::rollups::MonthSummary;
use ponto::storage::JsonDirStore;
use ponto::{Session, SessionUser, Submitted};

#[derive(Parser)]
#[command(name = "ponto")]
#[command(about = "Monthly timesheets: review, add, edit and bulk edit time records")]
struct Cli {
    /// Directory holding the JSON collections.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    namespace: Option<String>,
    /// Employee whose timesheet is opened.
    #[arg(long, global = true)]
    employee: Option<String>,
    #[arg(long, global = true, default_value_t = false)]
    admin: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Day-by-day view of one month, most recent day first.
    Timesheet {
        #[command(flatten)]
        month: MonthArgs,
        #[arg(long, default_value_t = false)]
        hide_empty: bool,
    },
    Summary {
        #[command(flatten)]
        month: MonthArgs,
    },
    /// Add a record on a given day.
    Add {
        #[arg(long)]
        date: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        custom_role: Option<String>,
    },
    /// Edit one record; omitted fields keep their current value.
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        custom_role: Option<String>,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Apply the same overrides to every selected day.
    Bulk {
        #[arg(long, value_delimiter = ',')]
        days: Vec<String>,
        /// Select every day of --month/--year instead of --days.
        #[arg(long, default_value_t = false)]
        whole_month: bool,
        #[command(flatten)]
        month: MonthArgs,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    Client {
        #[command(subcommand)]
        command: ClientCommand,
    },
    Role {
        #[command(subcommand)]
        command: RoleCommand,
    },
    Employee {
        #[command(subcommand)]
        command: EmployeeCommand,
    },
}

#[derive(clap::Args, Clone, Copy)]
struct MonthArgs {
    #[arg(long)]
    month: Option<u32>,
    #[arg(long)]
    year: Option<i32>,
}

impl MonthArgs {
    fn window(&self) -> Result<MonthWindow> {
        let current = MonthWindow::current();
        let month = self.month.unwrap_or(current.month());
        let year = self.year.unwrap_or(current.year());
        Ok(MonthWindow::new(month, year)?)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Active,
    Inactive,
}

impl From<StatusArg> for EntityStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => EntityStatus::Active,
            StatusArg::Inactive => EntityStatus::Inactive,
        }
    }
}

#[derive(Subcommand)]
enum ClientCommand {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        contact_name: Option<String>,
        #[arg(long)]
        contact_email: Option<String>,
    },
    List,
    Status {
        id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
}

#[derive(Subcommand)]
enum RoleCommand {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Status {
        id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
}

#[derive(Subcommand)]
enum EmployeeCommand {
    Add {
        name: String,
    },
    List,
    Assign {
        id: String,
        #[arg(long, value_delimiter = ',')]
        clients: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<String>>,
        #[arg(long)]
        default_client: Option<String>,
        #[arg(long)]
        default_role: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = data_dir;
    }
    if let Some(namespace) = cli.namespace.clone() {
        config.namespace = namespace;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(data_dir = %config.data_dir.display(), "Using data directory");
    let repo = Repository::new(JsonDirStore::new(&config.data_dir), config.namespace.clone());

    match cli.command {
        Commands::Client { command } => run_client(repo, command),
        Commands::Role { command } => run_role(repo, command),
        Commands::Employee { command } => run_employee(repo, command),
        command => {
            let employee_id = cli
                .employee
                .clone()
                .ok_or_else(|| anyhow!("--employee is required for this command"))?;
            let user = SessionUser {
                employee_id,
                is_admin: cli.admin,
            };
            run_timesheet(repo, user, command)
        }
    }
}

fn run_timesheet(repo: Repository<JsonDirStore>, user: SessionUser, command: Commands) -> Result<()> {
    let window = match &command {
        Commands::Timesheet { month, .. }
        | Commands::Summary { month }
        | Commands::Bulk { month, .. } => month.window()?,
        _ => MonthWindow::current(),
    };
    let mut session = Session::start(repo, user, window)?;

    match command {
        Commands::Timesheet { hide_empty, .. } => {
            print_timesheet(&session.timesheet(), session.catalog(), hide_empty);
        }
        Commands::Summary { .. } => {
            print_summary(&session.summary(), session.window());
        }
        Commands::Add {
            date,
            start,
            end,
            client,
            role,
            note,
            custom_role,
        } => {
            let day = parse_date(&date)?;
            session.set_window(MonthWindow::containing(day));
            let draft = session.add_to_day(day)?;
            draft.start_time = start;
            draft.end_time = end;
            if let Some(client) = client {
                draft.client_id = client;
            }
            if let Some(role) = role {
                draft.funcao_id = role;
            }
            draft.note = note.unwrap_or_default();
            draft.custom_role = custom_role.unwrap_or_default();
            report(session.submit())?;
        }
        Commands::Edit {
            id,
            date,
            start,
            end,
            client,
            role,
            note,
            custom_role,
        } => {
            let draft = session.edit_record(&id)?;
            let overrides = [
                (&mut draft.date, date),
                (&mut draft.start_time, start),
                (&mut draft.end_time, end),
                (&mut draft.client_id, client),
                (&mut draft.funcao_id, role),
                (&mut draft.note, note),
                (&mut draft.custom_role, custom_role),
            ];
            for (field, value) in overrides {
                if let Some(value) = value {
                    *field = value;
                }
            }
            report(session.submit())?;
        }
        Commands::Delete { id } => {
            session.delete_record(&id)?;
            println!("Deleted {id}.");
        }
        Commands::Bulk {
            days,
            whole_month,
            start,
            end,
            client,
            role,
            comment,
            ..
        } => {
            if whole_month {
                session.select_whole_month();
            } else {
                let dates = days
                    .iter()
                    .map(|value| parse_date(value))
                    .collect::<Result<Vec<_>, _>>()?;
                session.select_days(dates);
            }
            let draft = session.open_bulk_edit()?;
            draft.start_time = start.unwrap_or_default();
            draft.end_time = end.unwrap_or_default();
            draft.client_id = client.unwrap_or_default();
            draft.funcao_id = role.unwrap_or_default();
            draft.comment = comment.unwrap_or_default();
            report(session.submit())?;
        }
        Commands::Client { .. } | Commands::Role { .. } | Commands::Employee { .. } => {}
    }

    session.end();
    Ok(())
}

fn report(result: ponto::Result<Submitted>) -> Result<()> {
    match result.context("Nothing was saved")? {
        Submitted::Created(record) => {
            println!("Added {} on {}.", record.id, record.date);
        }
        Submitted::Updated(record) => {
            println!("Updated {} on {}.", record.id, record.date);
        }
        Submitted::Bulk {
            updated,
            created,
            skipped,
        } => {
            println!("Updated {updated} records, created {created}.");
            if !skipped.is_empty() {
                let days: Vec<String> = skipped
                    .iter()
                    .map(|day| day.format("%d/%m/%Y").to_string())
                    .collect();
                println!("Skipped empty days: {}", days.join(", "));
            }
        }
    }
    Ok(())
}

fn print_timesheet(sheet: &Timesheet, catalog: &Catalog, hide_empty: bool) {
    println!(
        "Timesheet {}  (total {})",
        sheet.window.label(),
        format_minutes(sheet.total_minutes)
    );
    for day in &sheet.days {
        if hide_empty && day.is_empty() {
            continue;
        }
        println!();
        println!("{} {}  {}", day.date.format("%a"), day.label, day.total_label);
        if day.is_empty() {
            println!("  (no entries)");
            continue;
        }
        for record in &day.records {
            println!("  {}", record_line(record, catalog));
        }
    }
}

fn record_line(record: &TimeRecord, catalog: &Catalog) -> String {
    let end = record.end_time.as_deref().unwrap_or("--:--");
    let mut line = format!(
        "{}-{}  {:>7}  {} / {}  [{}]",
        record.start_time,
        end,
        format_minutes(effective_minutes(record)),
        catalog.client_name(record.client_id.as_deref()),
        catalog.role_label(record),
        record.status
    );
    if let Some(note) = record.note() {
        line.push_str(&format!("  \"{note}\""));
    }
    line.push_str(&format!("  {}", record.id));
    line
}

fn print_summary(summary: &MonthSummary, window: MonthWindow) {
    println!("Summary {}", window.label());
    println!(
        "  {} over {} days ({} records)",
        format_minutes(summary.total_minutes),
        summary.days_worked,
        summary.record_count
    );
    println!();
    println!("By client:");
    for bucket in &summary.by_client {
        println!("  {:<30} {}", bucket.label, format_minutes(bucket.minutes));
    }
    println!();
    println!("By role:");
    for bucket in &summary.by_role {
        println!("  {:<30} {}", bucket.label, format_minutes(bucket.minutes));
    }
    println!();
    println!("By week:");
    for week in &summary.weekly {
        println!("  {:<30} {}", week.label, format_minutes(week.minutes));
    }
}

fn status_label(status: EntityStatus) -> &'static str {
    match status {
        EntityStatus::Active => "active",
        EntityStatus::Inactive => "inactive",
    }
}

fn run_client(mut repo: Repository<JsonDirStore>, command: ClientCommand) -> Result<()> {
    match command {
        ClientCommand::Add {
            name,
            description,
            contact_name,
            contact_email,
        } => {
            let client = admin::add_client(
                &mut repo,
                NewClient {
                    name,
                    description,
                    contact_name,
                    contact_email,
                },
            )?;
            println!("Added client {} ({}).", client.id, client.name);
        }
        ClientCommand::List => {
            for client in repo.clients() {
                println!("{}  {:<30} {}", client.id, client.name, status_label(client.status));
            }
        }
        ClientCommand::Status { id, status } => {
            let client = admin::set_client_status(&mut repo, &id, status.into())?;
            println!("{} is now {}.", client.id, status_label(client.status));
        }
    }
    Ok(())
}

fn run_role(mut repo: Repository<JsonDirStore>, command: RoleCommand) -> Result<()> {
    match command {
        RoleCommand::Add { name, description } => {
            let role = admin::add_funcao(&mut repo, &name, description)?;
            println!("Added role {} ({}).", role.id, role.name);
        }
        RoleCommand::List => {
            for role in repo.funcoes() {
                println!("{}  {:<30} {}", role.id, role.name, status_label(role.status));
            }
        }
        RoleCommand::Status { id, status } => {
            let role = admin::set_funcao_status(&mut repo, &id, status.into())?;
            println!("{} is now {}.", role.id, status_label(role.status));
        }
    }
    Ok(())
}

fn run_employee(mut repo: Repository<JsonDirStore>, command: EmployeeCommand) -> Result<()> {
    match command {
        EmployeeCommand::Add { name } => {
            let employee = admin::add_employee(&mut repo, &name)?;
            println!("Added employee {} ({}).", employee.id, employee.name);
        }
        EmployeeCommand::List => {
            for employee in repo.employees() {
                println!(
                    "{}  {:<30} {} records",
                    employee.id,
                    employee.name,
                    employee.time_records.len()
                );
            }
        }
        EmployeeCommand::Assign {
            id,
            clients,
            roles,
            default_client,
            default_role,
        } => {
            let assignment = Assignment {
                client_ids: clients,
                funcao_ids: roles,
                default_client_id: default_client,
                default_funcao_id: default_role,
            };
            let employee = admin::assign(&mut repo, &id, assignment)?;
            println!("Updated assignments for {}.", employee.id);
        }
    }
    Ok(())
}
