use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use member_authz::audit::{self, AuditPager};
use member_authz::authz::{Action, PermissionResolver, PolicyEvaluator, SnapshotSource};
use member_authz::catalog::{category_info, FunctionCatalog};
use member_authz::models::audit::AuditQuery;
use member_authz::store::profiles;

#[derive(Parser, Debug)]
#[command(author, version, about = "member-authz administration tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty reversible migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Roll back the last applied migration
    MigrateRollback,
    /// Resolve one decision for the user with the given e-mail
    Resolve {
        #[arg(long)]
        email: String,
        #[arg(long)]
        function: String,
        #[arg(long, value_enum, default_value_t = CliAction::Access)]
        action: CliAction,
    },
    /// Print the function catalog grouped by category
    Catalog,
    /// Print the newest audit entries
    AuditTail {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        action_type: Option<String>,
    },
    /// Check the audit hash chain
    AuditVerify,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliAction {
    Access,
    Manage,
}

impl From<CliAction> for Action {
    fn from(value: CliAction) -> Self {
        match value {
            CliAction::Access => Action::Access,
            CliAction::Manage => Action::Manage,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let (up, down) = make_migration_files(&name)?;
            println!("Created migration: {}", up.display());
            println!("Created migration: {}", down.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::MigrateRollback => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            let applied = applied_versions(&pool).await?;
            let Some(last) = applied.iter().max().copied() else {
                anyhow::bail!("no migrations have been applied");
            };
            migrator
                .undo(&pool, last - 1)
                .await
                .context("no migrations were rolled back")?;
            println!("Rolled back migration {last}");
        }
        Commands::Resolve { email, function, action } => {
            let pool = get_pool().await?;
            let catalog = Arc::new(FunctionCatalog::load()?);
            catalog.by_id(&function)?;

            let profile = profiles::find_profile_by_email(&pool, &email)
                .await?
                .with_context(|| format!("no profile with e-mail {email}"))?;
            let snapshot = pool.load_snapshot(profile.user_id).await?;
            let decision = PermissionResolver::new(catalog).resolve(&snapshot, &function, action.into(), Utc::now());

            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Catalog => {
            let catalog = FunctionCatalog::load()?;
            for tag in catalog.categories() {
                let info = category_info(tag);
                println!("{} [{}]", info.label, tag);
                for function in catalog.in_category(tag) {
                    println!("  {:<28} {:<16} {}", function.id, function.module, function.name);
                }
            }
        }
        Commands::AuditTail { limit, action_type } => {
            let pool = get_pool().await?;
            let filter = AuditQuery {
                action_type,
                ..AuditQuery::default()
            };
            let page_size = u32::try_from(limit.clamp(1, 500)).unwrap_or(audit::DEFAULT_PAGE_SIZE);
            let mut pager = AuditPager::new(&pool, filter, page_size);

            let mut printed = 0;
            while let Some(entries) = pager.next_page().await? {
                for entry in entries {
                    if printed == limit {
                        return Ok(());
                    }
                    println!(
                        "{:>6} {} {:<28} by {}",
                        entry.seq,
                        entry.timestamp.to_rfc3339(),
                        entry.action_type,
                        entry.performed_by
                    );
                    printed += 1;
                }
            }
        }
        Commands::AuditVerify => {
            let pool = get_pool().await?;
            let report = audit::verify_chain(&pool).await?;
            match report.broken_at {
                None => println!("audit chain intact ({} entries)", report.checked),
                Some(seq) => anyhow::bail!("audit chain broken at entry {seq} after {} entries", report.checked),
            }
        }
    }

    Ok(())
}

fn make_migration_files(name: &str) -> anyhow::Result<(PathBuf, PathBuf)> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized = sanitize_name(name);
    let dir = Path::new("migrations");
    let up = dir.join(format!("{timestamp}_{sanitized}.up.sql"));
    let down = dir.join(format!("{timestamp}_{sanitized}.down.sql"));

    if up.exists() || down.exists() {
        anyhow::bail!("migration already exists: {}", up.display());
    }

    fs::write(&up, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", up.display()))?;
    fs::write(&down, "-- Revert the matching .up.sql here\n")
        .with_context(|| format!("failed to create migration at {}", down.display()))?;

    Ok((up, down))
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn applied_versions(pool: &SqlitePool) -> anyhow::Result<HashSet<i64>> {
    let has_table: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    if has_table.is_none() {
        return Ok(HashSet::new());
    }

    let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect())
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let applied = applied_versions(pool).await?;

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter().filter(|m| m.migration_type.is_up_migration()) {
        let status = if applied.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Prefer ./migrations when run from the repository root, else the crate's own.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {display}"))
}
