use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use taskward::utils::hash_password;

#[derive(Parser, Debug)]
#[command(author, version, about = "taskward admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Roll back the last applied migration
    MigrateRollback,
    /// Bootstrap the superadmin plus a set of demo accounts and tasks
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may differ,
    // so fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
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
            migrator
                .undo(&pool, 1)
                .await
                .context("no migrations were rolled back")?;
            println!("Rolled back last migration");
        }
        Commands::Seed => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            seed(&pool).await?;
        }
    }

    Ok(())
}

async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    // The only way a superadmin ever comes into existence: no API ability
    // grants creating one.
    let accounts = [
        ("Admin", "admin@localhost.dev", "adminadmin", "superadmin"),
        ("John Doe", "john@localhost.dev", "johnjohn", "admin"),
        ("Robert Downey", "robert@localhost.dev", "RobertRobert", "admin"),
        ("Patrick Grant", "patric@localhost.dev", "patricpatric", "user"),
        ("Eric Bell", "eric@localhost.dev", "ericeric", "user"),
        ("Dave Flett", "dave@localhost.dev", "davedave", "user"),
    ];

    for (name, email, password, role) in accounts {
        let id = ensure_account(pool, name, email, password, role).await?;
        println!("{role:<10} {email:<26} password: {password:<14} id: {id}");
    }

    let eric = account_id(pool, "eric@localhost.dev").await?;
    let dave = account_id(pool, "dave@localhost.dev").await?;

    ensure_demo_tasks(pool, &eric, "user", 5).await?;
    ensure_demo_tasks(pool, &dave, "user", 50).await?;

    println!("Seed complete");
    Ok(())
}

async fn ensure_account(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<String> {
    if let Ok(id) = account_id(pool, email).await {
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let password_hash = hash_password(password)?;

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 'enabled', ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

async fn account_id(pool: &SqlitePool, email: &str) -> anyhow::Result<String> {
    let id: String = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .with_context(|| format!("no account for {email}"))?;
    Ok(id)
}

async fn ensure_demo_tasks(
    pool: &SqlitePool,
    owner_id: &str,
    owner_role: &str,
    count: i64,
) -> anyhow::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM tasks WHERE user_id = ?")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    if existing >= count {
        return Ok(());
    }

    let now = Utc::now();
    for index in existing..count {
        sqlx::query(
            "INSERT INTO tasks (id, title, description, due_date, completed, user_id, user_role, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(format!("Demo task {}", index + 1))
        .bind("Seeded task for local development.")
        .bind(now + Duration::days(index % 30))
        .bind(index % 4 == 0)
        .bind(owner_id)
        .bind(owner_role)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized = sanitize_name(name);
    let filename = format!("{}_{}.sql", timestamp, sanitized);
    let path = Path::new("migrations").join(filename);

    if path.exists() {
        anyhow::bail!("migration already exists: {}", path.display());
    }

    fs::write(&path, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(path)
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    Ok(sqlx::migrate!())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let db_applied =
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter()
            .filter_map(|row| row.try_get::<i64, _>("version").ok())
            .collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let applied = applied_versions.contains(&version);
        let status = if applied { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if !desc.is_empty() { desc } else { "unknown" };
        println!("{:<8} {:<20} {}", status, version, name);
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
