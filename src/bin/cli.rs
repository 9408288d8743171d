use sqlx::Row;
use std::collections::HashSet;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use oak_storefront::authz::{resolve_role, AdminAllowList, Role, RoleStore, SqliteRoleStore};
use oak_storefront::db::MIGRATOR;
use oak_storefront::jwt::decode_unverified;
use oak_storefront::utils::utc_now;

#[derive(Parser, Debug)]
#[command(author, version, about = "oak-storefront operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Set the stored role of a user (Customer, Manager or SuperAdmin)
    SetRole { email: String, role: String },
    /// Print the stored and effective role of a user
    EffectiveRole { email: String },
    /// Print the unverified claims the route guard would read from a session token
    DecodeSession { token: String },
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
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            MIGRATOR.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            print_status(&pool).await?;
        }
        Commands::SetRole { email, role } => {
            let role: Role = role.parse().map_err(anyhow::Error::msg)?;
            let pool = get_pool().await?;
            let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE email = ? AND deleted_at IS NULL")
                .bind(role.as_str())
                .bind(utc_now())
                .bind(email.trim().to_lowercase())
                .execute(&pool)
                .await?;
            if result.rows_affected() == 0 {
                anyhow::bail!("no user with email {}", email);
            }
            println!("{} is now {}", email, role);
        }
        Commands::EffectiveRole { email } => {
            let pool = get_pool().await?;
            let email = email.trim().to_lowercase();
            let id: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ? AND deleted_at IS NULL")
                .bind(&email)
                .fetch_optional(&pool)
                .await?;
            let id = id.with_context(|| format!("no user with email {}", email))?;
            let user_id = Uuid::parse_str(&id).with_context(|| format!("corrupt user id {}", id))?;

            let store = SqliteRoleStore::new(pool);
            let admins = AdminAllowList::from_env();
            let stored = store.stored_role(user_id).await;
            let role = resolve_role(&store, &admins, user_id, None).await;
            println!("{:<10} {}", "stored", stored);
            println!("{:<10} {}", "allowlist", admins.contains(&email));
            println!("{:<10} {}", "effective", role);
        }
        Commands::DecodeSession { token } => {
            let claims = decode_unverified(token.trim())?;
            let admins = AdminAllowList::from_env();
            let email = claims.email().unwrap_or("-");
            println!("{:<10} {}", "sub", claims.sub.as_deref().unwrap_or("-"));
            println!("{:<10} {}", "email", email);
            println!("{:<10} {}", "role", claims.role.as_deref().unwrap_or("-"));
            println!("{:<10} {}", "exp", claims.exp.map(|exp| exp.to_string()).unwrap_or_else(|| "-".to_string()));
            println!("{:<10} {}", "admin", admins.contains(email));
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let db_applied: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in MIGRATOR.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if !desc.is_empty() { desc } else { "unknown" };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}
