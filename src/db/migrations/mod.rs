use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlx::{Executor, PgPool};
use tracing::info;

/// Apply every `.sql` file in `migrations_dir`, in migration order
///
/// The scripts are written to be re-runnable (`IF NOT EXISTS`).
pub async fn run_migrations(pool: &PgPool, migrations_dir: &Path) -> Result<()> {
    let mut entries = std::fs::read_dir(migrations_dir)
        .with_context(|| format!("Failed to read migrations from {}", migrations_dir.display()))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext == "sql").unwrap_or(false))
        .collect::<Vec<_>>();

    sort_migrations(&mut entries);

    for path in entries {
        execute_migration_file(pool, &path).await?;
        info!("Applied migration: {}", path.display());
    }

    Ok(())
}

/// Numbered files first, then foreign keys, then indexes
fn sort_migrations(entries: &mut [PathBuf]) {
    fn order_value(name: &str) -> usize {
        if name.starts_with("add_foreign_keys") {
            1000
        } else if name.starts_with("add_indexes") {
            2000
        } else {
            name.split('_')
                .next()
                .and_then(|prefix| prefix.parse::<usize>().ok())
                .unwrap_or(usize::MAX)
        }
    }

    entries.sort_by_key(|path| {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        (order_value(&name), name)
    });
}

async fn execute_migration_file(pool: &PgPool, path: &Path) -> Result<()> {
    let sql = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read migration {}", path.display()))?;

    pool.execute(&*sql)
        .await
        .with_context(|| format!("Migration {} failed", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_files_run_before_keys_and_indexes() {
        let mut entries: Vec<PathBuf> = [
            "add_indexes_incidents.sql",
            "002_create_incidents.sql",
            "add_foreign_keys_incidents.sql",
            "001_create_cameras.sql",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        sort_migrations(&mut entries);

        let names: Vec<&str> = entries.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "001_create_cameras.sql",
                "002_create_incidents.sql",
                "add_foreign_keys_incidents.sql",
                "add_indexes_incidents.sql",
            ]
        );
    }

    #[test]
    fn shipped_migrations_are_found() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/db/migrations/sql");
        let count = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "sql"))
            .count();
        assert!(count >= 2);
    }
}
