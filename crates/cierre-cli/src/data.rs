//! Snapshot loading, atomic write-back, and application lookup.

use std::path::Path;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use cierre_store::models::Application;
use cierre_store::snapshot::Snapshot;

/// Read and parse the JSON data snapshot at `path`.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data snapshot at {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse data snapshot at {}", path.display()))?;
    Ok(snapshot)
}

/// Write the snapshot back atomically: serialize to a sibling temp file,
/// then rename over the original so a crash never leaves a half-written
/// snapshot behind.
pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let contents =
        serde_json::to_string_pretty(snapshot).context("failed to serialize data snapshot")?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &contents)
        .with_context(|| format!("failed to write temp snapshot at {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace data snapshot at {}", path.display()))?;

    Ok(())
}

/// Resolve an application selector to a record: an exact UUID, or a
/// case-insensitive substring of the application name. Ambiguous name
/// matches are an error listing the candidates.
pub fn resolve_application<'a>(
    snapshot: &'a Snapshot,
    selector: &str,
) -> Result<&'a Application> {
    if let Ok(id) = Uuid::parse_str(selector) {
        return snapshot
            .applications
            .iter()
            .find(|a| a.id == id)
            .with_context(|| format!("application {id} not found in snapshot"));
    }

    let needle = selector.to_lowercase();
    let matches: Vec<&Application> = snapshot
        .applications
        .iter()
        .filter(|a| a.name.to_lowercase().contains(&needle))
        .collect();

    match matches.as_slice() {
        [] => bail!("no application matches '{selector}'"),
        [one] => Ok(one),
        many => {
            let names: Vec<String> = many.iter().map(|a| format!("{} ({})", a.name, a.id)).collect();
            bail!(
                "'{selector}' matches {} applications: {}",
                many.len(),
                names.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cierre_store::memory::MemoryStore;
    use cierre_test_utils::FarmFixture;

    #[tokio::test]
    async fn snapshot_survives_save_and_load() {
        let (store, fx) = FarmFixture::seed().await;
        let snapshot = store.to_snapshot().await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cierre.json");
        save_snapshot(&path, &snapshot).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        let reloaded = MemoryStore::from_snapshot(loaded);
        let round_tripped = reloaded.to_snapshot().await;

        assert_eq!(round_tripped.applications.len(), 1);
        assert_eq!(round_tripped.applications[0].id, fx.application_id);
        assert_eq!(round_tripped.work_records.len(), snapshot.work_records.len());
        assert_eq!(
            round_tripped.inventory_products.len(),
            snapshot.inventory_products.len()
        );
    }

    #[tokio::test]
    async fn save_replaces_existing_snapshot() {
        let (store, _fx) = FarmFixture::seed().await;
        let snapshot = store.to_snapshot().await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cierre.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        save_snapshot(&path, &snapshot).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.applications.len(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn selector_resolves_by_id_and_by_name() {
        let (store, fx) = FarmFixture::seed().await;
        let snapshot = store.to_snapshot().await;

        let by_id = resolve_application(&snapshot, &fx.application_id.to_string()).unwrap();
        assert_eq!(by_id.id, fx.application_id);

        let name = snapshot.applications[0].name.clone();
        let fragment = name[..4].to_uppercase();
        let by_name = resolve_application(&snapshot, &fragment).unwrap();
        assert_eq!(by_name.id, fx.application_id);

        assert!(resolve_application(&snapshot, "no-such-application").is_err());
    }
}
