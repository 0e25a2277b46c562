use anyhow::{Context, Result};
use routemap_graph::ServiceGraph;
use std::env;
use std::path::{Path, PathBuf};

pub(crate) const GRAPH_ENV: &str = "ROUTEMAP_GRAPH";
pub(crate) const DEFAULT_GRAPH_FILE: &str = "train-ticket.json";

/// `--graph`, then `ROUTEMAP_GRAPH`, then `train-ticket.json` in the working dir
pub(crate) fn resolve_graph_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var_os(GRAPH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_GRAPH_FILE))
}

pub(crate) async fn load_graph(path: &Path) -> Result<ServiceGraph> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read graph file {}", path.display()))?;
    let graph = ServiceGraph::from_json_slice(&bytes)
        .with_context(|| format!("Invalid graph file {}", path.display()))?;
    log::debug!(
        "Loaded {} ({} nodes, {} edges)",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_flag_wins() {
        let path = resolve_graph_path(Some(PathBuf::from("custom.json")));
        assert_eq!(path, PathBuf::from("custom.json"));
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_graph(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read graph file"));
    }

    #[tokio::test]
    async fn load_reports_duplicate_nodes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(
            &path,
            r#"{"nodes":[{"name":"a","kind":"service"},{"name":"a","kind":"rds"}],"edges":[]}"#,
        )
        .unwrap();

        let err = load_graph(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("duplicate node name 'a'"));
    }
}
