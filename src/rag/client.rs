use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use super::parse::{LoadedGraph, parse_graph_export};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Where the initial graph comes from.
#[derive(Clone, Debug)]
pub enum GraphSource {
    Api {
        base_url: String,
        max_nodes: usize,
        category: Option<String>,
    },
    File(PathBuf),
}

impl GraphSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Api { base_url, .. } => base_url.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

pub fn fetch_graph(source: &GraphSource) -> Result<LoadedGraph> {
    let raw = match source {
        GraphSource::Api {
            base_url,
            max_nodes,
            category,
        } => fetch_export(base_url, *max_nodes, category.as_deref())?,
        GraphSource::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read graph export from {}", path.display()))?,
    };

    let loaded = parse_graph_export(&raw)
        .with_context(|| format!("failed to decode graph export from {}", source.describe()))?
        .into_loaded();
    info!(
        nodes = loaded.snapshot.node_count(),
        edges = loaded.snapshot.edge_count(),
        "graph export loaded"
    );
    Ok(loaded)
}

fn fetch_export(base_url: &str, max_nodes: usize, category: Option<&str>) -> Result<String> {
    let url = format!("{}/export/graph", base_url.trim_end_matches('/'));
    let mut query = vec![("max_nodes", max_nodes.to_string())];
    if let Some(category) = category {
        query.push(("category", category.to_owned()));
    }
    debug!(%url, max_nodes, ?category, "requesting graph export");

    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;
    let response = client
        .get(&url)
        .query(&query)
        .send()
        .with_context(|| format!("failed to reach retrieval service at {url}"))?;

    let status = response.status();
    let body = response
        .text()
        .with_context(|| format!("failed to read response body from {url}"))?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(anyhow!("graph export request to {url} failed with {status}: {body}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_loads_export() {
        let path = std::env::temp_dir().join(format!("memory-graph-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"nodes": [{"id": 1, "label": "a"}, {"id": 2, "label": "b"}],
                "edges": [{"source": 1, "target": 2, "weight": 0.5}]}"#,
        )
        .unwrap();

        let loaded = fetch_graph(&GraphSource::File(path.clone())).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.snapshot.node_count(), 2);
        assert_eq!(loaded.stats.edge_count, 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let source = GraphSource::File(PathBuf::from("/definitely/not/here.json"));
        let error = fetch_graph(&source).err().unwrap();
        assert!(format!("{error:#}").contains("/definitely/not/here.json"));
    }
}
