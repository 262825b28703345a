mod app;
mod events;
mod graph;
mod rag;
mod util;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::rag::GraphSource;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the memory service that serves `/export/graph`.
    #[arg(long, env = "RAG_API_URL", default_value = "http://localhost:8000")]
    rag_url: String,

    #[arg(long, default_value_t = 500)]
    max_nodes: usize,

    /// Only load memories from this category.
    #[arg(long)]
    category: Option<String>,

    /// Read the graph export from a JSON file instead of the service.
    #[arg(long, conflicts_with_all = ["category"])]
    graph_file: Option<PathBuf>,

    /// Accept newline-delimited JSON events (new nodes, chat exploration) on stdin.
    #[arg(long)]
    events_stdin: bool,
}

impl Args {
    fn source(&self) -> GraphSource {
        match &self.graph_file {
            Some(path) => GraphSource::File(path.clone()),
            None => GraphSource::Api {
                base_url: self.rag_url.clone(),
                max_nodes: self.max_nodes,
                category: self.category.clone(),
            },
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memory_graph=info")),
        )
        .init();

    let args = Args::parse();
    let source = args.source();
    let events_stdin = args.events_stdin;
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "memory-graph",
        options,
        Box::new(move |cc| {
            let (sender, event_rx) = events::channel();
            if events_stdin {
                events::spawn_stdin_bridge(sender.with_repaint(cc.egui_ctx.clone()));
            }
            Ok(Box::new(app::MemoryGraphApp::new(cc, source, event_rx)))
        }),
    )
}
