mod chat;
mod client;
mod parse;

pub use chat::{ChatEvent, ExplorationState, NodeFamily};
pub use client::{GraphSource, fetch_graph};
pub use parse::{GraphStats, LoadedGraph, NodeInsertionPayload, RawEdge, RawNode};
