use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{Context as _, Result};
use eframe::egui::Context;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::rag::{ChatEvent, NodeInsertionPayload, RawEdge, RawNode};

pub type Completion = Box<dyn FnOnce() + Send>;

/// A note that should appear in the running view.
pub struct InsertionRequest {
    pub payload: NodeInsertionPayload,
    pub focus: bool,
    pub on_complete: Option<Completion>,
}

pub enum GraphEvent {
    Insert(InsertionRequest),
    Chat(ChatEvent),
    ClearHighlights,
}

/// Producer half of the viewer's event channel.
#[derive(Clone)]
pub struct GraphEventSender {
    tx: Sender<GraphEvent>,
    repaint: Option<Context>,
}

pub fn channel() -> (GraphEventSender, Receiver<GraphEvent>) {
    let (tx, rx) = mpsc::channel();
    (GraphEventSender { tx, repaint: None }, rx)
}

impl GraphEventSender {
    pub fn with_repaint(mut self, ctx: Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    pub fn send(&self, event: GraphEvent) -> bool {
        let delivered = self.tx.send(event).is_ok();
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
        delivered
    }
}

fn default_focus() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlLine {
    NodeAdded {
        node: RawNode,
        #[serde(default)]
        edges: Vec<RawEdge>,
        #[serde(default = "default_focus")]
        focus: bool,
    },
    Clear,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InboundLine {
    Chat(ChatEvent),
    Control(ControlLine),
}

pub fn parse_event_line(line: &str) -> Result<Option<GraphEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let inbound: InboundLine =
        serde_json::from_str(line).with_context(|| format!("unrecognised event line: {line}"))?;
    let event = match inbound {
        InboundLine::Chat(event) => GraphEvent::Chat(event),
        InboundLine::Control(ControlLine::NodeAdded { node, edges, focus }) => {
            GraphEvent::Insert(InsertionRequest {
                payload: NodeInsertionPayload { node, edges },
                focus,
                on_complete: None,
            })
        }
        InboundLine::Control(ControlLine::Clear) => GraphEvent::ClearHighlights,
    };
    Ok(Some(event))
}

/// Forwards NDJSON lines from stdin into the viewer until stdin closes.
pub fn spawn_stdin_bridge(sender: GraphEventSender) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(error) => {
                    warn!(%error, "stopping stdin event bridge");
                    break;
                }
            };

            match parse_event_line(&line) {
                Ok(Some(GraphEvent::Chat(ChatEvent::Text { content }))) => {
                    debug!(chars = content.chars().count(), "ignoring assistant text chunk");
                }
                Ok(Some(event)) => {
                    if !sender.send(event) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(error) => warn!("{error:#}"),
            }
        }
        info!("stdin event bridge finished");
    });
}
