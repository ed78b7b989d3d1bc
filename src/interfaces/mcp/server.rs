//! Stdio server loop: one JSON message per line in, one per line out.
//!
//! Each request runs on its own task; responses are funneled through a single
//! writer task so lines never interleave. A failing request only ever
//! produces an error response.

use crate::application::dispatch::Dispatcher;
use crate::interfaces::mcp::protocol::{Incoming, Response, RpcError, PROTOCOL_VERSION};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

pub const SERVER_NAME: &str = "openapi-korea";

/// Serve until `reader` hits EOF. Returns the writer once every pending
/// response has been flushed.
pub async fn serve<R, W>(dispatcher: Dispatcher, reader: R, writer: W) -> std::io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Response>();
    let writer_task = tokio::spawn(write_responses(rx, writer));

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let incoming = match serde_json::from_str::<Incoming>(line) {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::error!(error = %e, "unparseable message");
                let _ = tx.send(Response::failure(None, RpcError::parse_error(e)));
                continue;
            }
        };

        let (Some(id), Some(method)) = (incoming.id, incoming.method) else {
            // notification or a client-side response; nothing to answer
            continue;
        };

        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            tracing::debug!(id = %id, method = %method, "request");
            let response = match handle(&dispatcher, &method, incoming.params).await {
                Ok(result) => Response::success(id, result),
                Err(err) => Response::failure(Some(id), err),
            };
            let _ = tx.send(response);
        });
    }

    drop(tx);
    writer_task
        .await
        .map_err(|e| std::io::Error::other(format!("Writer task failed: {}", e)))?
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<Response>, mut writer: W) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(writer)
}

/// Route one request to the dispatcher.
pub async fn handle(dispatcher: &Dispatcher, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
    let params = params.unwrap_or(Value::Null);

    match method {
        "initialize" => {
            let version = params
                .get("protocolVersion")
                .and_then(Value::as_str)
                .unwrap_or(PROTOCOL_VERSION);
            Ok(json!({
                "protocolVersion": version,
                "capabilities": { "resources": {}, "tools": {} },
                "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
            }))
        }
        "ping" => Ok(json!({})),
        "resources/list" => Ok(json!({ "resources": dispatcher.list_resources() })),
        "resources/read" => {
            let uri = params
                .get("uri")
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::invalid_params("uri is required"))?;
            let content = dispatcher.read_resource(uri).await;
            Ok(json!({
                "contents": [{
                    "uri": content.uri,
                    "mimeType": content.mime_type,
                    "text": content.text
                }]
            }))
        }
        "tools/list" => Ok(json!({ "tools": dispatcher.list_tools() })),
        "tools/call" => {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::invalid_params("name is required"))?;
            let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            let output = dispatcher.call_tool(name, &args).await;
            Ok(json!({
                "content": [{ "type": "text", "text": output.text }],
                "isError": output.is_error
            }))
        }
        other => Err(RpcError::method_not_found(other)),
    }
}
