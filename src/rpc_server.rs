//! Kizuna RPC Server: JSON-RPC over stdin/stdout driving one bookmark session.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"url":"docs.rs"}}
//! Response: {"id":1, "result":{"ok":true}} or {"id":1, "error":"..."}
//! Event:    {"event":"view", "view":{...}} whenever the view changes.

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;
use tracing::{error, info};

use kizuna::app::App;
use kizuna::logging;
use kizuna::rpc_handler::{handle_request, view_event};

const COMMAND_QUEUE: usize = 64;

async fn write_line(stdout: &mut Stdout, value: &Value) -> io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();

    let app = match App::from_environment() {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to initialize kizuna");
            std::process::exit(1);
        }
    };

    let session = app.session();
    let mut views = session.view_updates();
    let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let session_task = tokio::spawn(session.run(command_rx));

    let mut stdout = io::stdout();
    let ready = json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")});
    if write_line(&mut stdout, &ready).await.is_err() {
        return;
    }
    info!("rpc server ready");

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let outgoing = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => handle_request(&app.identity, &commands, &line),
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "stdin read failed");
                    break;
                }
            },
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                view_event(&view)
            }
        };

        if let Err(e) = write_line(&mut stdout, &outgoing).await {
            error!(error = %e, "stdout write failed");
            break;
        }
    }

    drop(commands);
    let _ = session_task.await;
    info!("rpc server stopped");
}
