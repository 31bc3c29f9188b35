//! `archmentor explain` — Show the classification, trends and routing
//! decision for a message without producing a reply.

use archmentor_agent::Runtime;
use archmentor_core::response::TurnRequest;
use std::path::Path;

use super::load_config;

const EXPLAIN_SESSION: &str = "explain";

pub async fn run(
    config_path: Option<&Path>,
    text: String,
    after: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let runtime = Runtime::build(config).await?;

    // Replay the earlier messages so routing sees a real history.
    for message in after {
        runtime
            .sessions()
            .turn(TurnRequest::new(EXPLAIN_SESSION, message))
            .await?;
    }
    let state = match runtime.sessions().snapshot(EXPLAIN_SESSION).await {
        Ok(state) => state,
        Err(_) => runtime.sessions().create(Some(EXPLAIN_SESSION.into())).await?.snapshot().await?,
    };

    let explanation = runtime.pipeline().explain(&state, &text);
    println!("{}", serde_json::to_string_pretty(&explanation)?);

    runtime.shutdown().await;
    Ok(())
}
