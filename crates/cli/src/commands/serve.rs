//! `archmentor serve` — Start the HTTP gateway.

use std::path::Path;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    port: Option<u16>,
    host: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(p) = port {
        config.gateway.port = p;
    }
    if let Some(h) = host {
        config.gateway.host = h;
    }

    println!();
    println!("  ArchMentor gateway");
    println!("  Listening on http://{}:{}", config.gateway.host, config.gateway.port);
    println!("  Endpoints:");
    println!("    GET    /health");
    println!("    POST   /v1/sessions");
    println!("    GET    /v1/sessions");
    println!("    GET    /v1/sessions/{{id}}");
    println!("    DELETE /v1/sessions/{{id}}");
    println!("    POST   /v1/sessions/{{id}}/cancel");
    println!("    POST   /v1/sessions/{{id}}/reset");
    println!("    POST   /v1/turns");
    println!("    GET    /v1/stats");
    println!("    GET    /v1/interactions");
    println!("    GET    /v1/contracts");
    println!("    POST   /v1/contracts/reload");
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    archmentor_gateway::start(config).await
}
