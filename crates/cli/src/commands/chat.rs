//! `archmentor chat` — Interactive or single-message tutoring session.

use archmentor_agent::Runtime;
use archmentor_core::response::{TurnRequest, TurnResponse};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::load_config;

pub struct ChatOptions {
    pub session: String,
    pub image: Option<String>,
    pub metadata: bool,
}

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    options: ChatOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let runtime = Runtime::build(config).await?;
    let sessions = runtime.sessions();
    debug!(session = %options.session, "Chat session starting");

    if let Some(msg) = message {
        // Single message mode
        let mut request = TurnRequest::new(&options.session, msg);
        if let Some(image) = &options.image {
            request = request.with_image(image);
        }
        let response = sessions.turn(request).await?;
        print_reply(&response, options.metadata, "")?;
        runtime.shutdown().await;
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        ArchMentor — Design Studio Tutor      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Session:   {}", options.session);
    println!(
        "  Knowledge: {} items",
        archmentor_core::knowledge::KnowledgeSource::count(runtime.knowledge().as_ref()).await?
    );
    println!();
    println!("  Tell me about your project and press Enter.");
    println!("  Commands: /reset starts over, /image <ref> attaches a drawing, exit quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut image = options.image.clone();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {
                prompt()?;
                continue;
            }
            "exit" | "quit" => break,
            "/reset" => {
                sessions.reset(&options.session).await.ok();
                println!("  (session reset)");
                println!();
                prompt()?;
                continue;
            }
            _ => {}
        }
        if let Some(reference) = line.strip_prefix("/image ") {
            image = Some(reference.trim().to_string());
            println!("  (drawing attached to your next message)");
            prompt()?;
            continue;
        }

        let mut request = TurnRequest::new(&options.session, line);
        if let Some(reference) = image.take() {
            request = request.with_image(reference);
        }

        eprint!("  ...");
        match sessions.turn(request).await {
            Ok(response) => {
                eprint!("\r     \r");
                println!();
                print_reply(&response, options.metadata, "  Tutor > ")?;
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    runtime.shutdown().await;
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_reply(
    response: &TurnResponse,
    metadata: bool,
    prefix: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    for line in response.text.lines() {
        println!("{prefix}{line}");
    }
    if metadata {
        println!();
        println!("{}", serde_json::to_string_pretty(&response.metadata)?);
    }
    Ok(())
}
