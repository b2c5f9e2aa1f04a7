//! `casa chat`: Single-message or interactive chat.

use casa_agent::Assistant;
use casa_config::AppConfig;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if config.agent.enabled == Some(true) && !config.model_configured() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set CASA_API_KEY or OPENAI_API_KEY, or add `api_key` to");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  Unset CASA_AGENT_ENABLED to fall back to echo mode instead.");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let assistant = Assistant::from_config(&config).await?;

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let response = assistant.converse(&msg).await;
        eprint!("\r              \r");
        println!("{}", response?);
        return Ok(());
    }

    println!();
    println!("  Casa — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!(
        "  Devices:   {}",
        assistant.devices().hub_name().unwrap_or("simulated")
    );
    if assistant.echo_mode() {
        println!("  Mode:      echo");
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  /reset clears the conversation, /quit exits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                let discarded = assistant.reset().await;
                println!("  [Conversation cleared, {discarded} messages discarded]");
                println!();
                continue;
            }
            _ => {}
        }

        eprint!("  ...");
        match assistant.converse(line).await {
            Ok(response) => {
                eprint!("\r     \r");
                println!();
                for line in response.lines() {
                    println!("  Casa > {line}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
