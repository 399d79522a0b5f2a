//! `relaybot status` — show configuration and provider readiness.

use anyhow::Result;
use colored::Colorize;

use relaybot_core::config::Config;
use relaybot_core::types::ProviderId;

/// Print a configuration summary.
pub fn run(config: Config) -> Result<()> {
    println!("{}", "Relay".bold());
    println!("  default provider   {}", config.relay.default_provider);
    println!("  max history        {}", config.relay.max_history_messages);
    println!("  max answer tokens  {}", config.relay.max_answer_tokens);

    println!("\n{}", "Providers".bold());
    for id in [ProviderId::OpenAi, ProviderId::Anthropic] {
        let provider = config.providers.get(id);
        let state = if provider.is_configured() {
            "configured".green()
        } else {
            "missing key or model".red()
        };
        println!("  {:<10} {:<24} {}", id.to_string(), provider.model, state);
    }

    println!("\n{}", "Gates".bold());
    let gates = [
        ("summarize_youtube", config.gates.summarize_youtube),
        ("web_reader", config.gates.web_reader),
        ("watch_video", config.gates.watch_video),
        ("watch_picture", config.gates.watch_picture),
        ("listen_audio", config.gates.listen_audio),
        ("generate_picture", config.gates.generate_picture),
    ];
    for (name, enabled) in gates {
        let mark = if enabled {
            "enabled".green()
        } else {
            "disabled".red()
        };
        println!("  {name:<20} {mark}");
    }

    match config.validate() {
        Ok(()) => println!("\n{}", "Ready to serve turns.".green()),
        Err(e) => println!("\n{} {e}", "Not ready:".red()),
    }

    Ok(())
}
