//! `shamba simulate`: A terminal handset for the registration dialogue.
//!
//! Drives the same dispatcher the gateway uses, in-process. Each line typed
//! is one USSD entry; entries accumulate into the `*`-joined text exactly as
//! an aggregator would send them.

use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use shamba_core::INPUT_DELIMITER;
use shamba_engine::UssdRequest;

pub async fn run(phone: String, config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let dispatcher = shamba_gateway::build_dispatcher(&config)?;

    let mut request = UssdRequest {
        session_id: uuid::Uuid::new_v4().to_string(),
        end_user_id: phone,
        text: String::new(),
    };

    println!();
    println!("  Shamba USSD Simulator");
    println!("  Session:   {}", request.session_id);
    println!("  Phone:     {}", request.end_user_id);
    println!("  Registry:  {}", dispatcher.registry().name());
    println!();
    println!("  Type a menu option or answer and press Enter. Ctrl+D hangs up.");
    println!();

    info!(session_id = %request.session_id, "Simulated session started");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let directive = dispatcher.dispatch(&request).await;
        for line in directive.render().lines() {
            println!("  | {line}");
        }
        println!();

        if directive.is_terminal() {
            break;
        }

        print!("  > ");
        std::io::stdout().flush()?;

        let Some(entry) = lines.next_line().await? else {
            println!();
            println!("  Hung up.");
            break;
        };
        request.text = append_entry(&request.text, entry.trim());
        debug!(text = %request.text, "Simulated input");
    }

    info!(session_id = %request.session_id, "Simulated session ended");

    Ok(())
}

/// Extend the cumulative input with one more entry.
fn append_entry(text: &str, entry: &str) -> String {
    if text.is_empty() {
        entry.to_string()
    } else {
        format!("{text}{INPUT_DELIMITER}{entry}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_entry_has_no_delimiter() {
        assert_eq!(append_entry("", "1"), "1");
    }

    #[test]
    fn later_entries_are_star_joined() {
        let text = append_entry("1", "Jane Wanjiru");
        assert_eq!(append_entry(&text, "3"), "1*Jane Wanjiru*3");
    }
}
