use crate::app::App;
use crate::commands::short;
use anyhow::{anyhow, Result};
use blockcast_core::storage::JournalStatus;
use blockcast_core::types::{format_address, shorten_address};
use blockcast_core::{ChainReader, EventWatcher, PredictionEvent};
use comfy_table::{presets::UTF8_FULL, Table};

pub async fn list_predictions(app: &App, pending_only: bool) -> Result<()> {
    let account = app
        .account()
        .ok_or_else(|| anyhow!("Configure a private key to list your predictions"))?;

    let journal = app.journal();
    let entries = if pending_only {
        journal.list_pending(&account).await?
    } else {
        journal.list_all(&account).await?
    };

    if entries.is_empty() {
        println!("No predictions found.");
        println!("Submit one with: blockcast submit --candidate 0");
        return Ok(());
    }

    // best effort; the list is still useful offline
    let head = app.reader.current_block().await.ok().map(|s| s.number);
    let window = app.network().reveal_window;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Target", "Predicted", "Status", "Submitted", "Tx"]);

    for entry in entries {
        let status = match (entry.status, head) {
            (JournalStatus::Revealed { is_correct: true }, _) => "correct".to_string(),
            (JournalStatus::Revealed { is_correct: false }, _) => "incorrect".to_string(),
            (JournalStatus::Pending, Some(head)) if head < entry.target_block => {
                "not mined".to_string()
            }
            (JournalStatus::Pending, Some(head)) if head - entry.target_block > window => {
                "expired".to_string()
            }
            (JournalStatus::Pending, Some(head)) => {
                format!("revealable ({} left)", window - (head - entry.target_block))
            }
            (JournalStatus::Pending, None) => "pending".to_string(),
        };

        table.add_row(vec![
            entry.target_block.to_string(),
            short(&entry.predicted_hash),
            status,
            entry.submitted_at.format("%Y-%m-%d %H:%M").to_string(),
            short(&entry.submit_tx),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn watch_events(app: &App, from_block: Option<u64>, mine_only: bool) -> Result<()> {
    let mut watcher = EventWatcher::new(
        app.gateway()?,
        app.reader.clone(),
        app.network().poll_interval(),
    );
    if let Some(block) = from_block {
        watcher = watcher.from_block(block);
    }
    if mine_only {
        let account = app
            .account()
            .ok_or_else(|| anyhow!("Configure a private key to filter by your account"))?;
        watcher = watcher.only_predictor(account);
    }

    let head = app.reader.current_block().await?;
    println!(
        "Watching prediction events from block {} (Ctrl+C to stop)",
        from_block.unwrap_or(head.number + 1)
    );

    let mut events = watcher.spawn();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn print_event(event: &PredictionEvent) {
    match event {
        PredictionEvent::Submitted {
            predictor,
            target_block,
            predicted_hash,
            block_number,
            ..
        } => println!(
            "[{}] {} predicted block {}: {}",
            block_number.map_or("?".to_string(), |n| n.to_string()),
            shorten_address(&format_address(predictor)),
            target_block,
            short(predicted_hash)
        ),
        PredictionEvent::Revealed {
            predictor,
            target_block,
            is_correct,
            actual_hash,
            block_number,
            ..
        } => println!(
            "[{}] {} revealed block {}: {} (actual {})",
            block_number.map_or("?".to_string(), |n| n.to_string()),
            shorten_address(&format_address(predictor)),
            target_block,
            if *is_correct { "CORRECT" } else { "incorrect" },
            short(actual_hash)
        ),
    }
}
