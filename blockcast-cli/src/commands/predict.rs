use crate::app::App;
use crate::commands::{print_record, short};
use anyhow::{anyhow, bail, Result};
use blockcast_core::types::{format_address, format_hash, parse_address};
use blockcast_core::{ChainReader, ContractGateway, PredictionKey, PredictionStore, U256};
use blockcast_protocol::candidates::for_snapshot;
use blockcast_protocol::{SubmitOutcome, TransactionHandle};
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;

pub async fn show_candidates(app: &App, block: Option<u64>) -> Result<()> {
    let snapshot = match block {
        Some(n) => app.reader.block_by_number(n).await?,
        None => app.reader.current_block().await?,
    };
    let candidates = for_snapshot(&snapshot);

    println!(
        "Candidates for block {} (from block {} hash {})",
        snapshot.next_target(),
        snapshot.number,
        short(&snapshot.hash)
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Candidate hash"]);
    for (index, hash) in candidates.iter().enumerate() {
        table.add_row(vec![index.to_string(), format_hash(hash)]);
    }
    println!("{}", table);
    println!("Submit one with: blockcast submit --candidate <#>");

    Ok(())
}

pub async fn submit_prediction(
    app: &App,
    hash: Option<String>,
    candidate: Option<usize>,
    yes: bool,
    no_wait: bool,
) -> Result<()> {
    let session = app.session().await?;
    let submitter = app.submitter()?;

    let text = match (hash, candidate) {
        (Some(hash), None) => hash,
        (None, Some(index)) => {
            let head = app.reader.current_block().await?;
            let candidates = for_snapshot(&head);
            let hash = candidates
                .get(index)
                .ok_or_else(|| anyhow!("Candidate index must be 0-3, got {}", index))?;
            format_hash(hash)
        }
        (Some(_), Some(_)) => bail!("Give either a hash or --candidate, not both"),
        (None, None) => bail!("Give a hash to submit or pick one with --candidate"),
    };

    if !yes {
        let proceed = Confirm::new()
            .with_prompt(format!("Submit prediction {} for the next block?", text))
            .default(false)
            .interact()?;
        if !proceed {
            println!("Cancelled");
            return Ok(());
        }
    }

    let handle = submitter.submit(&session, &text).await?;
    println!("Prediction sent: {}", app.tx_line(&handle.tx_hash()));
    println!("  Expected target block: {}", handle.commitment().target_block);

    if no_wait {
        app.journal()
            .record_submission(handle.commitment(), handle.tx_hash())
            .await?;
        return Ok(());
    }

    println!("Waiting for confirmation...");
    let outcome = journal_and_wait(&app.journal(), &handle).await?;

    println!("Prediction confirmed!");
    println!("  Target block: {}", outcome.commitment.target_block);
    if let Some(block) = outcome.block_number {
        println!("  Included in block: {}", block);
    }
    println!(
        "Reveal after block {} is mined with: blockcast reveal {}",
        outcome.commitment.target_block, outcome.commitment.target_block
    );

    Ok(())
}

/// Journal a sent submission, then wait for it and move the entry to the
/// target the receipt reports. A timed out wait leaves the entry pending.
pub(crate) async fn journal_and_wait<G>(
    journal: &PredictionStore<'_>,
    handle: &TransactionHandle<G>,
) -> Result<SubmitOutcome>
where
    G: ContractGateway + ?Sized,
{
    journal
        .record_submission(handle.commitment(), handle.tx_hash())
        .await?;

    let outcome = handle.wait().await?;
    journal
        .confirm_submission(
            &handle.commitment().key(),
            &outcome.commitment,
            outcome.tx_hash,
        )
        .await?;
    Ok(outcome)
}

pub async fn reveal_prediction(app: &App, target_block: u64) -> Result<()> {
    let session = app.session().await?;
    let engine = app.reveal_engine()?;

    println!("Revealing prediction for block {}...", target_block);
    let outcome = engine.reveal_with_receipt(&session, target_block).await?;

    let key = PredictionKey::new(session.account(), target_block);
    if !app
        .journal()
        .mark_revealed(&key, &outcome.record, Some(outcome.tx_hash))
        .await?
    {
        tracing::debug!("Block {} was not in the local journal", target_block);
    }

    println!("Revealed: {}", app.tx_line(&outcome.tx_hash));
    print_record(&outcome.record);

    Ok(())
}

pub async fn show_status(
    app: &App,
    target_block: u64,
    predictor: Option<String>,
    json: bool,
) -> Result<()> {
    let predictor = match predictor {
        Some(text) => parse_address(&text)?,
        None => app
            .account()
            .ok_or_else(|| anyhow!("Give --predictor or configure a private key"))?,
    };

    let gateway = app.gateway()?;
    let record = gateway
        .get_prediction(predictor, U256::from(target_block))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    if !record.exists() {
        println!(
            "No prediction by {} for block {}",
            format_address(&predictor),
            target_block
        );
        return Ok(());
    }

    println!(
        "Prediction by {} for block {}:",
        format_address(&predictor),
        target_block
    );
    print_record(&record);

    if record.revealed {
        let key = PredictionKey::new(predictor, target_block);
        app.journal().mark_revealed(&key, &record, None).await?;
    } else if let Ok(head) = app.reader.current_block().await {
        let window = app.network().reveal_window;
        if head.number < target_block {
            println!("  Block {} is not mined yet", target_block);
        } else if head.number - target_block > window {
            println!("  Reveal window has passed; it can no longer be revealed");
        } else {
            println!(
                "  Reveal window: {} blocks left",
                window - (head.number - target_block)
            );
        }
    }

    Ok(())
}
