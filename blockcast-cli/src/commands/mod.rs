pub mod block;
pub mod history;
pub mod predict;

pub use block::{handle_block_command, handle_network_command, BlockCommands, NetworkCommands};
pub use history::{list_predictions, watch_events};
pub use predict::{reveal_prediction, show_candidates, show_status, submit_prediction};

use blockcast_core::types::{format_hash, shorten_hash};
use blockcast_core::{BlockSnapshot, PredictionRecord};

pub(crate) fn print_snapshot(snapshot: &BlockSnapshot) {
    println!("  Number: {}", snapshot.number);
    println!("  Hash: {}", format_hash(&snapshot.hash));
    match snapshot.datetime() {
        Some(time) => println!("  Time: {}", time.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Timestamp: {}", snapshot.timestamp),
    }
}

pub(crate) fn print_record(record: &PredictionRecord) {
    println!("  Predicted: {}", format_hash(&record.predicted_hash));
    match record.outcome() {
        Some(is_correct) => {
            println!("  Actual: {}", format_hash(&record.actual_hash));
            println!(
                "  Result: {}",
                if is_correct { "CORRECT" } else { "incorrect" }
            );
        }
        None => println!("  Status: waiting for reveal"),
    }
}

pub(crate) fn short(hash: &blockcast_core::H256) -> String {
    shorten_hash(&format_hash(hash), 8)
}
