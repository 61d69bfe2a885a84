//! Print recent chat history from the local database.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use murmur_core::repository::message::MessageStore;
use murmur_types::message::{ChatMessage, HistoryFrame};

use crate::state::AppState;

pub async fn show_history(state: &AppState, limit: u32, json: bool) -> Result<()> {
    let messages = state.messages.recent(limit).await?;

    if json {
        let frames: Vec<HistoryFrame> = messages.iter().map(HistoryFrame::from).collect();
        println!("{}", serde_json::to_string_pretty(&frames)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!("  {} No messages yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    println!("{}", render_table(&messages));
    Ok(())
}

fn render_table(messages: &[ChatMessage]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("User").fg(Color::White),
        Cell::new("Message").fg(Color::White),
    ]);

    for msg in messages {
        table.add_row(vec![
            Cell::new(msg.timestamp.format("%Y-%m-%d %H:%M:%S")).fg(Color::DarkGrey),
            Cell::new(&msg.author_username).fg(Color::Cyan),
            Cell::new(&msg.body),
        ]);
    }

    table
}
