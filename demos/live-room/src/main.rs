//! Signs in, joins one room and prints every state change.
//!
//! ```text
//! GAVEL_USER=alice GAVEL_PASSWORD=secret cargo run -p live-room -- 7 [bid]
//! ```
//!
//! `GAVEL_API` and `GAVEL_STREAM` override the default endpoints;
//! `RUST_LOG` controls logging.

use std::env;
use std::process::ExitCode;

use gavel::prelude::*;
use tracing_subscriber::EnvFilter;

struct Args {
    room_id: RoomId,
    bid: Option<u64>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let room_id = args
        .next()
        .ok_or("usage: live-room <room-id> [bid]")?
        .parse::<u64>()
        .map_err(|e| format!("room id: {e}"))?;
    let bid = args
        .next()
        .map(|raw| raw.parse::<u64>().map_err(|e| format!("bid: {e}")))
        .transpose()?;
    Ok(Args {
        room_id: RoomId(room_id),
        bid,
    })
}

fn print_snapshot(snapshot: &RoomSnapshot) {
    let price = snapshot
        .current_price()
        .map_or_else(|| "-".to_owned(), |p| p.to_string());
    let leader = snapshot
        .leading_user_id()
        .map_or_else(|| "nobody".to_owned(), |u| u.to_string());
    let pending = match (snapshot.pending, snapshot.unconfirmed) {
        (Some(p), _) => format!(" (your bid of {} is pending)", p.amount),
        (None, Some(amount)) => format!(" (your bid of {amount} is unconfirmed)"),
        (None, None) => String::new(),
    };
    let clock = snapshot
        .seconds_remaining
        .map_or_else(String::new, |s| format!(" | {s}s left"));
    println!(
        "[{}] {} | price {price} | leader {leader}{clock} | {} online{pending}",
        snapshot.room_id,
        snapshot.status,
        snapshot.participants.iter().filter(|p| p.online).count(),
    );
    if snapshot.active_lot.is_none() {
        if let Some(result) = snapshot.last_result() {
            match result.winner_user_id {
                Some(winner) => println!(
                    "  {} sold to {winner} for {}",
                    result.lot_id, result.winning_price
                ),
                None => println!("  {} closed without bids", result.lot_id),
            }
        }
    }
}

async fn run(args: Args) -> Result<(), GavelError> {
    let mut builder = GavelClient::builder().credentials_dir(".gavel");
    if let Ok(url) = env::var("GAVEL_API") {
        builder = builder.base_url(url);
    }
    if let Ok(url) = env::var("GAVEL_STREAM") {
        builder = builder.stream_url(url);
    }
    let client = builder.build().await?;

    if !client.current_session().is_authenticated() {
        let user = env::var("GAVEL_USER").unwrap_or_default();
        let password = env::var("GAVEL_PASSWORD").unwrap_or_default();
        client.login(&user, &password).await?;
    }

    let view = client.join_room(args.room_id).await?;
    print_snapshot(&view.snapshot());

    if let Some(amount) = args.bid {
        match view.submit_bid(amount).await {
            Ok(receipt) => println!("bid sent: {}", receipt.message),
            Err(e) => println!("bid failed: {e}"),
        }
    }

    let mut changes = view.watch();
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = changes.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    view.close();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
