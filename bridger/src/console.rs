//! Operator-facing terminal output.
//!
//! Everything the operator is meant to read goes through here as colored
//! lines on stdout. Diagnostics go to `tracing` on stderr instead.

use std::io::{self, Write};
use std::time::Duration;

use alloy::primitives::TxHash;

use crate::chain::{BridgeSettings, ChainProfile};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

fn line(color: &str, tag: &str, msg: &str) {
    println!("{color}[{tag}] {msg}{RESET}");
}

pub fn info(msg: &str) {
    line(GREEN, "✓", msg);
}

pub fn warn(msg: &str) {
    line(YELLOW, "⚠", msg);
}

pub fn error(msg: &str) {
    line(RED, "✗", msg);
}

pub fn success(msg: &str) {
    line(GREEN, "✅", msg);
}

pub fn loading(msg: &str) {
    line(CYAN, "⟳", msg);
}

pub fn step(msg: &str) {
    line(WHITE, "➤", msg);
}

pub fn section(title: &str) {
    let rule = "=".repeat(50);
    println!("\n{CYAN}{rule}{RESET}");
    if !title.is_empty() {
        println!("{CYAN}{BOLD}{title}{RESET}");
    }
    println!("{CYAN}{rule}{RESET}\n");
}

pub fn banner() {
    let rule = "=".repeat(45);
    println!("{MAGENTA}{rule}{RESET}");
    println!("{CYAN}{BOLD}  bridger: repeated UCS03 bridge transfers{RESET}");
    println!(
        "{CYAN}  started {}{RESET}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z")
    );
    println!("{MAGENTA}{rule}{RESET}\n");
}

/// Counts down `secs` seconds on a single rewritten line.
pub async fn countdown(secs: u64) {
    let mut stdout = io::stdout();
    for remaining in (1..=secs).rev() {
        let _ = write!(stdout, "\r{BLUE}[⏰] next transaction in {remaining}s {RESET}");
        let _ = stdout.flush();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    if secs > 0 {
        let _ = write!(stdout, "\r{}\r", " ".repeat(40));
        let _ = stdout.flush();
    }
}

/// Block explorer link for `hash`, or the bare hash when the chain has no explorer.
pub fn tx_link(chain: &ChainProfile, hash: &TxHash) -> String {
    match &chain.explorer_tx_url {
        Some(base) => format!("{base}{hash}"),
        None => hash.to_string(),
    }
}

pub fn packet_link(settings: &BridgeSettings, packet_hash: &str) -> String {
    format!("{}{packet_hash}", settings.bridge_explorer_url)
}
