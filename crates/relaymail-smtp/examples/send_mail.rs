#![allow(clippy::expect_used, clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: Send one message through a submission relay
//!
//! Connects on port 587, upgrades with STARTTLS, authenticates with CRAM-MD5
//! if the relay offers it (PLAIN otherwise) and prints the session
//! transcript. Credentials never appear in the transcript.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=relaymail_smtp=debug cargo run --package relaymail-smtp --example send_mail
//! ```

use std::io::{self, Write};

use relaymail_sasl::{CramMd5, Login, Mechanism, Plain};
use relaymail_smtp::{Address, Config, Envelope, send_mail};

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("relaymail - send a test message");
    println!("===============================\n");

    let host = prompt("Relay host")?;
    let username = prompt("Username")?;
    let password = prompt("Password")?;
    let from = Address::new(prompt("From")?)?;
    let to = Address::new(prompt("To")?)?;

    let config = Config::new(host.as_str());
    let mechanisms: Vec<Box<dyn Mechanism>> = vec![
        Box::new(Plain::new("", username.as_str(), password.as_str(), host.as_str())),
        Box::new(Login::new(username.as_str(), password.as_str(), host.as_str())),
        Box::new(CramMd5::new(username.as_str(), password.as_str())),
    ];
    let envelope = Envelope::new(from.clone(), vec![to.clone()])?;
    let body = format!(
        "From: {}\r\nTo: {}\r\nSubject: relaymail test\r\n\r\nHello from relaymail.\r\n",
        from, to
    );

    println!("\nConnecting to {}:{}...", config.host, config.port);
    let delivery = send_mail(&config, mechanisms, &envelope, body.as_bytes()).await;

    println!("\nTranscript:\n{}", delivery.transcript_text());
    match delivery.result {
        Ok(()) => println!("✓ Message accepted"),
        Err(e) => println!("✗ Delivery failed: {}", e),
    }

    Ok(())
}
