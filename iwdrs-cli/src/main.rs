//! iwdctl-rs: a small command-line front end for iwdrs.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use iwdrs::{ClientEvent, IwdClient};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    let (tx, mut events) = mpsc::unbounded_channel::<ClientEvent>();
    let client = IwdClient::with_config(cli.config(), tx)
        .await
        .context("failed to start the iwd client")?;

    wait_ready(&mut events, &cli).await?;

    let result = run(&client, &cli, &mut events).await;
    client.shutdown().await?;
    result
}

/// Waits for the startup snapshot, printing it when monitoring.
async fn wait_ready(events: &mut mpsc::UnboundedReceiver<ClientEvent>, cli: &Cli) -> anyhow::Result<()> {
    while let Some(event) = events.recv().await {
        if event == ClientEvent::Ready {
            info!("iwd is ready");
            return Ok(());
        }
        if matches!(cli.command, Command::Monitor) {
            print_event(&event, cli.json)?;
        } else {
            debug!("Startup state: {event:?}");
        }
    }
    bail!("client stopped before iwd became ready")
}

async fn run(
    client: &IwdClient,
    cli: &Cli,
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
) -> anyhow::Result<()> {
    match &cli.command {
        Command::Scan => {
            client.scan(&cli.device).await?;
            println!("Scan started on {}", cli.device);
        }
        Command::Networks => {
            let networks = client.ordered_networks(&cli.device).await?;
            if cli.json {
                print_json(&networks)?;
            } else {
                for net in &networks {
                    println!(
                        "{} {:<32} {:<6} {:>4.0} dBm{}",
                        if net.connected { "*" } else { " " },
                        net.name,
                        net.security,
                        net.signal_dbm(),
                        if net.is_known() { "  known" } else { "" },
                    );
                }
            }
        }
        Command::Known => {
            let known = client.known_networks().await?;
            if cli.json {
                print_json(&known)?;
            } else {
                for net in &known {
                    println!(
                        "{:<32} {:<6}{}",
                        net.name,
                        net.security,
                        if net.hidden { "  hidden" } else { "" }
                    );
                }
            }
        }
        Command::Connect(args) => {
            client
                .connect(&cli.device, &args.ssid, args.passphrase.as_deref(), args.mode())
                .await
                .with_context(|| format!("failed to connect to '{}'", args.ssid))?;
            println!("Connected to {}", args.ssid);
        }
        Command::Forget { ssid } => {
            client
                .forget(ssid)
                .await
                .with_context(|| format!("failed to forget '{ssid}'"))?;
            println!("Forgot {ssid}");
        }
        Command::Monitor => loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => print_event(&event, cli.json)?,
                    None => bail!("client stopped"),
                },
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for Ctrl-C")?;
                    break;
                }
            }
        },
    }
    Ok(())
}

fn print_event(event: &ClientEvent, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(event);
    }
    match event {
        ClientEvent::Ready => println!("ready"),
        ClientEvent::Scanning {
            device, scanning, ..
        } => println!("{device}: {}", if *scanning { "scanning" } else { "scan done" }),
        ClientEvent::ConnectedSsid { device, ssid, .. } => match ssid {
            Some(ssid) => println!("{device}: connected to {ssid}"),
            None => println!("{device}: disconnected"),
        },
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
