//! Command-line argument parsing

use clap::{Args, Parser, Subcommand};
use iwdrs::{BusKind, ClientConfig, HiddenMode};

#[derive(Parser, Debug)]
#[command(name = "iwdctl-rs", version, about = "Drive iwd from the command line")]
pub struct Cli {
    /// Wireless device name
    #[arg(short, long, global = true, default_value = "wlan0")]
    pub device: String,

    /// Talk to iwd on the session bus instead of the system bus
    #[arg(long, global = true)]
    pub session_bus: bool,

    /// Bus name of the iwd service
    #[arg(long, global = true, default_value = "net.connman.iwd")]
    pub service: String,

    /// Object path the credential agent is served at
    #[arg(long, global = true, default_value = "/iwd_agent")]
    pub agent_path: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask the station to scan
    Scan,
    /// List visible networks, best first
    Networks,
    /// List known networks
    Known,
    /// Connect to a network
    Connect(ConnectArgs),
    /// Forget a known network
    Forget {
        ssid: String,
    },
    /// Print station changes until interrupted
    Monitor,
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    pub ssid: String,

    /// Passphrase handed to iwd when it asks for one
    #[arg(short, long)]
    pub passphrase: Option<String>,

    /// The network is hidden
    #[arg(long, conflicts_with = "auto_hidden")]
    pub hidden: bool,

    /// Fall back to a hidden connect if the network is not visible
    #[arg(long)]
    pub auto_hidden: bool,
}

impl ConnectArgs {
    pub fn mode(&self) -> HiddenMode {
        if self.hidden {
            HiddenMode::Hidden
        } else if self.auto_hidden {
            HiddenMode::AutoHidden
        } else {
            HiddenMode::NotHidden
        }
    }
}

impl Cli {
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            bus: if self.session_bus {
                BusKind::Session
            } else {
                BusKind::System
            },
            service: self.service.clone(),
            agent_path: self.agent_path.clone(),
        }
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
