pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "realty-gate")]
#[command(about = "Access gate for the brokerage admin dashboard")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server with the access gate in front of every route")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT / REALTY_GATE_PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Show how a path is classified (unprotected, login, protected)")]
    Classify {
        #[arg(help = "Request path, e.g. /admin/properties")]
        path: String,
    },

    #[command(about = "Run the configured gate once against a path and cookies")]
    Evaluate {
        #[arg(help = "Request path, e.g. /admin/properties")]
        path: String,
        #[arg(long = "cookie", value_name = "NAME=VALUE", help = "Request cookie (repeatable)")]
        cookies: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve { port } => commands::serve::handle(port).await,
        Commands::Classify { path } => commands::gate::classify(&path, output_format),
        Commands::Evaluate { path, cookies } => commands::gate::evaluate(&path, &cookies, output_format).await,
    }
}
