// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nodeflow` - headless driver for calculator scenes.
//!
//! Builds, evaluates and edits scene files without a window. The same
//! documents open unchanged in any front end built on `nodeflow_graph`.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Calculator node graph tool
#[derive(Parser, Debug)]
#[command(name = "nodeflow", version, about, long_about = None)]
struct Cli {
    /// Editor settings file (RON)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a small example scene: 5 * 2 shown by an output node
    Demo {
        /// Where to write the scene
        out: PathBuf,
    },

    /// Load a scene, evaluate it and print every output result
    Eval {
        /// Scene file
        file: PathBuf,
    },

    /// Change the constant of an input node and save the result
    Set {
        /// Scene file
        file: PathBuf,
        /// Id of the input node
        #[arg(long)]
        node: u64,
        /// New value
        #[arg(long, allow_hyphen_values = true)]
        value: f64,
        /// Write here instead of overwriting `file`
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the registered node types
    Nodes,
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nodeflow=info,nodeflow_graph=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("nodeflow v{}", env!("CARGO_PKG_VERSION"));

    let result = commands::load_settings(cli.settings.as_deref()).and_then(|settings| match cli.command {
        Command::Demo { out } => commands::demo(&settings, &out),
        Command::Eval { file } => commands::eval(&settings, &file),
        Command::Set {
            file,
            node,
            value,
            output,
        } => commands::set(&settings, &file, node, value, output.as_deref()),
        Command::Nodes => {
            commands::list_nodes();
            Ok(())
        }
    });

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
