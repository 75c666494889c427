// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI argument parsing for spack.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// spack - the Spacey web-asset bundler
#[derive(Parser, Debug)]
#[command(name = "spack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (default: spack.json if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bundle an entry asset and its transitive references
    #[command(alias = "b")]
    Build(BuildArgs),

    /// Print the module graph discovered from an entry asset
    #[command(alias = "g", alias = "ls")]
    Graph(GraphArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Entry asset (JavaScript, CSS, HTML, JSON or resource)
    #[arg(value_name = "ENTRY")]
    pub entry: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Emission target: browser, nodejs, tpack or requirejs
    #[arg(short, long)]
    pub target: Option<String>,

    /// Emit a source map alongside the bundle
    #[arg(long)]
    pub source_map: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    /// Entry asset
    #[arg(value_name = "ENTRY")]
    pub entry: PathBuf,
}
