// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spack - web-asset bundler for the Spacey toolchain
//!
//! This is the main entry point for the spack binary.

use anyhow::{bail, Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use spacey_bundler::{Bundler, Options, OsFileSystem, Severity, Target};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{BuildArgs, Cli, Commands, GraphArgs};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let options = load_options(&cli)?;

    match &cli.command {
        Commands::Build(args) => build(args, &cli, options),
        Commands::Graph(args) => graph(args, options),
    }
}

/// Load the base option set from the config file, if any.
fn load_options(cli: &Cli) -> Result<Options> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let default = std::path::PathBuf::from("spack.json");
            default.exists().then_some(default)
        }
    };
    let Some(path) = path else {
        return Ok(Options::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read config '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("cannot parse config '{}'", path.display()))
}

fn build(args: &BuildArgs, cli: &Cli, mut options: Options) -> Result<()> {
    if let Some(target) = &args.target {
        match Target::parse(target) {
            Some(target) => options.target = Some(target),
            None => bail!("unknown target '{target}'"),
        }
    }
    if args.source_map {
        options.output.source_map = true;
    }

    let mut bundler = Bundler::new(options, OsFileSystem);
    let entry = bundler
        .get_module(&args.entry)
        .with_context(|| format!("cannot load entry '{}'", args.entry.display()))?;

    let mut errors = 0usize;
    let mut warnings = 0usize;
    for module in bundler.modules() {
        for report in &module.reports {
            match report.severity {
                Severity::Error => {
                    errors += 1;
                    if !cli.quiet {
                        eprintln!("{} {report}", "error:".red().bold());
                    }
                }
                Severity::Warning => {
                    warnings += 1;
                    if !cli.quiet {
                        eprintln!("{} {report}", "warning:".yellow().bold());
                    }
                }
            }
            if cli.verbose {
                let content: &str = &module.content;
                let excerpt = report.excerpt(content);
                if !excerpt.is_empty() {
                    eprintln!("    {}", excerpt.dimmed());
                }
            }
        }
    }

    for output in bundler.save(entry) {
        match &args.out {
            Some(out) => {
                let path = if bundler.module(entry).file.path() == output.path {
                    out.clone()
                } else {
                    // extracted sibling lands next to the main output
                    out.with_file_name(
                        output
                            .path
                            .file_name()
                            .map(|n| n.to_os_string())
                            .unwrap_or_default(),
                    )
                };
                std::fs::write(&path, &output.text)
                    .with_context(|| format!("cannot write '{}'", path.display()))?;
                if let Some(map) = &output.source_map {
                    let map_path = format!("{}.map", path.display());
                    std::fs::write(&map_path, map)
                        .with_context(|| format!("cannot write '{map_path}'"))?;
                }
                if !cli.quiet {
                    println!(
                        "{} {} ({} bytes)",
                        "emitted".green().bold(),
                        path.display(),
                        output.text.len()
                    );
                }
            }
            None => print!("{}", output.text),
        }
    }

    if !cli.quiet && (errors > 0 || warnings > 0) {
        eprintln!(
            "{} {errors} error(s), {warnings} warning(s)",
            "done with".bold()
        );
    }
    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn graph(args: &GraphArgs, options: Options) -> Result<()> {
    let mut bundler = Bundler::new(options, OsFileSystem);
    let entry = bundler
        .get_module(&args.entry)
        .with_context(|| format!("cannot load entry '{}'", args.entry.display()))?;

    println!("{}", "require closure (emission order):".bold());
    for id in bundler.all_requires(entry) {
        let m = bundler.module(id);
        println!(
            "  {} {:?} ({} bytes)",
            m.file.path().display(),
            m.ty,
            m.file.len()
        );
    }

    let excluded = bundler.all_externals(entry);
    if !excluded.is_empty() {
        println!("{}", "excluded (externals):".bold());
        for id in excluded {
            println!("  {}", bundler.module(id).file.path().display().dimmed());
        }
    }
    Ok(())
}
