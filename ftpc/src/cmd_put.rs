/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use tokio::fs::File;

use ftpc_client::FtpSession;

use super::progress;

pub(super) const COMMAND: &str = "put";

const COMMAND_ARG_LOCAL: &str = "local";
const COMMAND_ARG_REMOTE: &str = "remote";
const COMMAND_ARG_QUIET: &str = "quiet";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Upload a file")
        .arg(
            Arg::new(COMMAND_ARG_LOCAL)
                .value_name("LOCAL PATH")
                .value_parser(value_parser!(PathBuf))
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_REMOTE)
                .value_name("REMOTE PATH")
                .num_args(1),
        )
        .arg(
            Arg::new(COMMAND_ARG_QUIET)
                .help("Do not show progress")
                .action(ArgAction::SetTrue)
                .long(COMMAND_ARG_QUIET)
                .short('q'),
        )
}

pub(super) async fn run(session: &mut FtpSession, args: &ArgMatches) -> anyhow::Result<()> {
    let local = args
        .get_one::<PathBuf>(COMMAND_ARG_LOCAL)
        .ok_or_else(|| anyhow!("no local path set"))?;
    let remote = match args.get_one::<String>(COMMAND_ARG_REMOTE) {
        Some(s) => s.clone(),
        None => local
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("no file name found in local path {}", local.display()))?,
    };

    let file = File::open(local)
        .await
        .map_err(|e| anyhow!("failed to open local file {}: {e}", local.display()))?;
    let size = file.metadata().await.ok().map(|m| m.len());
    let bar = progress::transfer_bar(&remote, size, args.get_flag(COMMAND_ARG_QUIET))?;

    let mut reader = bar.wrap_async_read(file);
    let copied = session.store_from(&remote, &mut reader).await?;
    bar.finish();
    log::info!("sent {copied} bytes to {remote}");
    Ok(())
}
