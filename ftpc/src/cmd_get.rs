/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use ftpc_client::FtpSession;

use super::progress;

pub(super) const COMMAND: &str = "get";

const COMMAND_ARG_REMOTE: &str = "remote";
const COMMAND_ARG_LOCAL: &str = "local";
const COMMAND_ARG_QUIET: &str = "quiet";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Download a file, use '-' as local path to write to stdout")
        .arg(
            Arg::new(COMMAND_ARG_REMOTE)
                .value_name("REMOTE PATH")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_LOCAL)
                .value_name("LOCAL PATH")
                .value_parser(value_parser!(PathBuf))
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

fn local_path(remote: &str) -> anyhow::Result<PathBuf> {
    Path::new(remote)
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("no file name found in remote path {remote}"))
}

pub(super) async fn run(session: &mut FtpSession, args: &ArgMatches) -> anyhow::Result<()> {
    let remote = args
        .get_one::<String>(COMMAND_ARG_REMOTE)
        .ok_or_else(|| anyhow!("no remote path set"))?;
    let local = match args.get_one::<PathBuf>(COMMAND_ARG_LOCAL) {
        Some(p) => p.clone(),
        None => local_path(remote)?,
    };

    if local.as_os_str() == "-" {
        let mut stdout = tokio::io::stdout();
        session.retrieve_to(remote, &mut stdout).await?;
        stdout.flush().await?;
        return Ok(());
    }

    let size = match session.size(remote).await {
        Ok(size) => Some(size),
        Err(e) => {
            log::debug!("unable to get size of {remote}: {e}");
            None
        }
    };
    let bar = progress::transfer_bar(remote, size, args.get_flag(COMMAND_ARG_QUIET))?;

    let file = File::create(&local)
        .await
        .map_err(|e| anyhow!("failed to create local file {}: {e}", local.display()))?;
    let mut writer = bar.wrap_async_write(file);
    let copied = session.retrieve_to(remote, &mut writer).await?;
    bar.finish();
    log::info!("received {copied} bytes into {}", local.display());
    Ok(())
}
