/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command, value_parser};

use ftpc_client::{FtpClientConfig, FtpSession};

pub(super) const COMMAND: &str = "fxp";

const COMMAND_ARG_SOURCE: &str = "source";
const COMMAND_ARG_TO_SERVER: &str = "to-server";
const COMMAND_ARG_TARGET: &str = "target";
const COMMAND_ARG_TO_USERNAME: &str = "to-username";
const COMMAND_ARG_TO_PASSWORD: &str = "to-password";
const COMMAND_ARG_WAIT: &str = "wait";

const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(600);

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Copy a file to another server, server to server")
        .arg(
            Arg::new(COMMAND_ARG_SOURCE)
                .value_name("SOURCE PATH")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_TO_SERVER)
                .value_name("TARGET SERVER ADDRESS")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_TARGET)
                .value_name("TARGET PATH")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_TO_USERNAME)
                .help("Username on the target server")
                .value_name("USERNAME")
                .num_args(1)
                .long(COMMAND_ARG_TO_USERNAME),
        )
        .arg(
            Arg::new(COMMAND_ARG_TO_PASSWORD)
                .help("Password on the target server")
                .value_name("PASSWORD")
                .num_args(1)
                .long(COMMAND_ARG_TO_PASSWORD),
        )
        .arg(
            Arg::new(COMMAND_ARG_WAIT)
                .help("Time in seconds to wait for the transfer to complete")
                .value_name("SECONDS")
                .num_args(1)
                .value_parser(value_parser!(u64))
                .long(COMMAND_ARG_WAIT),
        )
}

fn get_arg<'a>(args: &'a ArgMatches, id: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(id)
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow!("no {id} argument set"))
}

pub(super) async fn run(
    source: &mut FtpSession,
    config: &Arc<FtpClientConfig>,
    args: &ArgMatches,
) -> anyhow::Result<()> {
    let source_path = get_arg(args, COMMAND_ARG_SOURCE)?;
    let target_path = get_arg(args, COMMAND_ARG_TARGET)?;
    let to_server = super::config::server_addr(
        get_arg(args, COMMAND_ARG_TO_SERVER)?,
        config.tls_implicit(),
    );
    let wait_time = args
        .get_one::<u64>(COMMAND_ARG_WAIT)
        .map(|secs| Duration::from_secs(*secs))
        .unwrap_or(DEFAULT_WAIT_TIME);

    let mut target = FtpSession::connect(&to_server, config.connect_timeout(), config.clone())
        .await
        .context(format!("failed to connect to {to_server}"))?;
    let username = args
        .get_one::<String>(COMMAND_ARG_TO_USERNAME)
        .map(|s| s.as_str())
        .unwrap_or(super::ANONYMOUS_USERNAME);
    let password = args
        .get_one::<String>(COMMAND_ARG_TO_PASSWORD)
        .map(|s| s.as_str())
        .unwrap_or(super::ANONYMOUS_PASSWORD);
    target.login(username, password).await?;
    target.set_type("I").await?;

    let result = transfer(source, &mut target, source_path, target_path, wait_time).await;
    if let Err(e) = target.quit().await {
        log::debug!("failed to close target session: {e}");
    }
    result
}

async fn transfer(
    source: &mut FtpSession,
    target: &mut FtpSession,
    source_path: &str,
    target_path: &str,
    wait_time: Duration,
) -> anyhow::Result<()> {
    let addr = source.pasv().await?;
    log::info!("source server is listening on {addr}");
    if addr.is_ipv4() {
        target.port(addr).await?;
    } else {
        target.eprt(addr).await?;
    }
    target.stor(target_path).await?;
    source.retr(source_path).await?;

    let (source_end, target_end) = tokio::join!(
        source.wait_reply("RETR", Some(226), wait_time),
        target.wait_reply("STOR", Some(226), wait_time),
    );
    source_end.context("source server failed to send")?;
    target_end.context("target server failed to receive")?;
    log::info!("copied {source_path} to {target_path}");
    Ok(())
}
