/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use clap_complete::Shell;

use ftpc_client::{FtpClientConfig, FtpSession};

mod config;
mod logger;
mod progress;

mod cmd_fxp;
mod cmd_get;
mod cmd_info;
mod cmd_list;
mod cmd_path;
mod cmd_put;

const GLOBAL_ARG_COMPLETION: &str = "completion";
const GLOBAL_ARG_SERVER: &str = "server";
const GLOBAL_ARG_USERNAME: &str = "username";
const GLOBAL_ARG_PASSWORD: &str = "password";
const GLOBAL_ARG_ASCII: &str = "ascii";
const GLOBAL_ARG_VERBOSE: &str = "verbose";

const ANONYMOUS_USERNAME: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

fn build_cli_args() -> Command {
    let cmd = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new(GLOBAL_ARG_COMPLETION)
                .num_args(1)
                .value_name("SHELL")
                .long("completion")
                .value_parser(value_parser!(Shell))
                .exclusive(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SERVER)
                .help("FTP server address")
                .num_args(1)
                .value_name("SERVER ADDRESS")
                .required_unless_present(GLOBAL_ARG_COMPLETION),
        )
        .arg(
            Arg::new(GLOBAL_ARG_USERNAME)
                .help("FTP username")
                .num_args(1)
                .value_name("USERNAME")
                .short('u')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_PASSWORD)
                .help("FTP password")
                .num_args(1)
                .value_name("PASSWORD")
                .short('p')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_ASCII)
                .help("Use ascii instead of binary transfer type")
                .action(ArgAction::SetTrue)
                .long(GLOBAL_ARG_ASCII)
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_VERBOSE)
                .help("Show verbose message")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .global(true),
        );
    config::append_args(cmd)
        .subcommand(cmd_list::list_command())
        .subcommand(cmd_list::nlst_command())
        .subcommand(cmd_list::dir_command())
        .subcommand(cmd_get::command())
        .subcommand(cmd_put::command())
        .subcommand(cmd_path::del_command())
        .subcommand(cmd_path::mkdir_command())
        .subcommand(cmd_path::rmdir_command())
        .subcommand(cmd_path::rename_command())
        .subcommand(cmd_path::pwd_command())
        .subcommand(cmd_path::size_command())
        .subcommand(cmd_info::syst_command())
        .subcommand(cmd_info::feat_command())
        .subcommand(cmd_fxp::command())
}

async fn run_subcommand(
    session: &mut FtpSession,
    config: &Arc<FtpClientConfig>,
    subcommand: &str,
    args: &ArgMatches,
) -> anyhow::Result<()> {
    match subcommand {
        cmd_list::COMMAND_LIST => cmd_list::run_list(session, args).await,
        cmd_list::COMMAND_NLST => cmd_list::run_nlst(session, args).await,
        cmd_list::COMMAND_DIR => cmd_list::run_dir(session, args).await,
        cmd_get::COMMAND => cmd_get::run(session, args).await,
        cmd_put::COMMAND => cmd_put::run(session, args).await,
        cmd_path::COMMAND_DEL
        | cmd_path::COMMAND_MKDIR
        | cmd_path::COMMAND_RMDIR
        | cmd_path::COMMAND_RENAME
        | cmd_path::COMMAND_PWD
        | cmd_path::COMMAND_SIZE => cmd_path::run(session, subcommand, args).await,
        cmd_info::COMMAND_SYST => cmd_info::run_syst(session).await,
        cmd_info::COMMAND_FEAT => cmd_info::run_feat(session).await,
        cmd_fxp::COMMAND => cmd_fxp::run(session, config, args).await,
        cmd => Err(anyhow!("invalid subcommand {cmd}")),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = build_cli_args().get_matches();

    if let Some(target) = args.get_one::<Shell>(GLOBAL_ARG_COMPLETION) {
        let mut app = build_cli_args();
        let bin_name = app.get_name().to_string();
        clap_complete::generate(*target, &mut app, bin_name, &mut io::stdout());
        return Ok(());
    }

    let verbose_level = args
        .get_one::<u8>(GLOBAL_ARG_VERBOSE)
        .copied()
        .unwrap_or_default();
    logger::SyncLogger::new(verbose_level)
        .into_global_logger()
        .map_err(|e| anyhow!("failed to set logger: {e}"))?;

    let config = Arc::new(config::build(&args)?);

    let Some((subcommand, sub_args)) = args.subcommand() else {
        return Err(anyhow!("no subcommand found"));
    };

    let server = args
        .get_one::<String>(GLOBAL_ARG_SERVER)
        .ok_or_else(|| anyhow!("no server address set"))?;
    let server = config::server_addr(server, config.tls_implicit());
    let username = args
        .get_one::<String>(GLOBAL_ARG_USERNAME)
        .map(|s| s.as_str())
        .unwrap_or(ANONYMOUS_USERNAME);
    let password = args
        .get_one::<String>(GLOBAL_ARG_PASSWORD)
        .map(|s| s.as_str())
        .unwrap_or(ANONYMOUS_PASSWORD);

    let mut session = FtpSession::connect(&server, config.connect_timeout(), config.clone())
        .await
        .context(format!("failed to connect to {server}"))?;
    session.login(username, password).await?;
    let transfer_type = if args.get_flag(GLOBAL_ARG_ASCII) {
        "A"
    } else {
        "I"
    };
    session.set_type(transfer_type).await?;

    let ret = run_subcommand(&mut session, &config, subcommand, sub_args).await;

    let quit = session.quit().await;
    merge_quit_result(ret, quit)
}

/// The subcommand error wins, a quit error is only reported if nothing else failed.
fn merge_quit_result(ret: anyhow::Result<()>, quit: io::Result<()>) -> anyhow::Result<()> {
    match (ret, quit) {
        (Ok(_), Err(e)) => Err(anyhow!("failed to close session: {e}")),
        (Err(e), Err(qe)) => {
            log::warn!("failed to close session: {qe}");
            Err(e)
        }
        (ret, Ok(_)) => ret,
    }
}
