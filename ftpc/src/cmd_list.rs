/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use clap::{Arg, ArgMatches, Command};

use ftpc_client::FtpSession;

pub(super) const COMMAND_LIST: &str = "list";
pub(super) const COMMAND_NLST: &str = "nlst";
pub(super) const COMMAND_DIR: &str = "dir";

const COMMAND_ARG_PATH: &str = "path";

fn path_arg() -> Arg {
    Arg::new(COMMAND_ARG_PATH)
        .value_name("PATH")
        .num_args(1)
}

pub(super) fn list_command() -> Command {
    Command::new(COMMAND_LIST)
        .about("List path in server format")
        .arg(path_arg())
}

pub(super) fn nlst_command() -> Command {
    Command::new(COMMAND_NLST)
        .about("List names in path")
        .arg(path_arg())
}

pub(super) fn dir_command() -> Command {
    Command::new(COMMAND_DIR)
        .about("List path as json entries")
        .arg(path_arg())
}

fn list_args(args: &ArgMatches) -> Vec<&str> {
    args.get_one::<String>(COMMAND_ARG_PATH)
        .map(|s| vec![s.as_str()])
        .unwrap_or_default()
}

pub(super) async fn run_list(session: &mut FtpSession, args: &ArgMatches) -> anyhow::Result<()> {
    for line in session.list(&list_args(args)).await? {
        println!("{line}");
    }
    Ok(())
}

pub(super) async fn run_nlst(session: &mut FtpSession, args: &ArgMatches) -> anyhow::Result<()> {
    for name in session.nlst(&list_args(args)).await? {
        println!("{name}");
    }
    Ok(())
}

pub(super) async fn run_dir(session: &mut FtpSession, args: &ArgMatches) -> anyhow::Result<()> {
    for entry in session.dir(&list_args(args)).await? {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}
