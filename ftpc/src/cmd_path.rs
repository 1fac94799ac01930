/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};

use ftpc_client::FtpSession;

pub(super) const COMMAND_DEL: &str = "del";
pub(super) const COMMAND_MKDIR: &str = "mkdir";
pub(super) const COMMAND_RMDIR: &str = "rmdir";
pub(super) const COMMAND_RENAME: &str = "rename";
pub(super) const COMMAND_PWD: &str = "pwd";
pub(super) const COMMAND_SIZE: &str = "size";

const COMMAND_ARG_PATH: &str = "path";
const COMMAND_ARG_FROM: &str = "from";
const COMMAND_ARG_TO: &str = "to";

fn path_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name).about(about).arg(
        Arg::new(COMMAND_ARG_PATH)
            .value_name("PATH")
            .num_args(1)
            .required(true),
    )
}

pub(super) fn del_command() -> Command {
    path_command(COMMAND_DEL, "Delete a file")
}

pub(super) fn mkdir_command() -> Command {
    path_command(COMMAND_MKDIR, "Create a directory")
}

pub(super) fn rmdir_command() -> Command {
    path_command(COMMAND_RMDIR, "Remove a directory")
}

pub(super) fn size_command() -> Command {
    path_command(COMMAND_SIZE, "Get the size of a file")
}

pub(super) fn pwd_command() -> Command {
    Command::new(COMMAND_PWD).about("Print the working directory")
}

pub(super) fn rename_command() -> Command {
    Command::new(COMMAND_RENAME)
        .about("Rename a file or directory")
        .arg(
            Arg::new(COMMAND_ARG_FROM)
                .value_name("FROM PATH")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_TO)
                .value_name("TO PATH")
                .num_args(1)
                .required(true),
        )
}

fn get_arg<'a>(args: &'a ArgMatches, id: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(id)
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow!("no {id} argument set"))
}

pub(super) async fn run(
    session: &mut FtpSession,
    subcommand: &str,
    args: &ArgMatches,
) -> anyhow::Result<()> {
    match subcommand {
        COMMAND_DEL => session.delete(get_arg(args, COMMAND_ARG_PATH)?).await?,
        COMMAND_MKDIR => {
            let created = session.mkd(get_arg(args, COMMAND_ARG_PATH)?).await?;
            println!("{created}");
        }
        COMMAND_RMDIR => session.rmd(get_arg(args, COMMAND_ARG_PATH)?).await?,
        COMMAND_SIZE => {
            let size = session.size(get_arg(args, COMMAND_ARG_PATH)?).await?;
            println!("{size}");
        }
        COMMAND_PWD => println!("{}", session.pwd().await?),
        COMMAND_RENAME => {
            let from = get_arg(args, COMMAND_ARG_FROM)?;
            let to = get_arg(args, COMMAND_ARG_TO)?;
            session.rename(from, to).await?;
        }
        cmd => return Err(anyhow!("invalid path subcommand {cmd}")),
    }
    Ok(())
}
