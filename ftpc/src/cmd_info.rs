/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use clap::Command;

use ftpc_client::FtpSession;

pub(super) const COMMAND_SYST: &str = "syst";
pub(super) const COMMAND_FEAT: &str = "feat";

pub(super) fn syst_command() -> Command {
    Command::new(COMMAND_SYST).about("Show the server system type")
}

pub(super) fn feat_command() -> Command {
    Command::new(COMMAND_FEAT).about("Show the features the server advertises")
}

pub(super) async fn run_syst(session: &mut FtpSession) -> anyhow::Result<()> {
    println!("{}", session.syst().await?);
    Ok(())
}

pub(super) async fn run_feat(session: &mut FtpSession) -> anyhow::Result<()> {
    for feature in session.feat().await? {
        println!("{feature}");
    }
    Ok(())
}
