/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressFinish, ProgressStyle};

const PROGRESS_STYLE: &str =
    "{msg} [{elapsed_precise}] [{wide_bar}] {bytes}/{total_bytes} {binary_bytes_per_sec} {eta}";
const SPINNER_STYLE: &str = "{spinner} {msg} [{elapsed_precise}] {bytes} {binary_bytes_per_sec}";

/// A progress bar on stderr, a spinner if the size is not known.
pub(crate) fn transfer_bar(
    name: &str,
    size: Option<u64>,
    quiet: bool,
) -> anyhow::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let bar = match size {
        Some(len) => ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::stderr())
            .with_style(ProgressStyle::with_template(PROGRESS_STYLE)?),
        None => ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr())
            .with_style(ProgressStyle::with_template(SPINNER_STYLE)?),
    };
    Ok(bar
        .with_message(name.to_string())
        .with_finish(ProgressFinish::AndLeave))
}
