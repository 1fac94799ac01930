/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use log::Level;

pub const FTP_DEBUG_LOG_LEVEL: Level = Level::Debug;
pub const FTP_DEBUG_LOG_TARGET: &str = "ftpc_client";

#[macro_export]
macro_rules! log_msg {
    ($($arg:tt)+) => (
        log::log!(target: $crate::FTP_DEBUG_LOG_TARGET, $crate::FTP_DEBUG_LOG_LEVEL, $($arg)+)
    )
}

/// The text to trace for a command line, with the password hidden.
pub(crate) fn redact_cmd(cmd: &str) -> &str {
    match cmd.get(..5) {
        Some(p) if p.eq_ignore_ascii_case("PASS ") => "PASS ***",
        _ => cmd,
    }
}

#[inline]
pub(crate) fn log_cmd(cmd: &str) {
    log::log!(
        target: FTP_DEBUG_LOG_TARGET,
        FTP_DEBUG_LOG_LEVEL,
        "> {}",
        redact_cmd(cmd)
    );
}

#[inline]
pub(crate) fn log_rsp(rsp: &str) {
    log::log!(
        target: FTP_DEBUG_LOG_TARGET,
        FTP_DEBUG_LOG_LEVEL,
        "< {}",
        rsp
    );
}
