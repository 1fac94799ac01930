/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use crate::error::FtpCommandError;

#[derive(Debug, Error)]
pub enum FtpConnectError {
    #[error("invalid server address {0}")]
    InvalidAddress(String),
    #[error("connect failed: {0:?}")]
    ConnectFailed(io::Error),
    #[error("timed out to connect")]
    ConnectTimedOut,
    #[error("invalid tls server name {0}")]
    InvalidServerName(String),
    #[error("tls handshake failed: {0:?}")]
    TlsHandshakeFailed(io::Error),
    #[error("timed out to do tls handshake")]
    TlsHandshakeTimedOut,
    #[error("greeting failed: {0}")]
    GreetingFailed(FtpCommandError),
}
