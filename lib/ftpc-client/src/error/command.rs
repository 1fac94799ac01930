/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpRawResponseError, FtpReplyParseError};

#[derive(Debug, Error)]
pub enum FtpCommandError {
    #[error("unable to send command: {0:?}")]
    SendFailed(io::Error),
    #[error("timed out to send command {0}")]
    SendTimedOut(String),
    #[error("unable to recv reply: {0}")]
    RecvFailed(#[from] FtpRawResponseError),
    #[error("line break in command parameter {0:?}")]
    InvalidParameter(String),
    #[error("control connection is not usable")]
    NotConnected,
    #[error("unexpected reply code ({command} -> {code}): {message}")]
    UnexpectedReply {
        command: String,
        code: u16,
        message: String,
    },
    #[error("invalid reply {code} syntax to command {command}: {source}")]
    InvalidReplySyntax {
        command: String,
        code: u16,
        source: FtpReplyParseError,
    },
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("no tls policy configured")]
    TlsNotConfigured,
    #[error("no tls server identity configured for active mode data connection")]
    TlsServerIdentityMissing,
    #[error("tls handshake failed: {0:?}")]
    TlsHandshakeFailed(io::Error),
    #[error("timed out to do tls handshake")]
    TlsHandshakeTimedOut,
    #[error("unable to connect to data address: {0:?}")]
    DataConnectFailed(io::Error),
    #[error("timed out to connect to data address")]
    DataConnectTimedOut,
    #[error("unable to create listener: {0:?}")]
    ListenFailed(io::Error),
    #[error("unable to accept data connection: {0:?}")]
    AcceptFailed(io::Error),
    #[error("timed out to accept data connection")]
    AcceptTimedOut,
}

impl FtpCommandError {
    /// The reply code of a rejected command, if the server did answer.
    pub fn reply_code(&self) -> Option<u16> {
        match self {
            FtpCommandError::UnexpectedReply { code, .. } => Some(*code),
            FtpCommandError::InvalidReplySyntax { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The verbatim reply message of a rejected command.
    pub fn reply_message(&self) -> Option<&str> {
        match self {
            FtpCommandError::UnexpectedReply { message, .. } => Some(message.as_str()),
            FtpCommandError::LoginFailed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// Whether the control connection itself failed.
    ///
    /// The session should be quit after such an error, as the state of the control
    /// channel is unknown.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            FtpCommandError::SendFailed(_)
                | FtpCommandError::SendTimedOut(_)
                | FtpCommandError::RecvFailed(_)
                | FtpCommandError::NotConnected
                | FtpCommandError::TlsHandshakeFailed(_)
                | FtpCommandError::TlsHandshakeTimedOut
        )
    }
}
