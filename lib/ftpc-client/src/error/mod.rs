/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod command;
mod connect;
mod parse;
mod response;
mod transfer;

pub use command::FtpCommandError;
pub use connect::FtpConnectError;
pub use parse::{FtpListingParseError, FtpReplyParseError};
pub use response::FtpRawResponseError;
pub use transfer::FtpTransferError;
