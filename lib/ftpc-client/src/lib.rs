/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod config;
mod control;
mod debug;
mod error;
mod io;
mod listing;
mod reply;
mod session;
mod stream;
mod tls;

#[cfg(feature = "yaml")]
mod yaml;

pub use config::{FtpClientConfig, FtpControlConfig, FtpTransferConfig};
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};
pub use error::{
    FtpCommandError, FtpConnectError, FtpListingParseError, FtpRawResponseError,
    FtpReplyParseError, FtpTransferError,
};
pub use io::TimedStream;
pub use listing::{FtpFileEntry, FtpFileKind, FtpFileMode, parse_list_line};
pub use reply::{
    FtpReply, decode_epsv_229, decode_pasv_227, decode_quoted_path_257, decode_size_213,
};
pub use session::{FtpSession, FtpTransfer};
pub use stream::FtpStream;
pub use tls::{FtpTlsPolicy, FtpTlsPolicyBuilder, load_tls_policy};
