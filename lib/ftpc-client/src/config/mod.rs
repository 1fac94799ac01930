/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use crate::tls::FtpTlsPolicy;

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_RW_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtpControlConfig {
    pub(crate) max_line_len: usize,
    pub(crate) max_multi_lines: usize,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: 2048,
            max_multi_lines: 128,
        }
    }
}

impl FtpControlConfig {
    pub fn set_max_line_len(&mut self, len: usize) {
        self.max_line_len = len;
    }

    pub fn set_max_multi_lines(&mut self, lines: usize) {
        self.max_multi_lines = lines;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtpTransferConfig {
    pub(crate) list_max_line_len: usize,
    pub(crate) list_max_entries: usize,
    pub(crate) copy_buffer_size: usize,
}

impl Default for FtpTransferConfig {
    fn default() -> Self {
        FtpTransferConfig {
            list_max_line_len: 2048,
            list_max_entries: 65536,
            copy_buffer_size: 32 * 1024,
        }
    }
}

impl FtpTransferConfig {
    pub fn set_list_max_line_len(&mut self, len: usize) {
        self.list_max_line_len = len;
    }

    pub fn set_list_max_entries(&mut self, count: usize) {
        self.list_max_entries = count;
    }

    pub fn set_copy_buffer_size(&mut self, size: usize) {
        self.copy_buffer_size = size.max(512);
    }
}

/// Session wide settings, fixed once a session has been created.
#[derive(Clone)]
pub struct FtpClientConfig {
    pub(crate) passive: bool,
    pub(crate) rw_timeout: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) tls: Option<Arc<FtpTlsPolicy>>,
    pub(crate) tls_implicit: bool,
    pub(crate) log_raw_io: bool,
    pub(crate) control: FtpControlConfig,
    pub(crate) transfer: FtpTransferConfig,
}

impl Default for FtpClientConfig {
    fn default() -> Self {
        FtpClientConfig {
            passive: false,
            rw_timeout: DEFAULT_RW_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tls: None,
            tls_implicit: false,
            log_raw_io: false,
            control: FtpControlConfig::default(),
            transfer: FtpTransferConfig::default(),
        }
    }
}

impl FtpClientConfig {
    pub fn set_passive(&mut self, passive: bool) {
        self.passive = passive;
    }

    #[inline]
    pub fn passive(&self) -> bool {
        self.passive
    }

    pub fn set_rw_timeout(&mut self, timeout: Duration) {
        self.rw_timeout = timeout;
    }

    #[inline]
    pub fn rw_timeout(&self) -> Duration {
        self.rw_timeout
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn set_tls_policy(&mut self, policy: FtpTlsPolicy) {
        self.tls = Some(Arc::new(policy));
    }

    #[inline]
    pub fn tls_policy(&self) -> Option<&Arc<FtpTlsPolicy>> {
        self.tls.as_ref()
    }

    pub fn set_tls_implicit(&mut self, implicit: bool) {
        self.tls_implicit = implicit;
    }

    /// Whether the control connection is encrypted right from connect.
    #[inline]
    pub fn tls_implicit(&self) -> bool {
        self.tls.is_some() && self.tls_implicit
    }

    /// Whether an AUTH TLS upgrade should be done before login.
    #[inline]
    pub fn tls_explicit(&self) -> bool {
        self.tls.is_some() && !self.tls_implicit
    }

    pub fn set_log_raw_io(&mut self, enable: bool) {
        self.log_raw_io = enable;
    }

    pub fn set_control(&mut self, config: FtpControlConfig) {
        self.control = config;
    }

    pub fn set_transfer(&mut self, config: FtpTransferConfig) {
        self.transfer = config;
    }

    #[inline]
    pub fn transfer(&self) -> &FtpTransferConfig {
        &self.transfer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FtpClientConfig::default();
        assert!(!config.passive());
        assert_eq!(config.rw_timeout(), Duration::from_secs(120));
        assert!(!config.tls_implicit());
        assert!(!config.tls_explicit());
        assert!(config.tls_policy().is_none());
    }

    #[test]
    fn implicit_needs_policy() {
        let mut config = FtpClientConfig::default();
        config.set_tls_implicit(true);
        assert!(!config.tls_implicit());
    }

    #[test]
    fn copy_buffer_lower_bound() {
        let mut config = FtpTransferConfig::default();
        config.set_copy_buffer_size(16);
        assert_eq!(config.copy_buffer_size, 512);
    }
}
