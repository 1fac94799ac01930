/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::{FtpClientConfig, FtpControlConfig, FtpTransferConfig};
use crate::tls::FtpTlsPolicyBuilder;
use crate::yaml;

impl FtpControlConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpControlConfig::default();
            yaml::foreach_kv(map, |k, v| match yaml::normalize_key(k).as_str() {
                "max_line_len" | "max_line_length" => {
                    config.max_line_len = yaml::as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    Ok(())
                }
                "max_multi_lines" => {
                    config.max_multi_lines = yaml::as_usize(v)
                        .context(format!("invalid usize value for key {k}"))?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpTransferConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpTransferConfig::default();
            yaml::foreach_kv(map, |k, v| match yaml::normalize_key(k).as_str() {
                "list_max_line_len" | "list_max_line_length" => {
                    config.list_max_line_len = yaml::as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    Ok(())
                }
                "list_max_entries" => {
                    config.list_max_entries = yaml::as_usize(v)
                        .context(format!("invalid usize value for key {k}"))?;
                    Ok(())
                }
                "copy_buffer_size" => {
                    let size = yaml::as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    config.set_copy_buffer_size(size);
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpClientConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpClientConfig::default();
            yaml::foreach_kv(map, |k, v| match yaml::normalize_key(k).as_str() {
                "passive" => {
                    config.passive =
                        yaml::as_bool(v).context(format!("invalid bool value for key {k}"))?;
                    Ok(())
                }
                "rw_timeout" | "read_write_timeout" => {
                    config.rw_timeout = yaml::as_humanize_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                "connect_timeout" => {
                    config.connect_timeout = yaml::as_humanize_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                "tls" | "tls_client" => {
                    let builder = FtpTlsPolicyBuilder::parse_yaml(v)
                        .context(format!("invalid tls config value for key {k}"))?;
                    let policy = builder
                        .build()
                        .context(format!("failed to build tls policy for key {k}"))?;
                    config.set_tls_policy(policy);
                    Ok(())
                }
                "tls_implicit" => {
                    config.tls_implicit =
                        yaml::as_bool(v).context(format!("invalid bool value for key {k}"))?;
                    Ok(())
                }
                "log_raw_io" => {
                    config.log_raw_io =
                        yaml::as_bool(v).context(format!("invalid bool value for key {k}"))?;
                    Ok(())
                }
                "control" => {
                    config.control = FtpControlConfig::parse_yaml(v).context(format!(
                        "invalid ftp control connection config value for key {k}"
                    ))?;
                    Ok(())
                }
                "transfer" => {
                    config.transfer = FtpTransferConfig::parse_yaml(v).context(format!(
                        "invalid ftp transfer connection config value for key {k}"
                    ))?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}
