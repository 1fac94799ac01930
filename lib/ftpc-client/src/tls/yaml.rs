/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::FtpTlsPolicyBuilder;
use crate::yaml;

impl FtpTlsPolicyBuilder {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = value else {
            return Err(anyhow!("invalid yaml type"));
        };

        let mut builder = FtpTlsPolicyBuilder::default();
        let mut cert_file = None;
        let mut key_file = None;
        yaml::foreach_kv(map, |k, v| match yaml::normalize_key(k).as_str() {
            "ca_certificate" | "ca_cert" => {
                let path = yaml::as_file_path(v).context(format!("invalid path for key {k}"))?;
                builder.add_ca_cert_file(path)
            }
            "certificate" | "cert" => {
                cert_file =
                    Some(yaml::as_file_path(v).context(format!("invalid path for key {k}"))?);
                Ok(())
            }
            "private_key" | "key" => {
                key_file =
                    Some(yaml::as_file_path(v).context(format!("invalid path for key {k}"))?);
                Ok(())
            }
            "no_verify" | "no_verify_cert" => {
                let no_verify =
                    yaml::as_bool(v).context(format!("invalid bool value for key {k}"))?;
                builder.set_no_verify(no_verify);
                Ok(())
            }
            "server_name" | "tls_name" => {
                let name = yaml::as_string(v).context(format!("invalid string for key {k}"))?;
                builder.set_server_name(&name)
            }
            "handshake_timeout" => {
                let timeout = yaml::as_humanize_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                builder.set_handshake_timeout(timeout);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;

        match (cert_file, key_file) {
            (Some(cert), Some(key)) => builder.set_cert_pair_files(cert, key)?,
            (None, None) => {}
            _ => return Err(anyhow!("certificate and private_key should be set together")),
        }
        Ok(builder)
    }
}
