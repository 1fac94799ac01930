/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use yaml_rust::YamlLoader;

use ftpc_client::{FtpClientConfig, FtpTlsPolicyBuilder};

const DEFAULT_FTP_PORT: u16 = 21;
const DEFAULT_FTPS_PORT: u16 = 990;

const ARG_CONFIG: &str = "config";
const ARG_PASSIVE: &str = "passive";
const ARG_ACTIVE: &str = "active";
const ARG_TIMEOUT: &str = "timeout";
const ARG_CONNECT_TIMEOUT: &str = "connect-timeout";
const ARG_LOG_RAW_IO: &str = "log-raw-io";
const ARG_TLS: &str = "tls";
const ARG_IMPLICIT_TLS: &str = "implicit-tls";
const ARG_CA_CERT: &str = "ca-cert";
const ARG_CERT: &str = "cert";
const ARG_KEY: &str = "key";
const ARG_NO_VERIFY: &str = "no-verify";
const ARG_TLS_NAME: &str = "tls-name";

pub(crate) fn append_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new(ARG_CONFIG)
            .help("Client config file in yaml format")
            .num_args(1)
            .value_name("CONFIG FILE")
            .value_parser(value_parser!(PathBuf))
            .long(ARG_CONFIG)
            .short('c')
            .global(true),
    )
    .arg(
        Arg::new(ARG_PASSIVE)
            .help("Use passive mode for data connections")
            .action(ArgAction::SetTrue)
            .long(ARG_PASSIVE)
            .short('P')
            .global(true),
    )
    .arg(
        Arg::new(ARG_ACTIVE)
            .help("Use active mode for data connections")
            .action(ArgAction::SetTrue)
            .long(ARG_ACTIVE)
            .conflicts_with(ARG_PASSIVE)
            .global(true),
    )
    .arg(
        Arg::new(ARG_TIMEOUT)
            .help("Read and write timeout in seconds")
            .num_args(1)
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .long(ARG_TIMEOUT)
            .global(true),
    )
    .arg(
        Arg::new(ARG_CONNECT_TIMEOUT)
            .help("Connect timeout in seconds")
            .num_args(1)
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .long(ARG_CONNECT_TIMEOUT)
            .global(true),
    )
    .arg(
        Arg::new(ARG_LOG_RAW_IO)
            .help("Log every command and reply on the control connection")
            .action(ArgAction::SetTrue)
            .long(ARG_LOG_RAW_IO)
            .global(true),
    )
    .arg(
        Arg::new(ARG_TLS)
            .help("Upgrade the control connection with AUTH TLS")
            .action(ArgAction::SetTrue)
            .long(ARG_TLS)
            .global(true),
    )
    .arg(
        Arg::new(ARG_IMPLICIT_TLS)
            .help("Connect with TLS directly")
            .action(ArgAction::SetTrue)
            .long(ARG_IMPLICIT_TLS)
            .conflicts_with(ARG_TLS)
            .global(true),
    )
    .arg(
        Arg::new(ARG_CA_CERT)
            .help("CA certificate file in PEM format")
            .num_args(1)
            .value_name("CA CERT FILE")
            .value_parser(value_parser!(PathBuf))
            .long(ARG_CA_CERT)
            .global(true),
    )
    .arg(
        Arg::new(ARG_CERT)
            .help("Certificate file in PEM format, also used in active mode")
            .num_args(1)
            .value_name("CERT FILE")
            .value_parser(value_parser!(PathBuf))
            .long(ARG_CERT)
            .requires(ARG_KEY)
            .global(true),
    )
    .arg(
        Arg::new(ARG_KEY)
            .help("Private key file in PEM format")
            .num_args(1)
            .value_name("KEY FILE")
            .value_parser(value_parser!(PathBuf))
            .long(ARG_KEY)
            .requires(ARG_CERT)
            .global(true),
    )
    .arg(
        Arg::new(ARG_NO_VERIFY)
            .help("Skip verification of the server certificate")
            .action(ArgAction::SetTrue)
            .long(ARG_NO_VERIFY)
            .global(true),
    )
    .arg(
        Arg::new(ARG_TLS_NAME)
            .help("TLS server name, default to the server host")
            .num_args(1)
            .value_name("SERVER NAME")
            .long(ARG_TLS_NAME)
            .global(true),
    )
}

fn load_config_file(path: &Path) -> anyhow::Result<FtpClientConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {e}", path.display()))?;
    let docs = YamlLoader::load_from_str(&content)
        .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
    match docs.first() {
        Some(doc) => FtpClientConfig::parse_yaml(doc)
            .context(format!("invalid client config in file {}", path.display())),
        None => Ok(FtpClientConfig::default()),
    }
}

fn tls_requested(args: &ArgMatches) -> bool {
    args.get_flag(ARG_TLS)
        || args.get_flag(ARG_IMPLICIT_TLS)
        || args.get_flag(ARG_NO_VERIFY)
        || args.contains_id(ARG_CA_CERT)
        || args.contains_id(ARG_CERT)
        || args.contains_id(ARG_TLS_NAME)
}

fn build_tls_builder(args: &ArgMatches) -> anyhow::Result<FtpTlsPolicyBuilder> {
    let mut builder = FtpTlsPolicyBuilder::default();
    if let Some(path) = args.get_one::<PathBuf>(ARG_CA_CERT) {
        builder.add_ca_cert_file(path)?;
    }
    if let (Some(cert), Some(key)) = (
        args.get_one::<PathBuf>(ARG_CERT),
        args.get_one::<PathBuf>(ARG_KEY),
    ) {
        builder.set_cert_pair_files(cert, key)?;
    }
    builder.set_no_verify(args.get_flag(ARG_NO_VERIFY));
    if let Some(name) = args.get_one::<String>(ARG_TLS_NAME) {
        builder.set_server_name(name)?;
    }
    Ok(builder)
}

/// Build the client config, command line options override the config file.
pub(crate) fn build(args: &ArgMatches) -> anyhow::Result<FtpClientConfig> {
    let mut config = match args.get_one::<PathBuf>(ARG_CONFIG) {
        Some(path) => load_config_file(path)?,
        None => FtpClientConfig::default(),
    };

    if args.get_flag(ARG_PASSIVE) {
        config.set_passive(true);
    } else if args.get_flag(ARG_ACTIVE) {
        config.set_passive(false);
    }
    if let Some(secs) = args.get_one::<u64>(ARG_TIMEOUT) {
        config.set_rw_timeout(Duration::from_secs(*secs));
    }
    if let Some(secs) = args.get_one::<u64>(ARG_CONNECT_TIMEOUT) {
        config.set_connect_timeout(Duration::from_secs(*secs));
    }
    if args.get_flag(ARG_LOG_RAW_IO) {
        config.set_log_raw_io(true);
    }

    if tls_requested(args) {
        let builder = build_tls_builder(args)?;
        let policy = builder.build().context("failed to build tls policy")?;
        config.set_tls_policy(policy);
        config.set_tls_implicit(args.get_flag(ARG_IMPLICIT_TLS));
    }
    Ok(config)
}

/// Append the default port if `server` has none.
pub(crate) fn server_addr(server: &str, implicit_tls: bool) -> String {
    let default_port = if implicit_tls {
        DEFAULT_FTPS_PORT
    } else {
        DEFAULT_FTP_PORT
    };

    if Ipv6Addr::from_str(server).is_ok() {
        return format!("[{server}]:{default_port}");
    }
    match server.rsplit_once(':') {
        Some((_, port)) if u16::from_str(port).is_ok() => server.to_string(),
        _ => format!("{server}:{default_port}"),
    }
}
