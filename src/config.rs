//! This module holds the configuration for the server

use std::net::IpAddr;

use actix_toolbox::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Configuration regarding the server
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConfig {
    /// The address the server should bind to
    pub listen_address: IpAddr,
    /// The port the server should bind to
    pub listen_port: u16,
    /// Base64 encoded secret key for signing session cookies.
    ///
    /// Can be generated with the `keygen` subcommand.
    pub secret_key: String,
}

/// Configuration regarding the database
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseConfig {
    /// Host the database is running on
    pub host: String,
    /// Port the database is running on
    pub port: u16,
    /// Name of the database
    pub name: String,
    /// User to connect as
    pub user: String,
    /// Password to authenticate with
    pub password: String,
}

/// Configuration of the bootstrap admin account.
///
/// The account is created on startup if it does not exist yet.
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct AdminConfig {
    /// Username of the admin account
    pub username: String,
    /// The name that is displayed for the admin account
    pub display_name: String,
    /// Password of the admin account
    pub password: String,
}

/// This struct can be parsed from the configuration file
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Configuration regarding the server
    pub server: ServerConfig,
    /// Configuration regarding the database
    pub database: DatabaseConfig,
    /// Configuration of the bootstrap admin account
    pub admin: AdminConfig,
    /// The logging configuration
    pub logging: LoggingConfig,
}
