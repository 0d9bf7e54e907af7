//! Zabbix backend adapter

pub mod client;
pub mod rpc;

pub use client::ZabbixClient;
