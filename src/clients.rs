use std::sync::OnceLock;

use color_eyre::eyre::{eyre, Result};

use crate::context_config::ContextConfig;

pub static REQWEST: OnceLock<reqwest::Client> = OnceLock::new();
pub static GIS_URL: OnceLock<String> = OnceLock::new();
pub static ACTIVE_CONTEXT_CONFIG: OnceLock<ContextConfig> = OnceLock::new();

pub fn get_reqwest_client() -> Result<&'static reqwest::Client> {
    REQWEST.get().ok_or(eyre!("Failed to get reqwest client"))
}

pub fn get_gis_url() -> Result<&'static str> {
    GIS_URL
        .get()
        .map(String::as_str)
        .ok_or(eyre!("GIS API url is not configured"))
}
