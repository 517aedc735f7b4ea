use anyhow::{Context, Result};

/// Downloads `url` with a blocking HTTP GET.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let resp = reqwest::blocking::get(url)?.error_for_status()?;
    Ok(resp.bytes()?.to_vec())
}

/// Loads source data from a local file path or fetches it over HTTP.
pub fn read_source(source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(source).with_context(|| format!("failed to fetch '{source}'"))
    } else {
        std::fs::read(source).with_context(|| format!("failed to read '{source}'"))
    }
}
