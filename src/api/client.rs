use std::time::Duration;

use reqwest::{Client, Url};

use crate::prelude::*;

/// Build a default client.
pub fn try_new() -> Result<Client> {
    Ok(Client::builder().timeout(Duration::from_secs(10)).build()?)
}

/// Append the path segments to the base URL.
pub fn join(base_url: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow!("`{base_url}` cannot be a base URL"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
