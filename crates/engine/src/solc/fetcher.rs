// Relic - Solidity Recompiler
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Retrieval of compiler builds from the binary repository.
//!
//! The repository serves `<root>/<platform>/<file>`. For some versions the
//! response body is not the binary itself but the plain-text name of the file
//! that holds it (e.g. `solc-linux-amd64-v0.8.17+commit.8df45f5f`). Such a
//! response is followed exactly once.

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::{debug, trace};

static INDIRECTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w-]+)-v(\d+\.\d+\.\d+)\+commit\.([a-fA-F0-9]+).*$")
        .expect("valid indirection pattern")
});

/// A successful response body, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedBody {
    /// The body names the file that actually holds the build
    Indirection(String),
    /// The body is the build itself
    Binary(Vec<u8>),
}

impl FetchedBody {
    /// Classify a response body.
    pub fn classify(body: Vec<u8>) -> Self {
        match std::str::from_utf8(&body) {
            Ok(text) if INDIRECTION_PATTERN.is_match(text) => Self::Indirection(text.to_owned()),
            _ => Self::Binary(body),
        }
    }
}

/// Bytes left alone by URI-component encoding.
const COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a file name the way a URI component is encoded, so that the
/// `+` of the build metadata survives the trip.
pub fn encode_file_name(file_name: &str) -> String {
    utf8_percent_encode(file_name, COMPONENT_SET).to_string()
}

/// HTTP client for the compiler binary repository.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: Client,
    repository_url: String,
}

impl RemoteFetcher {
    /// New fetcher for the repository rooted at `repository_url`.
    pub fn new(repository_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), repository_url)
    }

    /// New fetcher using an existing HTTP client.
    pub fn with_client(client: Client, repository_url: impl Into<String>) -> Self {
        Self { client, repository_url: repository_url.into() }
    }

    /// Root URL of the repository.
    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// URL of `file` (already encoded) under `platform`.
    pub fn url_for(&self, platform: &str, file: &str) -> String {
        format!("{}/{platform}/{file}", self.repository_url.trim_end_matches('/'))
    }

    /// Fetch `file_name` for `platform`.
    ///
    /// Returns `None` when the build is not published (or cannot be reached),
    /// which is a common outcome for old versions and exotic platforms.
    pub async fn fetch(&self, platform: &str, file_name: &str) -> Option<Vec<u8>> {
        let url = self.url_for(platform, &encode_file_name(file_name));
        let (mut status, mut body) = self.get(&url).await?;

        if status == StatusCode::OK {
            if let Some(bytes) = body.take() {
                match FetchedBody::classify(bytes) {
                    FetchedBody::Indirection(target) => {
                        debug!(from = %file_name, to = %target, "following compiler indirection");
                        (status, body) = self.get(&self.url_for(platform, &target)).await?;
                    }
                    FetchedBody::Binary(bytes) => body = Some(bytes),
                }
            }
        }

        match body {
            Some(bytes) if status == StatusCode::OK => {
                debug!(%url, size = bytes.len(), "fetched compiler");
                Some(bytes)
            }
            _ => {
                debug!(%url, %status, "compiler not available");
                None
            }
        }
    }

    async fn get(&self, url: &str) -> Option<(StatusCode, Option<Vec<u8>>)> {
        trace!(%url, "requesting compiler");
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(%url, "failed to reach binary repository: {e}");
                return None;
            }
        };

        let status = response.status();
        let body = response.bytes().await.ok().map(|bytes| bytes.to_vec());
        Some((status, body))
    }
}
