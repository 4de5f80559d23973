use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::error::{PipelineError, Result};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Mozilla/5.0 (matchup_terminal)";

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client. Overall request deadlines are set per request by
/// the caller.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| PipelineError::Source(format!("failed to build http client: {err}")))
    })
}

/// GET `url` as text, mapping an expired deadline to `SourceTimeout`.
pub fn fetch_text(url: &str, timeout: Duration) -> Result<String> {
    let map_err = |err: reqwest::Error| {
        if err.is_timeout() {
            PipelineError::SourceTimeout(timeout)
        } else {
            PipelineError::Source(format!("{url}: {err}"))
        }
    };

    let resp = http_client()?
        .get(url)
        .timeout(timeout)
        .send()
        .map_err(map_err)?;
    let status = resp.status();
    let body = resp.text().map_err(map_err)?;
    if !status.is_success() {
        return Err(PipelineError::Source(format!("http {status} from {url}")));
    }
    Ok(body)
}
