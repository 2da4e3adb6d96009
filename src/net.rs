// Shared reqwest setup - every outbound call gets a deadline
// A hung server turns into an ordinary error instead of a stuck task

use std::time::Duration;

/// Client whose requests fail once `timeout` passes, connect included
pub fn client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}
