//! Release check against the GitHub releases API.

use serde::Deserialize;
use shared::events::UpdateEvent;

const RELEASE_ENDPOINT: &str =
    "https://api.github.com/repos/kaleido-app/kaleido/releases/latest";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    body: String,
    html_url: String,
}

/// Strip a leading `v` so tags like `v1.2.3` parse as semver.
fn version_from_tag(tag: &str) -> Option<semver::Version> {
    semver::Version::parse(tag.trim().trim_start_matches('v')).ok()
}

/// Compare the latest published release against `current`. Network and parse
/// failures come back as [`UpdateEvent::Failed`] so the page always has
/// something to show.
pub async fn check_for_update(current: &str) -> UpdateEvent {
    let Ok(current) = semver::Version::parse(current) else {
        return UpdateEvent::Failed(format!("bad current version: {current}"));
    };

    let client = reqwest::Client::new();
    let resp = match client
        .get(RELEASE_ENDPOINT)
        .header(reqwest::header::USER_AGENT, "kaleido")
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => return UpdateEvent::Failed(format!("update check failed: {e}")),
    };
    if !resp.status().is_success() {
        return UpdateEvent::Failed(format!("update check failed: HTTP {}", resp.status()));
    }
    let release: Release = match resp.json().await {
        Ok(release) => release,
        Err(e) => return UpdateEvent::Failed(format!("bad release payload: {e}")),
    };

    let Some(latest) = version_from_tag(&release.tag_name) else {
        return UpdateEvent::Failed(format!("unparseable release tag: {}", release.tag_name));
    };

    if latest > current {
        UpdateEvent::Available {
            version: latest.to_string(),
            notes: release.body,
            url: release.html_url,
        }
    } else {
        UpdateEvent::UpToDate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_parsing() {
        assert_eq!(
            version_from_tag("v1.2.3"),
            Some(semver::Version::new(1, 2, 3))
        );
        assert_eq!(
            version_from_tag("0.10.0"),
            Some(semver::Version::new(0, 10, 0))
        );
        assert!(version_from_tag("nightly").is_none());
    }

    #[test]
    fn test_release_payload_parse() {
        let data = r#"{"tag_name":"v2.0.0","body":"notes here","html_url":"https://g/r"}"#;
        let release: Release = serde_json::from_str(data).unwrap();
        assert_eq!(release.tag_name, "v2.0.0");
        assert_eq!(release.body, "notes here");
    }
}
