use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

const WEB_PLAYER: &str = "https://music.apple.com";

static SCRIPT_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src="(/assets/[^"]+\.js)""#).unwrap());

static DEVELOPER_JWT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(eyJhbGciOiJFUzI1NiIsInR5cCI6IkpXVC[\w-]+\.eyJ[\w-]+\.[\w-]+)").unwrap()
});

/// Credentials sent with every API request.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub developer_token: String,
    pub media_user_token: String,
}

impl AuthState {
    /// Fill in the developer token, scraping the web player when none is configured.
    pub async fn resolve(
        http: &reqwest::Client,
        developer_token: Option<&str>,
        media_user_token: Option<&str>,
    ) -> anyhow::Result<Self> {
        let media_user_token = media_user_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .context("no media-user-token configured; run `lrcfetch auth set <token>`")?
            .to_string();

        let developer_token = match developer_token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => scrape_developer_token(http)
                .await?
                .context("could not find a developer token in the web player; set [apple] developer_token")?,
        };

        Ok(Self {
            developer_token,
            media_user_token,
        })
    }
}

/// Pull the anonymous developer JWT out of the web player's JS bundles.
pub async fn scrape_developer_token(http: &reqwest::Client) -> anyhow::Result<Option<String>> {
    let page = http
        .get(format!("{WEB_PLAYER}/us/browse"))
        .send()
        .await
        .context("send web player request")?
        .error_for_status()
        .context("web player http status")?
        .text()
        .await
        .context("read web player page")?;

    for script in script_paths(&page) {
        let url = format!("{WEB_PLAYER}{script}");
        let body = match http.get(&url).send().await {
            Ok(res) if res.status().is_success() => match res.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(url = %url, error = %e, "read script failed");
                    continue;
                }
            },
            Ok(res) => {
                debug!(url = %url, status = %res.status(), "script skipped");
                continue;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "fetch script failed");
                continue;
            }
        };
        if let Some(token) = find_developer_token(&body) {
            return Ok(Some(token));
        }
    }

    Ok(None)
}

fn script_paths(page: &str) -> Vec<String> {
    SCRIPT_SRC
        .captures_iter(page)
        .map(|c| c[1].to_string())
        .collect()
}

fn find_developer_token(script: &str) -> Option<String> {
    DEVELOPER_JWT
        .captures(script)
        .map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_paths() {
        let page = r#"<script src="/assets/index-abc.js"></script><link href="/x.css"><script src="/assets/vendor~1.js" type="module">"#;
        assert_eq!(script_paths(page), vec!["/assets/index-abc.js", "/assets/vendor~1.js"]);
    }

    #[test]
    fn test_find_developer_token() {
        let js = r#"const t="eyJhbGciOiJFUzI1NiIsInR5cCI6IkpXVCJ9.eyJpc3MiOiJ4In0.sig-_123";"#;
        assert_eq!(
            find_developer_token(js).as_deref(),
            Some("eyJhbGciOiJFUzI1NiIsInR5cCI6IkpXVCJ9.eyJpc3MiOiJ4In0.sig-_123")
        );
        assert_eq!(find_developer_token("no token here"), None);
    }
}
