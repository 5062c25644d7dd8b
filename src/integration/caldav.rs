//! Calendar-store access. The gateway enumerates a user's calendar
//! collections and creates objects in one of them; `DavClient` is the blind
//! protocol fallback that PUTs against conventional collection names.

use async_trait::async_trait;
use tracing::debug;
use urlencoding::encode as urlencode;

use crate::error::IntegrationError;

#[derive(Debug, Clone)]
pub struct CalendarRef {
    pub uri: String,
    pub display_name: String,
    pub writable: bool,
}

#[async_trait]
pub trait CalendarGateway: Send + Sync {
    async fn list_calendars(&self, uid: &str) -> Result<Vec<CalendarRef>, IntegrationError>;
    async fn create_event(
        &self,
        uid: &str,
        calendar_uri: &str,
        object_name: &str,
        ics: &str,
    ) -> Result<(), IntegrationError>;
}

/// Collection names tried by the protocol fallback, in order.
pub const FALLBACK_COLLECTIONS: [&str; 5] = ["personal", "default", "contacts", "work", "home"];

pub struct CalDavGateway {
    http: reqwest::Client,
    base_url: String,
    service_user: String,
    service_password: String,
}

impl CalDavGateway {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        service_user: &str,
        service_password: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_user: service_user.to_string(),
            service_password: service_password.to_string(),
        }
    }

    fn collection_root(&self, uid: &str) -> String {
        format!("{}/remote.php/dav/calendars/{}/", self.base_url, urlencode(uid))
    }
}

#[async_trait]
impl CalendarGateway for CalDavGateway {
    async fn list_calendars(&self, uid: &str) -> Result<Vec<CalendarRef>, IntegrationError> {
        let url = self.collection_root(uid);
        let method = reqwest::Method::from_bytes(b"PROPFIND")
            .map_err(|_| IntegrationError::Unavailable("PROPFIND".into()))?;
        let response = self
            .http
            .request(method, &url)
            .basic_auth(&self.service_user, Some(&self.service_password))
            .header("Depth", "1")
            .send()
            .await?;
        let status = response.status().as_u16();
        debug!(%url, status, "calendar PROPFIND");
        if status >= 400 {
            return Err(IntegrationError::status(url, status));
        }
        let body = response.text().await?;
        let root_path = path_of(&url);
        Ok(hrefs_from_multistatus(&body)
            .into_iter()
            .filter(|href| href.trim_end_matches('/') != root_path.trim_end_matches('/'))
            .filter_map(|href| {
                last_segment(&href).map(|uri| CalendarRef {
                    display_name: uri.clone(),
                    uri,
                    writable: true,
                })
            })
            .collect())
    }

    async fn create_event(
        &self,
        uid: &str,
        calendar_uri: &str,
        object_name: &str,
        ics: &str,
    ) -> Result<(), IntegrationError> {
        let url = format!(
            "{}{}/{}",
            self.collection_root(uid),
            urlencode(calendar_uri),
            urlencode(object_name)
        );
        let response = self
            .http
            .put(&url)
            .basic_auth(&self.service_user, Some(&self.service_password))
            .header("Content-Type", "text/calendar; charset=utf-8")
            .body(ics.to_string())
            .send()
            .await?;
        let status = response.status().as_u16();
        debug!(%url, status, "calendar PUT");
        if !(200..300).contains(&status) {
            return Err(IntegrationError::status(url, status));
        }
        Ok(())
    }
}

/// Protocol fallback used when the gateway path is unavailable or failed:
/// PUT the ICS body against a conventional per-user collection path and
/// report the status code, leaving the retry decision to the caller.
pub struct DavClient {
    http: reqwest::Client,
    base_url: String,
    service_user: String,
    service_password: String,
}

impl DavClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        service_user: &str,
        service_password: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_user: service_user.to_string(),
            service_password: service_password.to_string(),
        }
    }

    pub async fn put_event(
        &self,
        uid: &str,
        collection: &str,
        object_name: &str,
        ics: &str,
    ) -> Result<u16, IntegrationError> {
        let url = format!(
            "{}/remote.php/dav/calendars/{}/{}/{}",
            self.base_url,
            urlencode(uid),
            urlencode(collection),
            urlencode(object_name)
        );
        let response = self
            .http
            .put(&url)
            .basic_auth(&self.service_user, Some(&self.service_password))
            .header("Content-Type", "text/calendar; charset=utf-8")
            .header("Accept", "text/plain, text/calendar, */*")
            .body(ics.to_string())
            .send()
            .await?;
        let status = response.status().as_u16();
        debug!(%url, status, "DAV PUT");
        Ok(status)
    }
}

/// Minimal href extraction from a multistatus body; tolerates any namespace
/// prefix but only matches opening `<href>`/`<x:href>` tags, so the text
/// between a closing tag and the next element is never mistaken for an href.
/// Full XML parsing is not warranted for pulling collection names.
fn hrefs_from_multistatus(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = body;
    while let Some(open) = rest.find('<') {
        rest = &rest[open + 1..];
        let Some(end) = rest.find('>') else { break };
        let tag = rest[..end].trim();
        rest = &rest[end + 1..];
        if tag.starts_with('/') {
            continue;
        }
        let name = tag.rsplit(':').next().unwrap_or(tag);
        if !name.eq_ignore_ascii_case("href") {
            continue;
        }
        let Some(close) = rest.find("</") else { break };
        let href = rest[..close].trim();
        if !href.is_empty() {
            out.push(href.to_string());
        }
        rest = &rest[close..];
    }
    out
}

fn path_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

fn last_segment(href: &str) -> Option<String> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hrefs_are_pulled_regardless_of_prefix() {
        let body = r#"<?xml version="1.0"?>
            <d:multistatus xmlns:d="DAV:">
              <d:response><d:href>/remote.php/dav/calendars/alice/</d:href></d:response>
              <d:response><d:href>/remote.php/dav/calendars/alice/personal/</d:href></d:response>
              <d:response><d:href>/remote.php/dav/calendars/alice/work/</d:href></d:response>
            </d:multistatus>"#;
        let hrefs = hrefs_from_multistatus(body);
        assert_eq!(hrefs.len(), 3);
        assert_eq!(last_segment(&hrefs[1]).as_deref(), Some("personal"));
        assert_eq!(last_segment(&hrefs[2]).as_deref(), Some("work"));
    }

    #[test]
    fn propstat_blocks_do_not_produce_phantom_hrefs() {
        let body = r#"<?xml version="1.0"?>
            <d:multistatus xmlns:d="DAV:">
              <d:response>
                <d:href>/remote.php/dav/calendars/alice/personal/</d:href>
                <d:propstat>
                  <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
                  <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
              </d:response>
              <d:response>
                <d:href>/remote.php/dav/calendars/alice/work/</d:href>
                <d:propstat>
                  <d:prop><d:displayname>Travail</d:displayname></d:prop>
                  <d:status>HTTP/1.1 200 OK</d:status>
                </d:propstat>
              </d:response>
            </d:multistatus>"#;
        let hrefs = hrefs_from_multistatus(body);
        assert_eq!(
            hrefs,
            vec![
                "/remote.php/dav/calendars/alice/personal/",
                "/remote.php/dav/calendars/alice/work/",
            ]
        );
    }

    #[test]
    fn empty_body_yields_nothing() {
        assert!(hrefs_from_multistatus("").is_empty());
    }
}
