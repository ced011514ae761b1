//! Video metadata lookup against the YouTube Data API v3.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

lazy_static! {
    // Covers watch?v=, embed/, v/, /u/x/ and youtu.be/ links.
    static ref VIDEO_URL: Regex =
        Regex::new(r"^.*((youtu.be/)|(v/)|(/u/\w/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*")
            .expect("video url pattern is valid");
    static ref ISO_DURATION: Regex =
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
            .expect("duration pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub description: String,
    /// Length in whole seconds.
    pub duration: u32,
    pub thumbnail: String,
}

/// The 11-character video id in a YouTube link, if there is one.
pub fn extract_video_id(url: &str) -> Option<String> {
    let id = VIDEO_URL.captures(url)?.get(7)?.as_str();
    (id.len() == 11).then(|| id.to_string())
}

/// Seconds in an ISO-8601 duration such as `PT1H2M10S`. Unrecognised input is zero.
///
/// Durations that do not fit in a `u32` of seconds are a [Error::Metadata] failure.
pub fn parse_duration(duration: &str) -> Result<u32> {
    let Some(captures) = ISO_DURATION.captures(duration) else {
        return Ok(0);
    };
    let out_of_range = || Error::Metadata(format!("video duration {duration} is out of range"));

    let mut total: u64 = 0;
    for (index, unit) in [(1, 86_400u64), (2, 3600), (3, 60), (4, 1)] {
        let Some(part) = captures.get(index) else {
            continue;
        };
        let value: u64 = part.as_str().parse().map_err(|_| out_of_range())?;
        total = value
            .checked_mul(unit)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(out_of_range)?;
    }

    u32::try_from(total).map_err(|_| out_of_range())
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: Snippet,
    content_details: ContentDetails,
}

#[derive(Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
struct ContentDetails {
    duration: String,
}

impl Thumbnails {
    fn best(self) -> String {
        self.maxres
            .or(self.high)
            .or(self.default)
            .map(|thumbnail| thumbnail.url)
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tvguide/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.filter(|key| !key.is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Looks up title, description, duration and thumbnail for a video link.
    #[instrument(skip(self))]
    pub async fn fetch_video_details(&self, url: &str) -> Result<VideoDetails> {
        let Some(video_id) = extract_video_id(url) else {
            error!("invalid YouTube URL");
            return Err(Error::InvalidInput(format!("not a YouTube video link: {url}")));
        };

        let Some(api_key) = self.api_key.as_deref() else {
            error!("YouTube API key is missing");
            return Err(Error::InvalidInput("YouTube API key is not configured".to_string()));
        };

        let response = self
            .http
            .get(format!("{}/youtube/v3/videos", self.base_url))
            .query(&[
                ("part", "snippet,contentDetails"),
                ("id", video_id.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "YouTube API error");
            return Err(Error::Metadata(format!("YouTube API responded with {status}")));
        }

        let body: VideoListResponse = response.json().await?;
        let Some(item) = body.items.into_iter().next() else {
            error!(%video_id, "video not found");
            return Err(Error::NotFound(format!("video {video_id}")));
        };

        let details = VideoDetails {
            video_id,
            title: item.snippet.title,
            description: item.snippet.description,
            duration: parse_duration(&item.content_details.duration)?,
            thumbnail: item.snippet.thumbnails.best(),
        };
        info!(video_id = %details.video_id, duration = details.duration, "fetched video details");

        Ok(details)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    pub fn test_extract_video_id() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ?version=3",
        ] {
            assert_eq!(extract_video_id(url).as_deref(), Some("dQw4w9WgXcQ"), "{url}");
        }

        assert_eq!(extract_video_id("https://example.com/video"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
    }

    #[test]
    pub fn test_parse_duration() {
        assert_eq!(parse_duration("PT1H2M10S").unwrap(), 3730);
        assert_eq!(parse_duration("PT4M13S").unwrap(), 253);
        assert_eq!(parse_duration("PT10H").unwrap(), 36_000);
        assert_eq!(parse_duration("PT45S").unwrap(), 45);
        assert_eq!(parse_duration("P1DT1S").unwrap(), 86_401);
        assert_eq!(parse_duration("nonsense").unwrap(), 0);

        assert_eq!(parse_duration("P49710D").unwrap(), 49_710 * 86_400);
        for huge in ["P50000D", "P49710DT6H28M16S", "PT99999999999999999999S"] {
            assert!(matches!(parse_duration(huge), Err(Error::Metadata(_))), "{huge}");
        }
    }

    fn video_body() -> serde_json::Value {
        json!({
            "items": [{
                "snippet": {
                    "title": "Never Gonna Give You Up",
                    "description": "The official video",
                    "thumbnails": {
                        "default": { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg" },
                        "high": { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg" }
                    }
                },
                "contentDetails": { "duration": "PT3M33S" }
            }]
        })
    }

    #[tokio::test]
    pub async fn test_fetch_video_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/videos"))
            .and(query_param("id", "dQw4w9WgXcQ"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(video_body()))
            .mount(&server)
            .await;

        let client = YouTubeClient::new(Some("secret".to_string()))
            .unwrap()
            .with_base_url(server.uri());
        let details = client
            .fetch_video_details("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();

        assert_eq!(details.video_id, "dQw4w9WgXcQ");
        assert_eq!(details.title, "Never Gonna Give You Up");
        assert_eq!(details.duration, 213);
        assert_eq!(
            details.thumbnail,
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
    }

    #[tokio::test]
    pub async fn test_fetch_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("id", "aaaaaaaaaaa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("id", "bbbbbbbbbbb"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = YouTubeClient::new(Some("secret".to_string()))
            .unwrap()
            .with_base_url(server.uri());

        let missing = client.fetch_video_details("https://youtu.be/aaaaaaaaaaa").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let forbidden = client.fetch_video_details("https://youtu.be/bbbbbbbbbbb").await;
        assert!(matches!(forbidden, Err(Error::Metadata(_))));

        let invalid = client.fetch_video_details("not a link").await;
        assert!(matches!(invalid, Err(Error::InvalidInput(_))));

        let keyless = YouTubeClient::new(None)
            .unwrap()
            .with_base_url(server.uri())
            .fetch_video_details("https://youtu.be/aaaaaaaaaaa")
            .await;
        assert!(matches!(keyless, Err(Error::InvalidInput(_))));
    }
}
