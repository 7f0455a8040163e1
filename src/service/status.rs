// service::status
// > live stream status from the meeting web service (GET /video)
use crate::comm_media::{SessionDateKey, StreamStatus};
use crate::config::Config;
use crate::get_rec_user_agent;
use crate::runner::RunnerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn poll(&self, config: &Config) -> Result<StreamStatus, RunnerError>;
}

//
// wire payload
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResVideo {
    pub live: bool,
    pub url: Option<String>,
    pub meeting_date_string: Option<String>,

    // informational
    pub congregation: Option<String>,
    pub poster: Option<String>,
    pub count_needed: Option<bool>,
    pub poll_interval: Option<u64>,
}

impl ResVideo {
    pub fn into_stream_status(self) -> Result<StreamStatus, RunnerError> {
        if !self.live {
            return Ok(StreamStatus::NotLive);
        }

        let url = match self.url {
            Some(url) if !url.is_empty() => url,
            _ => {
                return Err(RunnerError::PollErr(
                    "live status without stream url".to_string(),
                ))
            }
        };

        let date_key = match self.meeting_date_string {
            Some(s) => SessionDateKey::parse(&s).map_err(RunnerError::PollErr)?,
            None => {
                return Err(RunnerError::PollErr(
                    "live status without meetingDateString".to_string(),
                ))
            }
        };

        Ok(StreamStatus::Live { url, date_key })
    }
}

pub fn parse_status_body(body: &str) -> Result<StreamStatus, RunnerError> {
    let res: ResVideo = serde_json::from_str(body)
        .map_err(|e| RunnerError::PollErr(format!("malformed status body, e={}", e)))?;

    log::debug!(
        "[status::parse_status_body] live={}, congregation={:?}, count_needed={:?}, poll_interval={:?}",
        res.live,
        res.congregation,
        res.count_needed,
        res.poll_interval
    );

    res.into_stream_status()
}

//
// HttpStatusProvider
//

pub struct HttpStatusProvider {
    client: reqwest::Client,
}

impl HttpStatusProvider {
    pub fn new() -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .user_agent(get_rec_user_agent())
            .build()
            .map_err(|e| RunnerError::InternalError(format!("http client, e={}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl StatusProvider for HttpStatusProvider {
    async fn poll(&self, config: &Config) -> Result<StreamStatus, RunnerError> {
        let url = config.status_url();

        let res = self
            .client
            .get(&url)
            .timeout(config.status_timeout())
            .send()
            .await
            .map_err(|e| RunnerError::PollErr(format!("GET {}, e={}", url, e)))?;

        let res = res
            .error_for_status()
            .map_err(|e| RunnerError::PollErr(format!("GET {}, e={}", url, e)))?;

        let body = res
            .text()
            .await
            .map_err(|e| RunnerError::PollErr(format!("GET {}, body, e={}", url, e)))?;

        parse_status_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // serves one raw http response, returns the status url
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = sock.read(&mut buf).await;

            let res = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            sock.write_all(res.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });

        format!("http://{}/video", addr)
    }

    fn config_for(url: String) -> Config {
        let mut cfg = Config::default();
        cfg.status_url = Some(url);
        cfg.status_timeout = 5;
        cfg
    }

    #[test]
    fn live_payload_becomes_live_status() {
        let st = parse_status_body(
            r#"{"live":true,"url":"http://x/stream.m3u8","meetingDateString":"01-02-2024",
                "congregation":"North","poster":"/posters/a.png","countNeeded":true,"pollInterval":40}"#,
        )
        .unwrap();

        assert_eq!(
            st,
            StreamStatus::Live {
                url: "http://x/stream.m3u8".to_string(),
                date_key: SessionDateKey::parse("01-02-2024").unwrap(),
            }
        );
    }

    #[test]
    fn not_live_payload_ignores_other_fields() {
        let st = parse_status_body(
            r#"{"live":false,"url":"/recordings/01-01-2024-meeting.mp4","meetingDateString":"01-01-2024"}"#,
        )
        .unwrap();

        assert_eq!(st, StreamStatus::NotLive);
    }

    #[test]
    fn invalid_payloads_are_poll_errors() {
        for body in [
            "{not json",
            r#"{}"#,
            r#"{"live":true,"meetingDateString":"01-02-2024"}"#,
            r#"{"live":true,"url":"http://x/s.m3u8"}"#,
            r#"{"live":true,"url":"http://x/s.m3u8","meetingDateString":"../../etc"}"#,
        ] {
            assert!(
                matches!(parse_status_body(body), Err(RunnerError::PollErr(_))),
                "accepted {}",
                body
            );
        }
    }

    #[tokio::test]
    async fn http_provider_reads_live_status() {
        let url = serve_once(
            "200 OK",
            r#"{"live":true,"url":"http://x/stream.m3u8","meetingDateString":"01-02-2024"}"#,
        )
        .await;

        let st = HttpStatusProvider::new()
            .unwrap()
            .poll(&config_for(url))
            .await
            .unwrap();

        assert!(st.is_live());
    }

    #[tokio::test]
    async fn http_provider_malformed_json_is_poll_error() {
        let url = serve_once("200 OK", "{\"live\": tru").await;

        let rst = HttpStatusProvider::new()
            .unwrap()
            .poll(&config_for(url))
            .await;

        assert!(matches!(rst, Err(RunnerError::PollErr(_))));
    }

    #[tokio::test]
    async fn http_provider_non_2xx_is_poll_error() {
        let url = serve_once("500 Internal Server Error", "{}").await;

        let rst = HttpStatusProvider::new()
            .unwrap()
            .poll(&config_for(url))
            .await;

        assert!(matches!(rst, Err(RunnerError::PollErr(_))));
    }

    #[tokio::test]
    async fn http_provider_unreachable_is_poll_error() {
        // bind then drop to get a closed port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let rst = HttpStatusProvider::new()
            .unwrap()
            .poll(&config_for(format!("http://{}/video", addr)))
            .await;

        assert!(matches!(rst, Err(RunnerError::PollErr(_))));
    }
}
