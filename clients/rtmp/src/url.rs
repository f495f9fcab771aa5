use url::Url;

use crate::{
    consts::DEFAULT_RTMP_PORT,
    errors::{RtmpClientError, RtmpClientResult},
};

/// Destination of a publish session, from `rtmp[s]://host[:port]/app/key`.
/// The key is the path remainder after the app and may itself contain `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpTarget {
    pub secure: bool,
    pub host: String,
    pub port: u16,
    pub app: String,
    pub key: String,
}

impl RtmpTarget {
    pub fn parse(input: &str) -> RtmpClientResult<Self> {
        let url = Url::parse(input).map_err(|err| RtmpClientError::InvalidUrl(err.to_string()))?;
        let secure = match url.scheme() {
            "rtmp" => false,
            "rtmps" => true,
            other => {
                return Err(RtmpClientError::InvalidUrl(format!(
                    "unsupported scheme: {}",
                    other
                )));
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| RtmpClientError::InvalidUrl("missing host".to_string()))?
            .to_string();
        let port = url.port().unwrap_or(DEFAULT_RTMP_PORT);
        let path = url.path().trim_start_matches('/');
        let (app, key) = path
            .split_once('/')
            .ok_or_else(|| RtmpClientError::InvalidUrl("expected /app/key".to_string()))?;
        if app.is_empty() || key.is_empty() {
            return Err(RtmpClientError::InvalidUrl(
                "empty app or stream key".to_string(),
            ));
        }
        Ok(Self {
            secure,
            host,
            port,
            app: app.to_string(),
            key: key.to_string(),
        })
    }

    /// tcUrl announced in the connect object.
    pub fn tc_url(&self) -> String {
        format!(
            "rtmp{}://{}:{}/{}",
            if self.secure { "s" } else { "" },
            self.host,
            self.port,
            self.app
        )
    }
}

/// Rewrites a publish URL so the app and stream key are safe to log: the
/// first and last two characters stay, everything between becomes `*`.
/// Segments shorter than four characters pass through unchanged.
pub fn anonymize(input: &str) -> RtmpClientResult<String> {
    let target = RtmpTarget::parse(input)?;
    let url = Url::parse(input).map_err(|err| RtmpClientError::InvalidUrl(err.to_string()))?;
    let port = url
        .port()
        .map(|p| format!(":{}", p))
        .unwrap_or_default();
    Ok(format!(
        "{}://{}{}/{}/{}",
        url.scheme(),
        target.host,
        port,
        mask(&target.app),
        mask(&target.key),
    ))
}

fn mask(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    if chars.len() < 4 {
        return segment.to_string();
    }
    let mut masked = String::with_capacity(chars.len());
    masked.extend(&chars[..2]);
    masked.extend(std::iter::repeat_n('*', chars.len() - 4));
    masked.extend(&chars[chars.len() - 2..]);
    masked
}

#[cfg(test)]
mod tests {
    use crate::errors::RtmpClientError;

    use super::{RtmpTarget, anonymize};

    #[test]
    fn parses_full_form() {
        let target = RtmpTarget::parse("rtmps://h.example:1935/app-a/k").unwrap();
        assert_eq!(
            target,
            RtmpTarget {
                secure: true,
                host: "h.example".to_string(),
                port: 1935,
                app: "app-a".to_string(),
                key: "k".to_string(),
            }
        );
    }

    #[test]
    fn default_port_and_multi_segment_key() {
        let target = RtmpTarget::parse("rtmp://live.example/app/some/deep/key").unwrap();
        assert_eq!(target.port, 1935);
        assert_eq!(target.app, "app");
        assert_eq!(target.key, "some/deep/key");
        assert!(!target.secure);
    }

    #[test]
    fn tc_url_always_carries_the_port() {
        let target = RtmpTarget::parse("rtmp://live.example/app/key").unwrap();
        assert_eq!(target.tc_url(), "rtmp://live.example:1935/app");
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(matches!(
            RtmpTarget::parse("rtmp://live.example/apponly"),
            Err(RtmpClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            RtmpTarget::parse("rtmp://live.example/app/"),
            Err(RtmpClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn foreign_scheme_is_rejected() {
        assert!(matches!(
            RtmpTarget::parse("http://live.example/app/key"),
            Err(RtmpClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            anonymize("http://live.example/app/key"),
            Err(RtmpClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn anonymize_masks_app_and_key() {
        assert_eq!(
            anonymize("rtmp://a.rtmp.youtube.com/live2/AaBb-CcDd-EeFf-GgHh-IiJj").unwrap(),
            "rtmp://a.rtmp.youtube.com/li*e2/Aa********************Jj"
        );
    }

    #[test]
    fn anonymize_keeps_short_segments_and_explicit_port() {
        assert_eq!(
            anonymize("rtmps://h.example:8443/living/key").unwrap(),
            "rtmps://h.example:8443/li**ng/key"
        );
    }
}
