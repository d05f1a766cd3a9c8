//! Zoho data centers and fixed OAuth values
//!
//! Every Zoho account lives in exactly one data center; tokens minted in one
//! are rejected by the others, so the accounts domain and the Recruit API
//! domain must always come from the same `DataCenter`.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Access token used when no real token could be obtained. Upstream calls made
/// with it fail with 401, which surfaces as an ordinary adapter error.
pub const PLACEHOLDER_ACCESS_TOKEN: &str = "invalid-token";

/// Authorization scheme Zoho expects instead of `Bearer`.
pub const AUTH_SCHEME: &str = "Zoho-oauthtoken";

/// Zoho hosting region, selected by the top-level domain suffix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DataCenter {
    #[default]
    #[serde(rename = "com", alias = "us")]
    Us,
    #[serde(rename = "eu")]
    Eu,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "com.au", alias = "au")]
    Au,
    #[serde(rename = "jp")]
    Jp,
    #[serde(rename = "com.cn", alias = "cn")]
    Cn,
}

impl DataCenter {
    /// Domain suffix after `zoho.`
    pub fn domain_suffix(self) -> &'static str {
        match self {
            DataCenter::Us => "com",
            DataCenter::Eu => "eu",
            DataCenter::In => "in",
            DataCenter::Au => "com.au",
            DataCenter::Jp => "jp",
            DataCenter::Cn => "com.cn",
        }
    }

    /// OAuth token endpoint for this data center.
    pub fn token_url(self) -> String {
        format!("https://accounts.zoho.{}/oauth/v2/token", self.domain_suffix())
    }

    /// Base URL of the Recruit v2 REST API for this data center.
    pub fn recruit_api_url(self) -> String {
        format!("https://recruit.zoho.{}/recruit/v2", self.domain_suffix())
    }
}

impl FromStr for DataCenter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "com" | "us" => Ok(DataCenter::Us),
            "eu" => Ok(DataCenter::Eu),
            "in" => Ok(DataCenter::In),
            "com.au" | "au" => Ok(DataCenter::Au),
            "jp" => Ok(DataCenter::Jp),
            "com.cn" | "cn" => Ok(DataCenter::Cn),
            other => Err(format!("unknown Zoho data center '{other}'")),
        }
    }
}

impl fmt::Display for DataCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_us() {
        assert_eq!(DataCenter::default(), DataCenter::Us);
        assert_eq!(
            DataCenter::default().token_url(),
            "https://accounts.zoho.com/oauth/v2/token"
        );
    }

    #[test]
    fn urls_share_the_same_suffix() {
        let dc = DataCenter::Au;
        assert_eq!(dc.token_url(), "https://accounts.zoho.com.au/oauth/v2/token");
        assert_eq!(dc.recruit_api_url(), "https://recruit.zoho.com.au/recruit/v2");
    }

    #[test]
    fn parses_suffixes_and_aliases() {
        assert_eq!("eu".parse::<DataCenter>().unwrap(), DataCenter::Eu);
        assert_eq!("COM.CN".parse::<DataCenter>().unwrap(), DataCenter::Cn);
        assert_eq!("us".parse::<DataCenter>().unwrap(), DataCenter::Us);
        assert_eq!("au".parse::<DataCenter>().unwrap(), DataCenter::Au);
        assert!("mars".parse::<DataCenter>().is_err());
    }

    #[test]
    fn deserializes_from_config_value() {
        #[derive(Deserialize)]
        struct Wrapper {
            dc: DataCenter,
        }
        let w: Wrapper = serde_json::from_str(r#"{"dc":"in"}"#).unwrap();
        assert_eq!(w.dc, DataCenter::In);
        let w: Wrapper = serde_json::from_str(r#"{"dc":"au"}"#).unwrap();
        assert_eq!(w.dc, DataCenter::Au);
    }

    #[test]
    fn display_is_suffix() {
        assert_eq!(DataCenter::Jp.to_string(), "jp");
    }
}
