use {
    chrono::NaiveDate,
    serde::{Deserialize, Serialize},
    std::fmt,
};

pub const SESSION_DATE_KEY_FORMAT: &str = "%m-%d-%Y";

//
// SessionDateKey
// > calendar day grouping fragments of one meeting, zero-padded MM-DD-YYYY
//

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionDateKey(String);

impl SessionDateKey {
    pub fn parse(s: &str) -> Result<Self, String> {
        let date = NaiveDate::parse_from_str(s, SESSION_DATE_KEY_FORMAT)
            .map_err(|e| format!("invalid session date key '{}', e={}", s, e))?;

        // reject non-padded forms like 1-2-2024 so file names stay canonical
        if date.format(SESSION_DATE_KEY_FORMAT).to_string() != s {
            return Err(format!(
                "session date key must be zero-padded MM-DD-YYYY, got '{}'",
                s
            ));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionDateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionDateKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        SessionDateKey::parse(&s)
    }
}

impl From<SessionDateKey> for String {
    fn from(key: SessionDateKey) -> Self {
        key.0
    }
}

//
// StreamStatus
// > replaced on every poll
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    NotLive,
    Live {
        url: String,
        date_key: SessionDateKey,
    },
}

impl StreamStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, StreamStatus::Live { .. })
    }
}

//
// RecFileStatus
//

#[derive(strum_macros::Display, Clone, Copy, Debug, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum RecFileStatus {
    Fragment,  // recording in the work dir, not published yet
    Published, // moved or merged into the published dir
}
