use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Opened,
    Closed,
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IssueState::Opened => write!(f, "opened"),
            IssueState::Closed => write!(f, "closed"),
        }
    }
}

/// An issue as returned by `GET /api/v4/issues`. Only `iid`, title, description
/// and link end up in a reminder; the rest mirrors the payload.
#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub id: u64,
    /// Project-local number, the one users see as `#iid`.
    pub iid: u64,
    pub project_id: u64,
    pub title: String,
    pub description: Option<String>,
    pub state: IssueState,
    #[serde(deserialize_with = "rfc3339")]
    pub created_at: String,
    #[serde(deserialize_with = "rfc3339")]
    pub updated_at: String,
    pub due_date: Option<String>,
    pub web_url: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Issue {
    pub fn reminder_title(&self) -> String {
        format!("#{}: {}", self.iid, self.title)
    }

    pub fn reminder_notes(&self) -> String {
        format!(
            "{}\n\nURL: {}",
            self.description.as_deref().unwrap_or_default(),
            self.web_url
        )
    }
}

fn rfc3339<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if is_rfc3339(&s) {
        Ok(s)
    } else {
        Err(de::Error::invalid_value(
            Unexpected::Str(&s),
            &"an RFC 3339 timestamp",
        ))
    }
}

/// `YYYY-MM-DDTHH:MM:SS[.frac](Z|+HH:MM|-HH:MM)`
fn is_rfc3339(s: &str) -> bool {
    let b = s.as_bytes();
    let num = |at: usize| -> Option<u32> {
        match b.get(at..at + 2)? {
            [hi, lo] if hi.is_ascii_digit() && lo.is_ascii_digit() => {
                Some(u32::from(hi - b'0') * 10 + u32::from(lo - b'0'))
            }
            _ => None,
        }
    };
    let field = |at: usize, range: std::ops::RangeInclusive<u32>| {
        num(at).map_or(false, |n| range.contains(&n))
    };

    if b.len() < 20
        || num(0).is_none()
        || num(2).is_none()
        || b[4] != b'-'
        || !field(5, 1..=12)
        || b[7] != b'-'
        || !field(8, 1..=31)
        || !matches!(b[10], b'T' | b't')
        || !field(11, 0..=23)
        || b[13] != b':'
        || !field(14, 0..=59)
        || b[16] != b':'
        || !field(17, 0..=60)
    {
        return false;
    }

    let mut rest = &b[19..];
    if let Some(frac) = rest.strip_prefix(b".") {
        let len = frac.iter().take_while(|c| c.is_ascii_digit()).count();
        if len == 0 {
            return false;
        }
        rest = &frac[len..];
    }
    match rest {
        [b'Z' | b'z'] => true,
        [b'+' | b'-', _, _, b':', _, _] => {
            let at = b.len() - 5;
            field(at, 0..=23) && field(at + 3, 0..=59)
        }
        _ => false,
    }
}

#[cfg(test)]
pub(crate) fn issue(iid: u64, title: &str) -> Issue {
    Issue {
        id: 1000 + iid,
        iid,
        project_id: 7,
        title: title.to_string(),
        description: Some(format!("Details for {}", title)),
        state: IssueState::Opened,
        created_at: "2024-01-01T10:00:00.000Z".to_string(),
        updated_at: "2024-01-02T10:00:00.000Z".to_string(),
        due_date: None,
        web_url: format!("https://gitlab.example.com/group/project/-/issues/{}", iid),
        labels: vec![],
    }
}
