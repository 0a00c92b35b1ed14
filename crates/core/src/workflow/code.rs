use crate::domain::request::RequestCode;

pub const DEFAULT_REQUEST_CODE_PREFIX: &str = "BAJA";

/// Human-readable request codes: `{prefix}-{year}-{sequence:05}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestCodeFormat {
    prefix: String,
}

impl RequestCodeFormat {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into().trim().to_ascii_uppercase() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn format(&self, year: i32, sequence: u32) -> RequestCode {
        RequestCode(format!("{}-{year:04}-{sequence:05}", self.prefix))
    }

    pub fn matches(&self, code: &str) -> bool {
        let Some(rest) = code.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        let mut parts = rest.splitn(3, '-');
        let (Some(""), Some(year), Some(sequence)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };

        year.len() == 4
            && sequence.len() >= 5
            && year.bytes().all(|byte| byte.is_ascii_digit())
            && sequence.bytes().all(|byte| byte.is_ascii_digit())
    }
}

impl Default for RequestCodeFormat {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_CODE_PREFIX)
    }
}
