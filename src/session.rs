use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

use crate::auth::User;
use crate::sort::SortMethod;

pub const DEFAULT_RECORDS_KEY: &str = "jobApplications";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Remote => f.write_str("cloud"),
        }
    }
}

/// Everything a handler needs to know about the current run: who is signed
/// in, which backend is active, how the list is ordered and which record is
/// being edited.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: Option<User>,
    pub backend: Backend,
    pub sort: SortMethod,
    pub editing: Option<i64>,
}

impl Session {
    pub fn new(user: Option<User>, backend: Backend, sort: SortMethod) -> Self {
        Self {
            user,
            backend,
            sort,
            editing: None,
        }
    }

    pub fn uid(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.uid.as_deref())
    }

    pub fn records_key(&self) -> String {
        records_key_for(self.user.as_ref())
    }
}

/// Local storage key for a user's records; anonymous use shares one key.
pub fn records_key_for(user: Option<&User>) -> String {
    match user {
        Some(u) if !u.email.is_empty() => {
            format!("{}_{}", DEFAULT_RECORDS_KEY, encode_uri_component(&u.email))
        }
        _ => DEFAULT_RECORDS_KEY.to_string(),
    }
}

// Same unreserved set as JavaScript's encodeURIComponent.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            email: email.to_string(),
            uid: None,
            name: String::new(),
            tokens: None,
        }
    }

    #[test]
    fn test_records_key() {
        assert_eq!(records_key_for(None), "jobApplications");
        assert_eq!(records_key_for(Some(&user(""))), "jobApplications");
        assert_eq!(
            records_key_for(Some(&user("jane+jobs@example.com"))),
            "jobApplications_jane%2Bjobs%40example.com"
        );
    }

    #[test]
    fn test_encode_uri_component_utf8() {
        assert_eq!(encode_uri_component("é a"), "%C3%A9%20a");
        assert_eq!(encode_uri_component("a.b_c-d~*'()!"), "a.b_c-d~*'()!");
    }

    #[test]
    fn test_uid_only_for_cloud_users() {
        let mut session = Session::new(Some(user("a@b.c")), Backend::Local, SortMethod::Date);
        assert_eq!(session.uid(), None);
        session.user.as_mut().unwrap().uid = Some("u1".to_string());
        assert_eq!(session.uid(), Some("u1"));
        assert_eq!(session.editing, None);
    }
}
