use std::collections::BTreeSet;

pub const ADMIN_EMAILS_VAR: &str = "ADMIN_EMAILS";

/// Static set of emails treated as super admins regardless of their stored role.
///
/// Entries are trimmed and lowercased on the way in, lookups are lowercased too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: BTreeSet<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|email| normalize(email.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();

        Self { emails }
    }

    /// Parses a comma separated list, e.g. `a@x.com, b@x.com`.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn from_env() -> Self {
        match std::env::var(ADMIN_EMAILS_VAR) {
            Ok(raw) => {
                let list = Self::parse(&raw);
                if list.is_empty() {
                    tracing::warn!("{ADMIN_EMAILS_VAR} is set but contains no emails");
                }
                list
            }
            Err(_) => {
                tracing::warn!("{ADMIN_EMAILS_VAR} not set; no allow-listed admins");
                Self::default()
            }
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize(email))
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_lowercases_and_drops_empties() {
        let list = AdminAllowList::parse(" Owner@OakWorks.test ,, ops@oakworks.test,");
        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["ops@oakworks.test", "owner@oakworks.test"]);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let list = AdminAllowList::new(["owner@oakworks.test"]);
        assert!(list.contains("OWNER@oakworks.test"));
        assert!(list.contains(" owner@oakworks.test "));
        assert!(!list.contains("owner@oakworks.test.evil"));
    }

    #[test]
    fn empty_list_contains_nothing() {
        let list = AdminAllowList::parse("");
        assert!(list.is_empty());
        assert!(!list.contains(""));
    }
}
