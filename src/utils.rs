use chrono::{DateTime, Utc};

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// E-mail addresses are compared case-insensitively everywhere overrides are
/// keyed by them.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_module(module: &str) -> String {
    module.trim().to_lowercase()
}

/// `None` means "never expires".
pub fn is_unexpired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        None => true,
        Some(at) => at > now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_strictly_after_now() {
        let now = utc_now();
        assert!(is_unexpired(None, now));
        assert!(is_unexpired(Some(now + Duration::seconds(1)), now));
        assert!(!is_unexpired(Some(now), now));
        assert!(!is_unexpired(Some(now - Duration::seconds(1)), now));
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn modules_are_trimmed_and_lowercased() {
        assert_eq!(normalize_module(" Tours "), "tours");
    }
}
