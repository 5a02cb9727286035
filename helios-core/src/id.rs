//! Slug and id generation helpers shared by store implementations.

use uuid::Uuid;

/// Generate a stable 8-character deployment id, the first group of a v4 UUID.
#[must_use]
pub fn deployment_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Generate a default agent id from a hostname: `⟨hostname[:8]⟩-⟨rand4⟩`.
#[must_use]
pub fn agent_id(hostname: &str) -> String {
    let host_part: String = hostname.chars().take(8).collect();
    let rand_part: String = Uuid::new_v4().simple().to_string()[..4].to_string();
    format!("{host_part}-{rand_part}")
}

/// Generate the deterministic agent id used for auto-registration on ingest:
/// `⟨hostname[:8]⟩-⟨deployment[:4]⟩`.
#[must_use]
pub fn auto_register_agent_id(hostname: &str, deployment: &str) -> String {
    let host_part: String = hostname.chars().take(8).collect();
    let dep_part: String = deployment.chars().take(4).collect();
    format!("{host_part}-{dep_part}")
}

/// Whether `name` is a valid deployment name: `[a-z0-9-]{1,64}`.
#[must_use]
pub fn is_valid_deployment_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_id_is_eight_chars() {
        assert_eq!(deployment_id().len(), 8);
    }

    #[test]
    fn agent_id_truncates_hostname() {
        let id = agent_id("a-very-long-hostname");
        assert!(id.starts_with("a-very-l-"));
    }

    #[test]
    fn deployment_name_validation() {
        assert!(is_valid_deployment_name("prod-web"));
        assert!(!is_valid_deployment_name("Prod Web"));
        assert!(!is_valid_deployment_name(""));
    }
}
