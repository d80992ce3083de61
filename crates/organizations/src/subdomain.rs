//! Subdomain derivation for new tenants.

pub const MAX_BASE_LEN: usize = 15;

/// Host labels that never identify a tenant.
const RESERVED: &[&str] = &["www", "api", "admin"];

pub fn is_reserved_subdomain(label: &str) -> bool {
    RESERVED.contains(&label)
}

/// Lowercase ASCII alphanumerics of `name`, truncated to 15 characters.
///
/// Falls back to `"org"` when nothing usable remains.
pub fn derive_subdomain(name: &str) -> String {
    let base: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_BASE_LEN)
        .collect();
    if base.is_empty() || is_reserved_subdomain(&base) {
        "org".to_string()
    } else {
        base
    }
}

/// First of `base`, `base1`, `base2`, ... for which `taken` is false.
pub fn unique_subdomain(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut counter = 1u32;
    loop {
        let candidate = format!("{base}{counter}");
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Validate a client supplied subdomain label.
pub fn validate_subdomain(label: &str) -> Result<String, String> {
    let label = label.trim().to_ascii_lowercase();
    if label.is_empty() || label.len() > 63 {
        return Err("Subdomain must be between 1 and 63 characters".to_string());
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        || label.starts_with('-')
        || label.ends_with('-')
    {
        return Err("Subdomain may only contain letters, digits and inner hyphens".to_string());
    }
    if is_reserved_subdomain(&label) {
        return Err(format!("Subdomain '{label}' is reserved"));
    }
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_and_truncates() {
        assert_eq!(derive_subdomain("Acme Industries Pvt. Ltd."), "acmeindustries");
        assert_eq!(derive_subdomain("A Very Long Organization Name"), "averylongorgani");
        assert_eq!(derive_subdomain("!!!"), "org");
        assert_eq!(derive_subdomain("WWW"), "org");
    }

    #[test]
    fn counter_suffix_until_free() {
        let taken = ["acme", "acme1", "acme2"];
        assert_eq!(unique_subdomain("acme", |s| taken.contains(&s)), "acme3");
        assert_eq!(unique_subdomain("fresh", |s| taken.contains(&s)), "fresh");
    }

    #[test]
    fn explicit_labels_are_checked() {
        assert_eq!(validate_subdomain(" Acme-East ").unwrap(), "acme-east");
        assert!(validate_subdomain("-bad").is_err());
        assert!(validate_subdomain("api").is_err());
        assert!(validate_subdomain("has space").is_err());
    }

    proptest! {
        #[test]
        fn derived_label_is_short_lowercase_alnum(name in "\\PC{0,60}") {
            let label = derive_subdomain(&name);
            prop_assert!(!label.is_empty());
            prop_assert!(label.len() <= MAX_BASE_LEN);
            prop_assert!(label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
