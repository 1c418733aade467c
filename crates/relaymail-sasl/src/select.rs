//! Mechanism selection policy.

use crate::Mechanism;

/// Picks the mechanism to run against a server.
///
/// A candidate that resists eavesdropping (e.g. CRAM-MD5) wins whenever the
/// server advertises its name. Otherwise the first candidate that relies on
/// channel encryption is used, whether or not the server lists it; that
/// mechanism's own `start` decides if it may run. Candidate order only
/// matters among mechanisms of the same kind.
///
/// Returns `None` when no candidate applies.
#[must_use]
pub fn select_mechanism(
    advertised: &[String],
    candidates: Vec<Box<dyn Mechanism>>,
) -> Option<Box<dyn Mechanism>> {
    let (resilient, plain): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|m| m.resists_eavesdropping());

    resilient
        .into_iter()
        .find(|m| advertised.iter().any(|a| a.eq_ignore_ascii_case(m.name())))
        .or_else(|| plain.into_iter().next())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{CramMd5, Plain};

    fn advertised(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn plain() -> Box<dyn Mechanism> {
        Box::new(Plain::new("", "user", "pass", "smtp.example.com"))
    }

    fn cram() -> Box<dyn Mechanism> {
        Box::new(CramMd5::new("user", "pass"))
    }

    #[test]
    fn test_prefers_cram_md5_in_either_position() {
        let server = advertised(&["CRAM-MD5", "LOGIN"]);

        let first = select_mechanism(&server, vec![plain(), cram()]).unwrap();
        let second = select_mechanism(&server, vec![cram(), plain()]).unwrap();

        assert_eq!(first.name(), "CRAM-MD5");
        assert_eq!(second.name(), "CRAM-MD5");
    }

    #[test]
    fn test_falls_back_when_cram_not_advertised() {
        let server = advertised(&["PLAIN", "LOGIN"]);

        let chosen = select_mechanism(&server, vec![cram(), plain()]).unwrap();
        assert_eq!(chosen.name(), "PLAIN");
    }

    #[test]
    fn test_advertised_names_case_insensitive() {
        let server = advertised(&["cram-md5"]);

        let chosen = select_mechanism(&server, vec![plain(), cram()]).unwrap();
        assert_eq!(chosen.name(), "CRAM-MD5");
    }

    #[test]
    fn test_no_fallback_available() {
        let server = advertised(&["PLAIN"]);
        assert!(select_mechanism(&server, vec![cram()]).is_none());
        assert!(select_mechanism(&server, Vec::new()).is_none());
    }
}
