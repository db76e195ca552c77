use ldapd_domain::types::Syntax;
use ldapd_domain_handlers::handler::DnNormalizer;

use crate::matching::{canonical_integer, parse_generalized_time};

fn is_printable(c: char) -> bool {
    c.is_ascii_alphanumeric() || " '()+,-./:?".contains(c)
}

/// Checks that `raw` is a valid value of `syntax`, independently of any
/// equality rule.
pub fn validate(syntax: Syntax, raw: &[u8], dn_normalizer: &dyn DnNormalizer) -> Result<(), String> {
    let text = || std::str::from_utf8(raw).map_err(|_| "value is not valid UTF-8".to_string());
    match syntax {
        Syntax::OctetString => Ok(()),
        Syntax::DirectoryString => {
            if text()?.trim().is_empty() {
                Err("empty string".to_string())
            } else {
                Ok(())
            }
        }
        Syntax::Ia5String => {
            if raw.is_ascii() {
                Ok(())
            } else {
                Err("value is not an IA5 string".to_string())
            }
        }
        Syntax::Integer => canonical_integer(text()?.trim())
            .map(|_| ())
            .ok_or_else(|| "not an integer".to_string()),
        Syntax::DistinguishedName => dn_normalizer
            .normalize_dn(text()?)
            .map(|_| ())
            .map_err(|e| e.reason),
        Syntax::TelephoneNumber => {
            let value = text()?;
            if !value.is_empty() && value.chars().all(is_printable) {
                Ok(())
            } else {
                Err("not a printable string".to_string())
            }
        }
        Syntax::GeneralizedTime => parse_generalized_time(text()?)
            .map(|_| ())
            .ok_or_else(|| "not a generalized time".to_string()),
        Syntax::Uuid => uuid::Uuid::try_parse(text()?)
            .map(|_| ())
            .map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Schema;
    use pretty_assertions::assert_eq;

    fn check(syntax: Syntax, raw: &str) -> Result<(), String> {
        validate(syntax, raw.as_bytes(), &Schema::default())
    }

    #[test]
    fn test_string_syntaxes() {
        assert_eq!(check(Syntax::DirectoryString, "Bob"), Ok(()));
        assert_eq!(check(Syntax::DirectoryString, "  "), Err("empty string".to_string()));
        assert_eq!(
            validate(Syntax::DirectoryString, &[0xff, 0xfe], &Schema::default()),
            Err("value is not valid UTF-8".to_string())
        );
        assert_eq!(check(Syntax::Ia5String, "bob@example.com"), Ok(()));
        assert_eq!(
            check(Syntax::Ia5String, "bøb"),
            Err("value is not an IA5 string".to_string())
        );
        assert_eq!(check(Syntax::TelephoneNumber, "+1 555-0100"), Ok(()));
        assert!(check(Syntax::TelephoneNumber, "555#0100").is_err());
    }

    #[test]
    fn test_structured_syntaxes() {
        assert_eq!(check(Syntax::Integer, "-0042"), Ok(()));
        assert_eq!(check(Syntax::Integer, "4x"), Err("not an integer".to_string()));
        assert_eq!(check(Syntax::DistinguishedName, "cn=Bob,dc=example,dc=com"), Ok(()));
        assert!(check(Syntax::DistinguishedName, "not a dn").is_err());
        assert_eq!(check(Syntax::GeneralizedTime, "20240102030405Z"), Ok(()));
        assert_eq!(
            check(Syntax::GeneralizedTime, "yesterday"),
            Err("not a generalized time".to_string())
        );
        assert_eq!(
            check(Syntax::Uuid, "a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8"),
            Ok(())
        );
        assert!(check(Syntax::Uuid, "a1a2").is_err());
        assert_eq!(validate(Syntax::OctetString, &[0, 1, 2], &Schema::default()), Ok(()));
    }
}
