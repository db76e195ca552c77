use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use ldapd_domain::{error::MatchError, types::MatchingRule};

use crate::dn::{escape_value, parse_dn};

fn as_utf8(raw: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(raw).map_err(|_| "value is not valid UTF-8".to_string())
}

/// Trims the value and collapses inner runs of whitespace to a single space.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn prepare_string(raw: &[u8], fold_case: bool) -> Result<Vec<u8>, String> {
    let value = collapse_whitespace(as_utf8(raw)?);
    if value.is_empty() {
        return Err("empty string".to_string());
    }
    Ok(if fold_case {
        value.to_lowercase()
    } else {
        value
    }
    .into_bytes())
}

pub struct CaseIgnoreMatch;

impl MatchingRule for CaseIgnoreMatch {
    fn name(&self) -> &'static str {
        "caseIgnoreMatch"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        prepare_string(raw, true)
    }
}

pub struct CaseExactMatch;

impl MatchingRule for CaseExactMatch {
    fn name(&self) -> &'static str {
        "caseExactMatch"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        prepare_string(raw, false)
    }
}

pub struct CaseIgnoreIa5Match;

impl MatchingRule for CaseIgnoreIa5Match {
    fn name(&self) -> &'static str {
        "caseIgnoreIA5Match"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        if !raw.is_ascii() {
            return Err("value is not an IA5 string".to_string());
        }
        prepare_string(raw, true)
    }
}

pub struct OctetStringMatch;

impl MatchingRule for OctetStringMatch {
    fn name(&self) -> &'static str {
        "octetStringMatch"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        Ok(raw.to_vec())
    }
}

pub(crate) fn canonical_integer(value: &str) -> Option<String> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, value),
    };
    if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits = digits.trim_start_matches('0');
    Some(match (negative, digits.is_empty()) {
        (_, true) => "0".to_string(),
        (true, false) => format!("-{digits}"),
        (false, false) => digits.to_string(),
    })
}

pub struct IntegerMatch;

impl MatchingRule for IntegerMatch {
    fn name(&self) -> &'static str {
        "integerMatch"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        canonical_integer(as_utf8(raw)?.trim())
            .map(String::into_bytes)
            .ok_or_else(|| "not an integer".to_string())
    }

    fn matches(&self, left: &[u8], right: &[u8]) -> Result<bool, MatchError> {
        let canonical = |v: &[u8]| {
            std::str::from_utf8(v)
                .ok()
                .and_then(canonical_integer)
                .ok_or(MatchError::Unavailable(self.name()))
        };
        Ok(canonical(left)? == canonical(right)?)
    }
}

pub struct TelephoneNumberMatch;

impl MatchingRule for TelephoneNumberMatch {
    fn name(&self) -> &'static str {
        "telephoneNumberMatch"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        let value: String = as_utf8(raw)?
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        if value.is_empty() {
            return Err("empty telephone number".to_string());
        }
        Ok(value.into_bytes())
    }
}

pub(crate) fn parse_generalized_time(value: &str) -> Option<DateTime<Utc>> {
    if let Some(utc) = value.strip_suffix('Z') {
        return ["%Y%m%d%H%M%S", "%Y%m%d%H%M%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(utc, format).ok())
            .map(|t| t.and_utc());
    }
    ["%Y%m%d%H%M%S%z", "%Y%m%d%H%M%S%.f%z"]
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
        .map(|t| t.with_timezone(&Utc))
}

pub(crate) fn format_generalized_time(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%d%H%M%SZ").to_string()
}

/// Compares instants at second granularity.
pub struct GeneralizedTimeMatch;

impl MatchingRule for GeneralizedTimeMatch {
    fn name(&self) -> &'static str {
        "generalizedTimeMatch"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        parse_generalized_time(as_utf8(raw)?)
            .map(|t| format_generalized_time(&t).into_bytes())
            .ok_or_else(|| "not a generalized time".to_string())
    }
}

/// Compares DNs without consulting the schema: attribute types and values
/// are case folded, and multi-valued RDNs are sorted.
pub struct DistinguishedNameMatch;

impl MatchingRule for DistinguishedNameMatch {
    fn name(&self) -> &'static str {
        "distinguishedNameMatch"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        let rdns = parse_dn(as_utf8(raw)?)?;
        let normalized: Vec<String> = rdns
            .iter()
            .map(|rdn| {
                let mut avas: Vec<String> = rdn
                    .iter()
                    .map(|ava| {
                        format!(
                            "{}={}",
                            ava.attribute.to_lowercase(),
                            escape_value(&collapse_whitespace(&ava.value).to_lowercase())
                        )
                    })
                    .collect();
                avas.sort();
                avas.join("+")
            })
            .collect();
        Ok(normalized.join(",").into_bytes())
    }
}

pub struct UuidMatch;

impl MatchingRule for UuidMatch {
    fn name(&self) -> &'static str {
        "uuidMatch"
    }

    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, String> {
        uuid::Uuid::try_parse(as_utf8(raw)?)
            .map(|u| u.hyphenated().to_string().into_bytes())
            .map_err(|e| e.to_string())
    }
}

/// Rules shared by every attribute type of a schema.
#[derive(Clone)]
pub struct MatchingRules {
    pub case_ignore: Arc<dyn MatchingRule>,
    pub case_exact: Arc<dyn MatchingRule>,
    pub case_ignore_ia5: Arc<dyn MatchingRule>,
    pub octet_string: Arc<dyn MatchingRule>,
    pub integer: Arc<dyn MatchingRule>,
    pub telephone_number: Arc<dyn MatchingRule>,
    pub generalized_time: Arc<dyn MatchingRule>,
    pub distinguished_name: Arc<dyn MatchingRule>,
    pub uuid: Arc<dyn MatchingRule>,
}

impl Default for MatchingRules {
    fn default() -> Self {
        Self {
            case_ignore: Arc::new(CaseIgnoreMatch),
            case_exact: Arc::new(CaseExactMatch),
            case_ignore_ia5: Arc::new(CaseIgnoreIa5Match),
            octet_string: Arc::new(OctetStringMatch),
            integer: Arc::new(IntegerMatch),
            telephone_number: Arc::new(TelephoneNumberMatch),
            generalized_time: Arc::new(GeneralizedTimeMatch),
            distinguished_name: Arc::new(DistinguishedNameMatch),
            uuid: Arc::new(UuidMatch),
        }
    }
}
