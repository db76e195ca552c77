use ldapd_domain::{dn::DistinguishedName, error::InvalidDn};
use ldapd_domain_handlers::handler::DnNormalizer;

use crate::schema::Schema;

/// One `type=value` pair of an RDN, with the value unescaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Ava {
    pub attribute: String,
    pub value: String,
}

fn is_valid_attribute_type(attribute: &str) -> bool {
    let mut chars = attribute.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || c == '-'),
        // Numeric OID.
        Some(c) if c.is_ascii_digit() => attribute
            .split('.')
            .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit())),
        _ => false,
    }
}

fn hex_value(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

#[derive(PartialEq, Eq)]
enum Separator {
    Ava,
    Rdn,
    End,
}

fn parse_value(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<(String, Separator), String> {
    while chars.next_if_eq(&' ').is_some() {}
    let mut value: Vec<u8> = Vec::new();
    // Escaped characters, including trailing spaces, survive trimming.
    let mut protected_len = 0;
    let mut separator = Separator::End;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| "Unterminated escape sequence".to_string())?;
                match hex_value(escaped) {
                    Some(high) if chars.peek().copied().and_then(hex_value).is_some() => {
                        let low = chars.next().and_then(hex_value).unwrap_or_default();
                        value.push(high << 4 | low);
                    }
                    _ if r#",+"\<>;= #"#.contains(escaped) => {
                        let mut buf = [0; 4];
                        value.extend_from_slice(escaped.encode_utf8(&mut buf).as_bytes());
                    }
                    _ => return Err(format!("Invalid escape sequence `\\{escaped}`")),
                }
                protected_len = value.len();
            }
            ',' | ';' => {
                separator = Separator::Rdn;
                break;
            }
            '+' => {
                separator = Separator::Ava;
                break;
            }
            '"' => return Err("Quoted DN values are not supported".to_string()),
            _ => {
                let mut buf = [0; 4];
                value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    while value.len() > protected_len && value.last() == Some(&b' ') {
        value.pop();
    }
    if value.is_empty() {
        return Err("Missing DN value".to_string());
    }
    let value = String::from_utf8(value).map_err(|_| "DN value is not valid UTF-8".to_string())?;
    Ok((value, separator))
}

/// Splits a string DN into RDNs, each a list of AVAs, in the order written.
pub(crate) fn parse_dn(dn: &str) -> Result<Vec<Vec<Ava>>, String> {
    let mut rdns = Vec::new();
    if dn.trim().is_empty() {
        return Ok(rdns);
    }
    let mut chars = dn.chars().peekable();
    let mut rdn = Vec::new();
    loop {
        let mut attribute = String::new();
        while let Some(c) = chars.next_if(|&c| !matches!(c, '=' | ',' | ';' | '+')) {
            attribute.push(c);
        }
        let attribute = attribute.trim();
        if chars.next() != Some('=') {
            return Err(if attribute.is_empty() {
                "Empty DN element".to_string()
            } else {
                format!("Missing DN value for `{attribute}`")
            });
        }
        if !is_valid_attribute_type(attribute) {
            return Err(format!("Invalid attribute type `{attribute}`"));
        }
        let (value, separator) = parse_value(&mut chars)?;
        rdn.push(Ava {
            attribute: attribute.to_owned(),
            value,
        });
        if separator != Separator::Ava {
            rdns.push(std::mem::take(&mut rdn));
        }
        if separator == Separator::End {
            return Ok(rdns);
        }
    }
}

pub(crate) fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '#' if i == 0 => escaped.push_str("\\#"),
            ' ' if i == 0 || i == last => escaped.push_str("\\ "),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Schema {
    fn normalize_ava(&self, ava: &Ava) -> Result<String, String> {
        let resolved = self.resolve(&ava.attribute);
        let (attribute, rule) = match &resolved {
            Some(attribute_type) => (
                attribute_type.name().as_str().to_lowercase(),
                attribute_type.equality(),
            ),
            None if self.allows_unknown_attributes() => (ava.attribute.to_lowercase(), None),
            None => return Err(format!("{}: attribute type undefined", ava.attribute)),
        };
        let value = match rule {
            Some(rule) => String::from_utf8(rule.normalize(ava.value.as_bytes())?)
                .map_err(|_| format!("{attribute}: normalized value is not valid UTF-8"))?,
            None => ava.value.clone(),
        };
        Ok(format!("{attribute}={}", escape_value(&value)))
    }
}

impl DnNormalizer for Schema {
    fn normalize_dn(&self, raw: &str) -> Result<DistinguishedName, InvalidDn> {
        let invalid = |reason: String| InvalidDn {
            dn: raw.to_owned(),
            reason,
        };
        let rdns = parse_dn(raw).map_err(invalid)?;
        let mut pretty = Vec::with_capacity(rdns.len());
        let mut normalized = Vec::with_capacity(rdns.len());
        for rdn in &rdns {
            pretty.push(
                rdn.iter()
                    .map(|ava| format!("{}={}", ava.attribute, escape_value(&ava.value)))
                    .collect::<Vec<_>>()
                    .join("+"),
            );
            let mut avas = rdn
                .iter()
                .map(|ava| self.normalize_ava(ava))
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?;
            avas.sort();
            normalized.push(avas.join("+"));
        }
        Ok(DistinguishedName::new(pretty.join(","), normalized.join(",")))
    }
}
