use std::collections::HashMap;

use ldapd_domain::{
    backend::{BackendDescriptor, BackendId},
    dn::DistinguishedName,
    error::ReservedEntry,
};

use crate::core::referral::rewrite_referrals;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ConfigurationError(pub String);

#[derive(Debug, PartialEq, Eq)]
pub enum Route<'a> {
    Backend(&'a BackendDescriptor),
    /// No local backend holds the DN: the default referrals, rewritten for it.
    Referral(Vec<String>),
    /// No local backend and no default referral.
    Unroutable,
}

/// The backend table and the server wide settings of the add path. Built
/// once at startup, then only read.
#[derive(Debug)]
pub struct DirectoryInfo {
    backends: Vec<BackendDescriptor>,
    default_referrals: Vec<String>,
    subschema_dn: DistinguishedName,
}

impl DirectoryInfo {
    pub fn new(
        backends: Vec<BackendDescriptor>,
        default_referrals: Vec<String>,
        subschema_dn: DistinguishedName,
    ) -> Result<Self, ConfigurationError> {
        let mut owners: HashMap<&str, &BackendId> = HashMap::new();
        for backend in &backends {
            if backend.suffixes.is_empty() {
                return Err(ConfigurationError(format!(
                    "backend `{}` has no suffix",
                    backend.id
                )));
            }
            for suffix in &backend.suffixes {
                if let Some(owner) = owners.insert(suffix.normalized(), &backend.id) {
                    return Err(ConfigurationError(format!(
                        "suffix `{suffix}` is served by both `{owner}` and `{}`",
                        backend.id
                    )));
                }
            }
        }
        Ok(Self {
            backends,
            default_referrals,
            subschema_dn,
        })
    }

    pub fn backends(&self) -> &[BackendDescriptor] {
        &self.backends
    }

    pub fn default_referrals(&self) -> &[String] {
        &self.default_referrals
    }

    pub fn subschema_dn(&self) -> &DistinguishedName {
        &self.subschema_dn
    }

    /// Entries that always exist and can never be added.
    pub fn reserved_entry(&self, dn: &DistinguishedName) -> Option<ReservedEntry> {
        if dn.is_root() {
            Some(ReservedEntry::RootDse)
        } else if dn == &self.subschema_dn {
            Some(ReservedEntry::SubschemaSubentry)
        } else {
            None
        }
    }

    /// The backend with the longest suffix containing `dn`.
    ///
    /// With `manage_dsa_it`, a backend whose suffix is exactly `dn` is only
    /// picked when no backend holds a proper superior of it, so that the
    /// suffix entry of a subordinate backend can be managed from above.
    pub fn select_backend(
        &self,
        dn: &DistinguishedName,
        manage_dsa_it: bool,
    ) -> Option<&BackendDescriptor> {
        let mut best: Option<(&BackendDescriptor, usize)> = None;
        let mut exact = None;
        let candidates = self
            .backends
            .iter()
            .flat_map(|backend| backend.suffixes.iter().map(move |suffix| (backend, suffix)))
            .filter(|(_, suffix)| dn.is_within(suffix));
        for (backend, suffix) in candidates {
            if manage_dsa_it && suffix == dn {
                exact = exact.or(Some(backend));
                continue;
            }
            let depth = suffix.rdn_count();
            if best.map_or(true, |(_, best_depth)| depth > best_depth) {
                best = Some((backend, depth));
            }
        }
        best.map(|(backend, _)| backend).or(exact)
    }

    pub fn route(&self, dn: &DistinguishedName, manage_dsa_it: bool) -> Route<'_> {
        match self.select_backend(dn, manage_dsa_it) {
            Some(backend) => Route::Backend(backend),
            None if self.default_referrals.is_empty() => Route::Unroutable,
            None => Route::Referral(rewrite_referrals(&self.default_referrals, dn)),
        }
    }
}
