use ldapd_domain::dn::DistinguishedName;
use tracing::debug;
use url::Url;

/// Points each referral URI at `target`. URIs that already name an entry are
/// kept as they are, and so are values that are not URLs at all.
pub fn rewrite_referrals(referrals: &[String], target: &DistinguishedName) -> Vec<String> {
    referrals
        .iter()
        .map(|referral| match Url::parse(referral) {
            Ok(mut url) if url.path().is_empty() || url.path() == "/" => {
                url.set_path(&format!("/{}", target.name()));
                url.to_string()
            }
            Ok(_) => referral.clone(),
            Err(e) => {
                debug!(referral, "Keeping unparseable referral as is: {e}");
                referral.clone()
            }
        })
        .collect()
}
