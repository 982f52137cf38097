use log::debug;
use mac_address::MacAddress;

/// Returns true when `candidate` is exactly six colon separated pairs of hex
/// digits. Trailing or leading characters make the whole token invalid.
pub fn validate(candidate: &str) -> bool {
    let mut octets = 0;
    for octet in candidate.split(':') {
        if octet.len() != 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
        octets += 1;
    }
    octets == 6
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Upper case, deduplicated, in first-seen order.
    pub valid: Vec<String>,
    /// Rejected tokens exactly as supplied.
    pub invalid: Vec<String>,
}

/// Splits user supplied tokens into well formed and malformed addresses.
pub fn partition<I, S>(candidates: I) -> Partition
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = Partition::default();
    for candidate in candidates {
        let candidate = candidate.as_ref();
        match normalize(candidate) {
            Some(address) if result.valid.contains(&address) => {
                debug!("Dropping duplicate address {}", candidate);
            }
            Some(address) => result.valid.push(address),
            None => result.invalid.push(candidate.to_string()),
        }
    }
    result
}

fn normalize(candidate: &str) -> Option<String> {
    if !validate(candidate) {
        return None;
    }
    candidate.parse::<MacAddress>().ok().map(|mac| mac.to_string())
}
