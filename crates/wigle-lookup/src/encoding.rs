//! Query encodings for the MCC/MNC endpoint

use wigle_core::Query;

/// Maps `(mcc, mnc)` to one query, or `None` when it does not apply.
pub type Encoding = fn(&str, &str) -> Option<Query>;

/// Alternate encodings, in the order they are tried after an empty primary
/// result.
pub const FALLBACK_ENCODINGS: [Encoding; 3] = [concatenated, padded_to_2, padded_to_3];

fn pair(key: &str, value: String) -> Query {
    vec![(key.to_string(), value)]
}

/// The primary request: whichever of `mcc`/`mnc` is non-empty.
pub fn primary_query(mcc: &str, mnc: &str) -> Option<Query> {
    let query: Query = [("mcc", mcc), ("mnc", mnc)]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    (!query.is_empty()).then_some(query)
}

/// `mccmnc` as the plain concatenation.
pub fn concatenated(mcc: &str, mnc: &str) -> Option<Query> {
    if mcc.is_empty() || mnc.is_empty() {
        return None;
    }
    Some(pair("mccmnc", format!("{mcc}{mnc}")))
}

fn padded(mcc: &str, mnc: &str, width: usize) -> Option<Query> {
    if mcc.is_empty() || mnc.is_empty() || !mnc.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(pair("mccmnc", format!("{mcc}{mnc:0>width$}")))
}

pub fn padded_to_2(mcc: &str, mnc: &str) -> Option<Query> {
    padded(mcc, mnc, 2)
}

pub fn padded_to_3(mcc: &str, mnc: &str) -> Option<Query> {
    padded(mcc, mnc, 3)
}

/// Every fallback query that applies to `(mcc, mnc)`, in order.
pub fn fallback_queries(mcc: &str, mnc: &str) -> Vec<Query> {
    FALLBACK_ENCODINGS
        .iter()
        .filter_map(|encode| encode(mcc, mnc))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mccmnc(queries: &[Query]) -> Vec<&str> {
        queries
            .iter()
            .map(|q| {
                assert_eq!(q.len(), 1);
                assert_eq!(q[0].0, "mccmnc");
                q[0].1.as_str()
            })
            .collect()
    }

    #[test]
    fn primary_sends_only_present_codes() {
        assert_eq!(
            primary_query("310", ""),
            Some(vec![("mcc".to_string(), "310".to_string())])
        );
        assert_eq!(
            primary_query("310", "4").unwrap().len(),
            2
        );
        assert_eq!(primary_query("", ""), None);
    }

    #[test]
    fn fallbacks_in_order() {
        assert_eq!(mccmnc(&fallback_queries("310", "4")), vec!["3104", "31004", "310004"]);
    }

    #[test]
    fn padding_never_truncates() {
        assert_eq!(mccmnc(&fallback_queries("310", "410")), vec!["310410", "310410", "310410"]);
        assert_eq!(mccmnc(&fallback_queries("234", "15")), vec!["23415", "23415", "234015"]);
    }

    #[test]
    fn non_numeric_mnc_is_not_padded() {
        assert_eq!(mccmnc(&fallback_queries("310", "4a")), vec!["3104a"]);
    }

    #[test]
    fn fallbacks_need_both_codes() {
        assert!(fallback_queries("310", "").is_empty());
        assert!(fallback_queries("", "4").is_empty());
    }
}
