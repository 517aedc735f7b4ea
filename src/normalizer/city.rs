//! City-label rules: station-code detection and district collapsing.

use crate::reference::{DistrictAlias, StationLabelRules};

/// Returns `false` for labels that are empty or look like an internal
/// station or network identifier rather than a place name.
///
/// A label is rejected when it starts with a country prefix immediately
/// followed by a digit (`FR04001`), starts with an operator prefix
/// (`ATMO-NORD`), or contains a network marker (`NET-12`). Matching is
/// case-sensitive.
pub fn is_valid_city_label(label: &str, rules: &StationLabelRules) -> bool {
    if label.trim().is_empty() {
        return false;
    }

    let station_code = rules.country_prefixes.iter().any(|prefix| {
        label
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_digit())
    });
    if station_code {
        return false;
    }

    if rules
        .operator_prefixes
        .iter()
        .any(|prefix| label.starts_with(prefix.as_str()))
    {
        return false;
    }

    !rules
        .network_markers
        .iter()
        .any(|marker| label.contains(marker.as_str()))
}

/// Uppercases `label` and collapses district-level labels of multi-district
/// cities into the city's root name.
///
/// A label collapses to `ROOT` when it contains the root and either contains
/// the district marker or starts with `"ROOT "`. `VILLEPARISIS` therefore
/// stays as is.
pub fn canonicalize_city(label: &str, aliases: &[DistrictAlias]) -> String {
    let upper = label.to_uppercase();

    for alias in aliases {
        let root = alias.root.to_uppercase();
        if !upper.contains(&root) {
            continue;
        }

        let marker = alias.district_marker.to_uppercase();
        let is_district = (!marker.is_empty() && upper.contains(&marker))
            || upper
                .strip_prefix(root.as_str())
                .is_some_and(|rest| rest.starts_with(' '));
        if is_district {
            return root;
        }
    }

    upper
}
