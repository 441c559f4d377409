//! US state name to two-letter code mapping for directory URLs.

/// `(slug, code)` pairs; slugs are lower-case with hyphens for spaces.
const STATE_CODES: &[(&str, &str)] = &[
    ("alabama", "al"),
    ("alaska", "ak"),
    ("arizona", "az"),
    ("arkansas", "ar"),
    ("california", "ca"),
    ("colorado", "co"),
    ("connecticut", "ct"),
    ("delaware", "de"),
    ("florida", "fl"),
    ("georgia", "ga"),
    ("hawaii", "hi"),
    ("idaho", "id"),
    ("illinois", "il"),
    ("indiana", "in"),
    ("iowa", "ia"),
    ("kansas", "ks"),
    ("kentucky", "ky"),
    ("louisiana", "la"),
    ("maine", "me"),
    ("maryland", "md"),
    ("massachusetts", "ma"),
    ("michigan", "mi"),
    ("minnesota", "mn"),
    ("mississippi", "ms"),
    ("missouri", "mo"),
    ("montana", "mt"),
    ("nebraska", "ne"),
    ("nevada", "nv"),
    ("new-hampshire", "nh"),
    ("new-jersey", "nj"),
    ("new-mexico", "nm"),
    ("new-york", "ny"),
    ("north-carolina", "nc"),
    ("north-dakota", "nd"),
    ("ohio", "oh"),
    ("oklahoma", "ok"),
    ("oregon", "or"),
    ("pennsylvania", "pa"),
    ("rhode-island", "ri"),
    ("south-carolina", "sc"),
    ("south-dakota", "sd"),
    ("tennessee", "tn"),
    ("texas", "tx"),
    ("utah", "ut"),
    ("vermont", "vt"),
    ("virginia", "va"),
    ("washington", "wa"),
    ("west-virginia", "wv"),
    ("wisconsin", "wi"),
    ("wyoming", "wy"),
];

/// Lower-case a place name and replace whitespace runs with hyphens.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Map a state name or code to its two-letter code.
///
/// Returns `None` for unknown regions; callers fall back to the slug as-is.
pub fn region_code(region: &str) -> Option<&'static str> {
    let slug = slugify(region);
    STATE_CODES
        .iter()
        .find(|(name, code)| *name == slug || *code == slug)
        .map(|(_, code)| *code)
}
