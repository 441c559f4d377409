//! Additive keyword relevance scoring for premarital-counseling fit.

use leadline_shared::Tier;

use crate::parse::Listing;

/// Listings scoring below this are dropped.
pub const MIN_SCORE: u32 = 15;

/// Direct premarital-program signals.
const TIER1_KEYWORDS: &[(&str, i32)] = &[
    ("prepare/enrich", 100),
    ("prepare enrich", 100),
    ("gottman", 60),
    ("eft", 60),
    ("emotionally focused therapy", 60),
    ("marriage preparation", 80),
    ("engagement counseling", 90),
];

/// Couples / MFT specialization.
const TIER2_KEYWORDS: &[(&str, i32)] = &[
    ("mft", 40),
    ("lmft", 40),
    ("marriage and family therapy", 40),
    ("marriage & family therapy", 40),
    ("couples therapy", 20),
    ("couples counseling", 20),
    ("relationship therapy", 18),
];

/// General relationship work.
const TIER3_KEYWORDS: &[(&str, i32)] = &[
    ("marriage counseling", 20),
    ("relationship counseling", 18),
    ("family therapy", 15),
    ("communication", 10),
    ("conflict resolution", 15),
];

const FAITH_KEYWORDS: &[(&str, i32)] = &[
    ("christian", 30),
    ("faith-based", 30),
    ("spiritual", 25),
    ("pastoral", 30),
    ("biblical", 25),
    ("religious", 20),
    ("church", 15),
    ("prayer", 10),
];

/// Practices focused away from couples.
const PENALTIES: &[(&str, i32)] = &[
    ("child therapy", -15),
    ("adolescent", -15),
    ("teen", -15),
    ("addiction", -10),
    ("substance abuse", -10),
];

const MFT_CREDENTIAL_BONUS: i32 = 15;
const VERIFIED_BONUS: i32 = 5;

/// Score a listing. Each keyword counts once; the result is floored at zero.
pub fn score_listing(listing: &Listing) -> u32 {
    let text = listing.full_text.to_lowercase();

    let mut score: i32 = [
        TIER1_KEYWORDS,
        TIER2_KEYWORDS,
        TIER3_KEYWORDS,
        FAITH_KEYWORDS,
        PENALTIES,
    ]
    .into_iter()
    .flatten()
    .filter(|(keyword, _)| text.contains(keyword))
    .map(|(_, points)| points)
    .sum();

    if listing.is_mft {
        score += MFT_CREDENTIAL_BONUS;
    }
    if listing.is_verified {
        score += VERIFIED_BONUS;
    }

    score.max(0) as u32
}

/// Bucket a score into a tier.
pub fn tier_for(score: u32) -> Tier {
    match score {
        80.. => Tier::Confirmed,
        30.. => Tier::Probable,
        15.. => Tier::Potential,
        _ => Tier::BelowThreshold,
    }
}
