//! Keyword families scanned by the assistance generator and the bundled urgency detector.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Objection categories surfaced to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectionType {
    Price,
    Timeline,
    Location,
    Financing,
    Features,
    MarketConditions,
    Trust,
    Competition,
    FamilyDecision,
    FairHousing,
}

impl ObjectionType {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectionType::Price => "price",
            ObjectionType::Timeline => "timeline",
            ObjectionType::Location => "location",
            ObjectionType::Financing => "financing",
            ObjectionType::Features => "features",
            ObjectionType::MarketConditions => "market_conditions",
            ObjectionType::Trust => "trust",
            ObjectionType::Competition => "competition",
            ObjectionType::FamilyDecision => "family_decision",
            ObjectionType::FairHousing => "fair_housing",
        }
    }

    /// Default severity on a 0-10 scale.
    pub fn default_severity(&self) -> f64 {
        match self {
            ObjectionType::FairHousing => 9.0,
            ObjectionType::Price | ObjectionType::Financing => 7.0,
            ObjectionType::Trust | ObjectionType::Competition => 6.0,
            ObjectionType::Timeline | ObjectionType::MarketConditions => 5.0,
            ObjectionType::Location | ObjectionType::FamilyDecision => 4.5,
            ObjectionType::Features => 4.0,
        }
    }

    /// Steering language is flagged on any speaker, everything else on the prospect only.
    pub fn scans_all_speakers(&self) -> bool {
        matches!(self, ObjectionType::FairHousing)
    }

    pub fn is_compliance_risk(&self) -> bool {
        matches!(self, ObjectionType::FairHousing)
    }

    pub fn suggested_responses(&self) -> Vec<String> {
        let responses: &[&str] = match self {
            ObjectionType::Price => &[
                "Walk through recent comparable sales to anchor value.",
                "Offer to adjust the search to a price band they are comfortable with.",
            ],
            ObjectionType::Timeline => &[
                "Ask what would need to happen for the timing to feel right.",
                "Offer a low-commitment market update until they are ready.",
            ],
            ObjectionType::Location => &[
                "Clarify commute and amenity priorities instead of specific areas.",
                "Suggest nearby areas with similar inventory.",
            ],
            ObjectionType::Financing => &[
                "Offer an introduction to a lender for a pre-approval review.",
                "Explain available down payment assistance programs.",
            ],
            ObjectionType::Features => &[
                "Separate must-have features from nice-to-haves.",
                "Share listings that match the must-have list.",
            ],
            ObjectionType::MarketConditions => &[
                "Share current inventory and rate trends for their price band.",
                "Discuss how waiting affects their buying power.",
            ],
            ObjectionType::Trust => &[
                "Share client testimonials and recent transactions.",
                "Offer a no-obligation consultation.",
            ],
            ObjectionType::Competition => &[
                "Ask what they value most in the agent they are considering.",
                "Highlight local expertise and response times.",
            ],
            ObjectionType::FamilyDecision => &[
                "Offer to schedule a follow-up that includes every decision maker.",
                "Send a summary they can share with their partner.",
            ],
            ObjectionType::FairHousing => &[
                "Redirect to objective criteria such as commute, price, and property features.",
                "Point the prospect to public crime and school data sources instead of characterizing areas.",
            ],
        };
        responses.iter().map(|response| response.to_string()).collect()
    }
}

impl fmt::Display for ObjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named urgency keyword family with its contribution to the urgency score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyFamily {
    pub name: String,
    pub weight: f64,
    pub keywords: Vec<String>,
}

impl UrgencyFamily {
    fn new(name: &str, weight: f64, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight,
            keywords: to_owned(keywords),
        }
    }

    /// Negative families soften urgency and do not count as timeline language.
    pub fn indicates_timeline(&self) -> bool {
        self.weight > 0.0
    }
}

pub fn default_objection_patterns() -> BTreeMap<ObjectionType, Vec<String>> {
    let mut patterns = BTreeMap::new();
    patterns.insert(
        ObjectionType::Price,
        to_owned(&[
            "too expensive",
            "out of our price range",
            "over budget",
            "can't afford",
            "cannot afford",
            "prices are too high",
            "overpriced",
        ]),
    );
    patterns.insert(
        ObjectionType::Timeline,
        to_owned(&[
            "not ready",
            "need more time",
            "not in a hurry",
            "wait until next year",
            "maybe later",
        ]),
    );
    patterns.insert(
        ObjectionType::Location,
        to_owned(&[
            "too far",
            "commute is too long",
            "don't like the area",
            "wrong part of town",
        ]),
    );
    patterns.insert(
        ObjectionType::Financing,
        to_owned(&[
            "interest rates",
            "can't get approved",
            "credit score",
            "down payment",
            "mortgage is too high",
        ]),
    );
    patterns.insert(
        ObjectionType::Features,
        to_owned(&[
            "too small",
            "not enough bedrooms",
            "needs too much work",
            "no garage",
            "no yard",
        ]),
    );
    patterns.insert(
        ObjectionType::MarketConditions,
        to_owned(&[
            "market is crazy",
            "wait for prices to drop",
            "housing bubble",
            "market crash",
        ]),
    );
    patterns.insert(
        ObjectionType::Trust,
        to_owned(&[
            "not sure i trust",
            "sounds like a sales pitch",
            "bad experience with an agent",
            "scam",
        ]),
    );
    patterns.insert(
        ObjectionType::Competition,
        to_owned(&[
            "another agent",
            "already working with",
            "other realtor",
            "zillow offers",
            "redfin",
        ]),
    );
    patterns.insert(
        ObjectionType::FamilyDecision,
        to_owned(&[
            "talk to my wife",
            "talk to my husband",
            "talk to my spouse",
            "discuss with my partner",
            "check with my family",
        ]),
    );
    patterns.insert(
        ObjectionType::FairHousing,
        to_owned(&[
            "safe neighborhood",
            "safe area",
            "bad area",
            "good neighborhood for families like",
            "church community",
            "those people",
            "national origin",
            "ethnic",
            "demographics",
        ]),
    );
    patterns
}

pub fn default_urgency_families() -> Vec<UrgencyFamily> {
    vec![
        UrgencyFamily::new(
            "immediate",
            3.0,
            &[
                "asap",
                "immediately",
                "right away",
                "this week",
                "ready to move",
                "urgent",
                "as soon as possible",
            ],
        ),
        UrgencyFamily::new(
            "short_term",
            2.0,
            &[
                "next month",
                "this month",
                "within 30 days",
                "within 60 days",
                "lease ends",
                "lease is up",
            ],
        ),
        UrgencyFamily::new(
            "motivated",
            1.5,
            &[
                "relocating",
                "new job",
                "growing family",
                "need more space",
                "already sold",
            ],
        ),
        UrgencyFamily::new(
            "exploratory",
            -1.0,
            &[
                "just looking",
                "just browsing",
                "no rush",
                "next year",
                "someday",
            ],
        ),
    ]
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
