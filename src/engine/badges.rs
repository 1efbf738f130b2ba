// src/engine/badges.rs

use std::{fmt, str::FromStr};

/// XP threshold at which a badge unlocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeTier {
    pub threshold: i64,
    pub badge: String,
}

/// Ordered badge table, ascending by threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeTiers(Vec<BadgeTier>);

impl BadgeTiers {
    pub fn new(mut tiers: Vec<BadgeTier>) -> Self {
        tiers.sort_by_key(|t| t.threshold);
        Self(tiers)
    }

    pub fn tiers(&self) -> &[BadgeTier] {
        &self.0
    }

    /// Badges whose threshold `xp` has reached and that are not in `unlocked`,
    /// in ascending threshold order.
    pub fn newly_unlocked(&self, xp: i64, unlocked: &[String]) -> Vec<String> {
        let mut earned = Vec::new();
        for tier in &self.0 {
            if xp < tier.threshold {
                break;
            }
            if !unlocked.contains(&tier.badge) && !earned.contains(&tier.badge) {
                earned.push(tier.badge.clone());
            }
        }
        earned
    }
}

impl Default for BadgeTiers {
    fn default() -> Self {
        Self::new(vec![BadgeTier {
            threshold: 100,
            badge: "Beginner".to_string(),
        }])
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseBadgeTiersError(String);

impl fmt::Display for ParseBadgeTiersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid badge tier '{}', expected <xp>:<badge>", self.0)
    }
}

impl std::error::Error for ParseBadgeTiersError {}

/// Parses `100:Beginner,250:Scholar`. An empty string yields no tiers.
impl FromStr for BadgeTiers {
    type Err = ParseBadgeTiersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tiers = Vec::new();
        for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let (threshold, badge) = item
                .split_once(':')
                .ok_or_else(|| ParseBadgeTiersError(item.to_string()))?;
            let threshold = threshold
                .trim()
                .parse::<i64>()
                .map_err(|_| ParseBadgeTiersError(item.to_string()))?;
            let badge = badge.trim();
            if badge.is_empty() {
                return Err(ParseBadgeTiersError(item.to_string()));
            }
            tiers.push(BadgeTier {
                threshold,
                badge: badge.to_string(),
            });
        }
        Ok(Self::new(tiers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_unlocks_beginner_at_100() {
        let tiers = BadgeTiers::default();
        assert!(tiers.newly_unlocked(99, &[]).is_empty());
        assert_eq!(tiers.newly_unlocked(100, &[]), vec!["Beginner".to_string()]);
    }

    #[test]
    fn already_unlocked_badges_are_skipped() {
        let tiers = BadgeTiers::default();
        assert!(tiers.newly_unlocked(500, &["Beginner".to_string()]).is_empty());
    }

    #[test]
    fn crossing_several_tiers_unlocks_them_in_order() {
        let tiers: BadgeTiers = "500:Expert, 100:Beginner,250:Scholar".parse().unwrap();
        assert_eq!(tiers.tiers()[0].threshold, 100);
        assert_eq!(
            tiers.newly_unlocked(300, &[]),
            vec!["Beginner".to_string(), "Scholar".to_string()]
        );
    }

    #[test]
    fn malformed_tiers_are_rejected() {
        assert!("100-Beginner".parse::<BadgeTiers>().is_err());
        assert!("lots:Beginner".parse::<BadgeTiers>().is_err());
        assert!("100:".parse::<BadgeTiers>().is_err());
        assert_eq!("".parse::<BadgeTiers>().unwrap().tiers().len(), 0);
    }
}
