//! Total order over alert colors.
//!
//! Red (too long without a break) outranks green (recommended workday is
//! over), which outranks yellow (change the desk position).

use super::Color;

pub fn rank(color: Color) -> u8 {
    match color {
        Color::Red => 3,
        Color::Green => 2,
        Color::Yellow => 1,
    }
}

/// Whether `candidate` may take over from `current`. Equal colors count as
/// priority (the request is a no-op as far as the indicator is concerned).
pub fn has_priority(current: Color, candidate: Color) -> bool {
    candidate == current || rank(candidate) > rank(current)
}

pub fn can_supersede(active: Option<Color>, candidate: Color) -> bool {
    match active {
        None => true,
        Some(active) => has_priority(active, candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflexive() {
        for color in Color::ALL {
            assert!(has_priority(color, color));
        }
    }

    #[test]
    fn strict_total_order_between_distinct_colors() {
        for a in Color::ALL {
            for b in Color::ALL {
                if a == b {
                    continue;
                }
                // Exactly one direction wins.
                assert_ne!(has_priority(a, b), has_priority(b, a), "{a} vs {b}");
                assert_eq!(has_priority(a, b), rank(b) > rank(a));
            }
        }
    }

    #[test]
    fn configured_ranking() {
        assert!(has_priority(Color::Green, Color::Red));
        assert!(has_priority(Color::Yellow, Color::Green));
        assert!(has_priority(Color::Yellow, Color::Red));
        assert!(!has_priority(Color::Red, Color::Yellow));
        assert!(!has_priority(Color::Red, Color::Green));
        assert!(!has_priority(Color::Green, Color::Yellow));
    }

    #[test]
    fn anything_supersedes_idle_indicator() {
        for color in Color::ALL {
            assert!(can_supersede(None, color));
        }
        assert!(can_supersede(Some(Color::Yellow), Color::Red));
        assert!(!can_supersede(Some(Color::Red), Color::Yellow));
    }
}
