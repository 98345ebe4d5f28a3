//! Warning text catalog
//!
//! Keyed by (joint group, crossing direction) enums rather than by string
//! concatenation. Exercise-specific overrides take precedence over the
//! built-in table; combinations neither covers get the fallback entry.

use std::borrow::Cow;
use std::collections::HashMap;

use motus_core::JointGroup;
use serde::Serialize;

use crate::CrossingDirection;

/// A user-facing message and the correction cue that goes with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningText {
    pub message: Cow<'static, str>,
    pub correction: Cow<'static, str>,
}

impl WarningText {
    pub const fn new(message: &'static str, correction: &'static str) -> Self {
        Self {
            message: Cow::Borrowed(message),
            correction: Cow::Borrowed(correction),
        }
    }

    pub fn owned(message: impl Into<String>, correction: impl Into<String>) -> Self {
        Self {
            message: Cow::Owned(message.into()),
            correction: Cow::Owned(correction.into()),
        }
    }
}

const FALLBACK: WarningText = WarningText::new(
    "Form is drifting out of range",
    "Slow down and reset your position",
);

/// Built-in text for the combinations that have a specific cue
pub fn builtin_text(group: JointGroup, direction: CrossingDirection) -> Option<WarningText> {
    use CrossingDirection::*;
    use JointGroup::*;

    let text = match (group, direction) {
        (Knee, BelowMin) => WarningText::new(
            "Knees are about to bend too far",
            "Stop the descent and keep tension",
        ),
        (Knee, AboveMax) => WarningText::new(
            "Knees are about to lock out",
            "Keep a soft bend at the top",
        ),
        (Hip, BelowMin) => WarningText::new(
            "Hips are dropping too low",
            "Brace your core and stop at parallel",
        ),
        (Hip, AboveMax) => WarningText::new(
            "Hips are over-extending",
            "Finish tall without leaning back",
        ),
        (Elbow, BelowMin) => WarningText::new(
            "Elbows are flexing too far",
            "Control the bottom of the rep",
        ),
        (Elbow, AboveMax) => WarningText::new(
            "Elbows are about to lock out",
            "Keep a slight bend at full extension",
        ),
        (Torso, AboveMax) => WarningText::new(
            "Torso is leaning too far forward",
            "Lift your chest and keep your back neutral",
        ),
        (Shoulder, _) | (Torso, BelowMin) => return None,
    };
    Some(text)
}

/// Message lookup with overrides and a fallback
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    overrides: HashMap<(JointGroup, CrossingDirection), WarningText>,
    fallback: WarningText,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            fallback: FALLBACK,
        }
    }
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the text for one combination
    pub fn with_override(
        mut self,
        group: JointGroup,
        direction: CrossingDirection,
        text: WarningText,
    ) -> Self {
        self.overrides.insert((group, direction), text);
        self
    }

    /// Replace the fallback entry
    pub fn with_fallback(mut self, text: WarningText) -> Self {
        self.fallback = text;
        self
    }

    pub fn lookup(&self, group: JointGroup, direction: CrossingDirection) -> WarningText {
        self.overrides
            .get(&(group, direction))
            .cloned()
            .or_else(|| builtin_text(group, direction))
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let catalog = MessageCatalog::new();
        let text = catalog.lookup(JointGroup::Torso, CrossingDirection::AboveMax);
        assert_eq!(text.message, "Torso is leaning too far forward");
    }

    #[test]
    fn test_fallback() {
        let catalog = MessageCatalog::new();
        let text = catalog.lookup(JointGroup::Shoulder, CrossingDirection::BelowMin);
        assert_eq!(text, FALLBACK);
    }

    #[test]
    fn test_override_wins() {
        let catalog = MessageCatalog::new().with_override(
            JointGroup::Knee,
            CrossingDirection::BelowMin,
            WarningText::owned("Too deep for a box squat", "Sit back onto the box"),
        );
        let text = catalog.lookup(JointGroup::Knee, CrossingDirection::BelowMin);
        assert_eq!(text.correction, "Sit back onto the box");

        let untouched = catalog.lookup(JointGroup::Knee, CrossingDirection::AboveMax);
        assert_eq!(untouched.message, "Knees are about to lock out");
    }
}
