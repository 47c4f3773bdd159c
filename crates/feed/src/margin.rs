//! CSS-style root margins (`"100px"`, `"0px 0px 20%"`).

use std::fmt;
use std::str::FromStr;

use crate::error::FeedError;

/// Margin applied when the caller does not pick one.
pub const DEFAULT_ROOT_MARGIN: &str = "100px";

/// One side of a root margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginValue {
    Pixels(f64),
    Percent(f64),
}

impl fmt::Display for MarginValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginValue::Pixels(v) => write!(f, "{v}px"),
            MarginValue::Percent(v) => write!(f, "{v}%"),
        }
    }
}

/// Offsets that grow (or shrink, when negative) the viewport before
/// intersections are computed, in `top right bottom left` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl RootMargin {
    pub fn uniform(value: MarginValue) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Parse 1 to 4 whitespace-separated `px` or `%` values, expanded the
    /// way CSS shorthand margins are.
    pub fn parse(input: &str) -> Result<Self, FeedError> {
        let invalid = || FeedError::InvalidRootMargin(input.to_string());

        let values = input
            .split_whitespace()
            .map(parse_value)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        match values.as_slice() {
            [all] => Ok(Self::uniform(*all)),
            [vertical, horizontal] => Ok(Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            _ => Err(invalid()),
        }
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::uniform(MarginValue::Pixels(100.0))
    }
}

impl FromStr for RootMargin {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

fn parse_value(token: &str) -> Option<MarginValue> {
    if let Some(num) = token.strip_suffix("px") {
        return num.parse::<f64>().ok().filter(|v| v.is_finite()).map(MarginValue::Pixels);
    }
    if let Some(num) = token.strip_suffix('%') {
        return num.parse::<f64>().ok().filter(|v| v.is_finite()).map(MarginValue::Percent);
    }
    // A bare zero is the only unitless value CSS accepts.
    if token == "0" {
        return Some(MarginValue::Pixels(0.0));
    }
    None
}
