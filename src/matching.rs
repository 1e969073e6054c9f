//! Case-insensitive matching of filter candidates against select options

use std::fmt;
use std::str::FromStr;

/// How a candidate such as `"taurus"` is compared with an option text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    #[default]
    Contains,
    StartsWith,
    Equals,
}

impl MatchStrategy {
    pub fn matches(self, option: &str, candidate: &str) -> bool {
        let option = option.to_lowercase();
        let candidate = candidate.to_lowercase();

        match self {
            Self::Contains => option.contains(&candidate),
            Self::StartsWith => option.starts_with(&candidate),
            Self::Equals => option == candidate,
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contains" | "substring" => Ok(Self::Contains),
            "startswith" | "starts_with" | "prefix" => Ok(Self::StartsWith),
            "equals" | "exact" => Ok(Self::Equals),
            other => Err(format!(
                "unknown match strategy `{other}` (expected contains, prefix or exact)"
            )),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Contains => "contains",
            Self::StartsWith => "prefix",
            Self::Equals => "exact",
        };
        f.write_str(name)
    }
}

/// Returns the options matching `candidate`, in option order.
pub fn filter_options<'a>(
    options: &'a [String],
    candidate: &str,
    strategy: MatchStrategy,
) -> Vec<&'a String> {
    options
        .iter()
        .filter(|option| strategy.matches(option, candidate))
        .collect()
}
