//! Project archetype detection.
//!
//! The archetype decides which tool dependencies are installed and which
//! template directory is copied into the project. Detection looks only at
//! the runtime `dependencies` of `package.json`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::manifest::DependencyMap;

/// The detected project category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Archetype {
    /// Next.js with Postgres.js
    NextJsPostgresql,
    /// Expo with Postgres.js
    ExpoPostgresql,
    /// Next.js
    NextJs,
    /// Expo (React Native)
    Expo,
    /// Create React App via `@upleveled/react-scripts`
    CreateReactApp,
    /// Anything else
    NodeJs,
}

/// A classification rule: every listed package must be a dependency.
struct Rule {
    requires: &'static [&'static str],
    archetype: Archetype,
}

/// Rules in priority order. The most specific combinations come first and
/// the first matching rule wins.
const RULES: &[Rule] = &[
    Rule {
        requires: &["postgres", "next"],
        archetype: Archetype::NextJsPostgresql,
    },
    Rule {
        requires: &["postgres", "expo"],
        archetype: Archetype::ExpoPostgresql,
    },
    Rule {
        requires: &["next"],
        archetype: Archetype::NextJs,
    },
    Rule {
        requires: &["expo"],
        archetype: Archetype::Expo,
    },
    Rule {
        requires: &["@upleveled/react-scripts"],
        archetype: Archetype::CreateReactApp,
    },
];

/// Classify a project from its runtime dependencies.
///
/// Total: a map without any known marker yields [`Archetype::NodeJs`].
pub fn classify(dependencies: &DependencyMap) -> Archetype {
    RULES
        .iter()
        .find(|rule| rule.requires.iter().all(|name| dependencies.contains_key(*name)))
        .map(|rule| rule.archetype)
        .unwrap_or(Archetype::NodeJs)
}

impl Archetype {
    /// All archetypes, in classification priority order.
    pub const ALL: [Archetype; 6] = [
        Archetype::NextJsPostgresql,
        Archetype::ExpoPostgresql,
        Archetype::NextJs,
        Archetype::Expo,
        Archetype::CreateReactApp,
        Archetype::NodeJs,
    ];

    /// Machine tag, also the template directory name.
    pub fn tag(&self) -> &'static str {
        match self {
            Archetype::NextJsPostgresql => "next-js-postgresql",
            Archetype::ExpoPostgresql => "expo-postgresql",
            Archetype::NextJs => "next-js",
            Archetype::Expo => "expo",
            Archetype::CreateReactApp => "create-react-app",
            Archetype::NodeJs => "node-js",
        }
    }

    /// Human-readable name.
    pub fn title(&self) -> &'static str {
        match self {
            Archetype::NextJsPostgresql => "Next.js with PostgreSQL",
            Archetype::ExpoPostgresql => "Expo with PostgreSQL",
            Archetype::NextJs => "Next.js",
            Archetype::Expo => "Expo (React Native)",
            Archetype::CreateReactApp => "Create React App",
            Archetype::NodeJs => "Node.js",
        }
    }

    /// Whether the project talks to PostgreSQL through Postgres.js.
    pub fn has_database(&self) -> bool {
        matches!(self, Archetype::NextJsPostgresql | Archetype::ExpoPostgresql)
    }

    /// Whether the project renders with React DOM (and therefore has CSS).
    pub fn uses_react_dom(&self) -> bool {
        matches!(
            self,
            Archetype::CreateReactApp | Archetype::NextJs | Archetype::NextJsPostgresql
        )
    }

    /// Whether the project is built on Next.js.
    pub fn is_next(&self) -> bool {
        matches!(self, Archetype::NextJs | Archetype::NextJsPostgresql)
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Archetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .into_iter()
            .find(|archetype| archetype.tag() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Archetype::ALL.iter().map(|a| a.tag()).collect();
                format!(
                    "unknown project type '{}'; expected one of: {}",
                    s,
                    known.join(", ")
                )
            })
    }
}
