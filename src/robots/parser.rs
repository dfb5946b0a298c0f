//! robots.txt evaluation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate. Crawl-delay is
//! not covered by it and is read here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// A fetched robots.txt file
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw content; empty means everything is allowed
    content: String,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// A policy that allows everything, used when robots.txt is missing or unreachable
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks if an absolute URL may be fetched by the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Crawl-delay for the user agent; a group naming the agent wins over `*`
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let agent = user_agent.to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut specific: Option<f64> = None;
        let mut wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        specific.or(wildcard).map(Duration::from_secs_f64)
    }
}
