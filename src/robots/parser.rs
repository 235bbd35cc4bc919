//! Robots.txt parser implementation
//!
//! Turns a robots.txt body into the ordered [`RobotsRules`] for the `*` group,
//! using the robotstxt crate's tokenizer. `Disallow` maps to noindex/nofollow
//! and `Allow` to index/follow.

use crate::robots::rules::{Indexability, RobotsRules};
use robotstxt::{parse_robotstxt, RobotsParseHandler};

/// Collects the rules of every group addressed to `*`
#[derive(Default)]
struct WildcardGroupCollector {
    rules: RobotsRules,
    sitemaps: Vec<String>,
    /// Current group applies to `*`
    in_wildcard_group: bool,
    /// A rule line was seen since the last user-agent line
    group_closed: bool,
}

impl WildcardGroupCollector {
    fn add_rule(&mut self, value: &str, flags: Indexability) {
        self.group_closed = true;
        let value = value.trim();
        // An empty value restricts nothing
        if self.in_wildcard_group && !value.is_empty() {
            self.rules.push(value, flags);
        }
    }
}

impl RobotsParseHandler for WildcardGroupCollector {
    fn handle_robots_start(&mut self) {}

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, _line_num: u32, user_agent: &str) {
        if self.group_closed {
            self.in_wildcard_group = false;
            self.group_closed = false;
        }
        if user_agent.trim() == "*" {
            self.in_wildcard_group = true;
        }
    }

    fn handle_allow(&mut self, _line_num: u32, value: &str) {
        self.add_rule(value, Indexability::ALLOW);
    }

    fn handle_disallow(&mut self, _line_num: u32, value: &str) {
        self.add_rule(value, Indexability::DENY);
    }

    fn handle_sitemap(&mut self, _line_num: u32, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.sitemaps.push(value.to_string());
        }
    }

    fn handle_unknown_action(&mut self, _line_num: u32, _action: &str, _value: &str) {}
}

/// Robots.txt content relevant to this crate
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Ordered rules for the `*` user agent
    pub rules: RobotsRules,

    /// `Sitemap:` locations, in file order
    pub sitemaps: Vec<String>,
}

impl ParsedRobots {
    /// Parses raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        let mut collector = WildcardGroupCollector::default();
        parse_robotstxt(content, &mut collector);
        Self {
            rules: collector.rules,
            sitemaps: collector.sitemaps,
        }
    }
}
