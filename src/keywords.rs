use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::Transaction;

/// A boolean property of a transaction derived from its text or taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fact {
    Gambling,
    CashDeposit,
    Transfer,
    International,
    HighRiskJurisdiction,
    Crypto,
    TradingPlatform,
    PaydayLoan,
    Luxury,
    Salary,
    CashExplained,
    TransferPurpose,
}

/// Which part of the transaction a rule is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// `description` and `raw_description`.
    #[default]
    Text,
    /// `category / subcategory / subsubcategory`.
    Taxonomy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    StartsWith,
    Regex,
}

/// User-supplied rule, loaded from settings alongside the built-in table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub fact: Fact,
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub scope: Scope,
}

const GAMBLING_WORDS: &str =
    r"\b(?:sports betting|gambling|betting|casino|lottery|poker|bingo|wager\w*|stakes?\b|bet\w*)";

// Ordinary words caught by the `bet` prefix.
const NOT_GAMBLING: &[&str] = &["between", "better", "betterment", "beta", "betty", "bethany"];

// (fact, scope, pattern). Patterns are compiled case-insensitive.
const BUILTIN_RULES: &[(Fact, Scope, &str)] = &[
    (Fact::Gambling, Scope::Text, GAMBLING_WORDS),
    (
        Fact::Gambling,
        Scope::Taxonomy,
        r"^[^/]*lifestyle[^/]*/ entertainment / .*\b(?:gambling|betting|casino|lottery|poker|bingo)",
    ),
    (Fact::CashDeposit, Scope::Text, r"\b(?:cash|deposits?|deposited|atm)\b"),
    (Fact::CashDeposit, Scope::Taxonomy, r"^income categories / .*\b(?:cash|deposits?|atm)\b"),
    (Fact::Transfer, Scope::Text, r"\b(?:transfer|remittance|international|swift|iban|sepa|wire)"),
    (Fact::Transfer, Scope::Taxonomy, r"^financial commitments / transfer out\b"),
    (Fact::International, Scope::Text, r"\b(?:international|remittance|swift|iban|sepa|wire)"),
    (
        Fact::HighRiskJurisdiction,
        Scope::Text,
        r"\b(?:russia|iran|north korea|syria|myanmar|afghanistan|belarus)",
    ),
    (
        Fact::Crypto,
        Scope::Text,
        r"\b(?:coinbase pro|coinbase|binance|kraken|bitfinex|gemini|crypto\.com|etoro|robinhood|kucoin)\b",
    ),
    (Fact::TradingPlatform, Scope::Text, r"\b(?:etoro|robinhood)\b"),
    (
        Fact::PaydayLoan,
        Scope::Text,
        r"\b(?:payday|wonga|quickquid|provident|brighthouse|sunny|satsuma)\b",
    ),
    (
        Fact::Luxury,
        Scope::Text,
        r"\b(?:louis vuitton|gucci|prada|rolex|cartier|tiffany|bentley|ferrari|lamborghini|porsche|louboutin|herm[eè]s|chanel|dior)\b",
    ),
    (Fact::Salary, Scope::Text, r"\b(?:salary|salaries|wages?|payroll)\b"),
    (Fact::Salary, Scope::Taxonomy, r"^income categories / [^/]*salary"),
    (
        Fact::CashExplained,
        Scope::Text,
        r"\b(?:salary|wages?|pay|tips?|cashback|refund|withdrawal|atm)\b",
    ),
    (
        Fact::TransferPurpose,
        Scope::Text,
        r"\b(?:family|support|business|investment|loan|repayment|gift|donation)",
    ),
];

enum Matcher {
    Regex(Regex),
    Contains(String),
    StartsWith(String),
}

impl Matcher {
    /// Returns the matched fragment of `haystack`, if any, ignoring
    /// regex matches listed in `exclude`. `haystack` is already lower-cased
    /// for the plain-text matchers.
    fn find(&self, haystack: &str, exclude: &[&str]) -> Option<String> {
        match self {
            Self::Regex(re) => re
                .find_iter(haystack)
                .map(|m| m.as_str())
                .find(|m| !exclude.contains(m))
                .map(str::to_string),
            Self::Contains(p) => haystack.contains(p.as_str()).then(|| p.clone()),
            Self::StartsWith(p) => haystack.starts_with(p.as_str()).then(|| p.clone()),
        }
    }
}

struct CompiledRule {
    fact: Fact,
    scope: Scope,
    matcher: Matcher,
    exclude: &'static [&'static str],
}

fn exclusions(fact: Fact, scope: Scope) -> &'static [&'static str] {
    match (fact, scope) {
        (Fact::Gambling, Scope::Text) => NOT_GAMBLING,
        _ => &[],
    }
}

/// Facts derived for one transaction, with the keyword that triggered each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFacts {
    hits: Vec<(Fact, String)>,
}

impl TransactionFacts {
    pub fn has(&self, fact: Fact) -> bool {
        self.hits.iter().any(|(f, _)| *f == fact)
    }

    /// First keyword that established `fact`.
    pub fn keyword(&self, fact: Fact) -> Option<&str> {
        self.hits
            .iter()
            .find(|(f, _)| *f == fact)
            .map(|(_, k)| k.as_str())
    }
}

/// Compiled keyword rule table.
pub struct Classifier {
    rules: Vec<CompiledRule>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::with_rules(&[])
    }

    /// Built-in rules followed by `extra` user rules. Rules whose pattern
    /// fails to compile are skipped with a warning.
    pub fn with_rules(extra: &[KeywordRule]) -> Self {
        let builtin = BUILTIN_RULES.iter().filter_map(|(fact, scope, pattern)| {
            compile_regex(pattern).map(|re| CompiledRule {
                fact: *fact,
                scope: *scope,
                matcher: Matcher::Regex(re),
                exclude: exclusions(*fact, *scope),
            })
        });
        let user = extra.iter().filter_map(|rule| {
            let matcher = match rule.match_type {
                MatchType::Contains => Matcher::Contains(rule.pattern.to_lowercase()),
                MatchType::StartsWith => Matcher::StartsWith(rule.pattern.to_lowercase()),
                MatchType::Regex => Matcher::Regex(compile_regex(&rule.pattern)?),
            };
            Some(CompiledRule {
                fact: rule.fact,
                scope: rule.scope,
                matcher,
                exclude: &[],
            })
        });
        Self {
            rules: builtin.chain(user).collect(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn classify(&self, tx: &Transaction) -> TransactionFacts {
        let text = format!("{} {}", tx.description.trim(), tx.raw_description.trim()).to_lowercase();
        let taxonomy = format!(
            "{} / {} / {}",
            tx.category.trim(),
            tx.subcategory.trim(),
            tx.subsubcategory.as_deref().unwrap_or("").trim()
        )
        .to_lowercase();

        let mut facts = TransactionFacts::default();
        for rule in &self.rules {
            if facts.has(rule.fact) {
                continue;
            }
            let haystack = match rule.scope {
                Scope::Text => &text,
                Scope::Taxonomy => &taxonomy,
            };
            if let Some(keyword) = rule.matcher.find(haystack, rule.exclude) {
                facts.hits.push((rule.fact, keyword));
            }
        }
        facts
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_regex(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){pattern}")) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "skipping keyword rule with invalid pattern");
            None
        }
    }
}
