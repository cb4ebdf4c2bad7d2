use serde::{Deserialize, Serialize};

use crate::flow::FlowAddress;

/// A fungible token contract: its name and the account it is deployed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub address: FlowAddress,
}

impl Token {
    pub fn new(name: impl Into<String>, address: FlowAddress) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }

    /// `[CamelCase, SCREAMING_SNAKE, lowerCamel]` forms of the name.
    pub fn parse_name(&self) -> [String; 3] {
        parse_name(&self.name)
    }

    pub fn canon_name(&self) -> String {
        canon_name(&self.name)
    }
}

pub fn canon_name(name: &str) -> String {
    let [camel, _, _] = parse_name(name);
    camel
}

pub fn parse_name(name: &str) -> [String; 3] {
    // Acronym contract that does not survive case conversion.
    if name.eq_ignore_ascii_case("fusd") {
        return ["FUSD".to_string(), "FUSD".to_string(), "fusd".to_string()];
    }

    let words = split_words(name);
    let camel: String = words.iter().map(|w| capitalize(w)).collect();
    let snake = words
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_");
    let lower: String = words
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
        .collect();

    [camel, snake, lower]
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Splits on separators and case boundaries:
/// `FlowToken`, `flow_token`, `FLOW_TOKEN`, `flowToken` all give `[flow, token]`.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();

    for segment in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        let chars: Vec<char> = segment.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            let boundary = i > 0 && c.is_ascii_uppercase() && {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
                prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_is_lower)
            };
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(c);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}
