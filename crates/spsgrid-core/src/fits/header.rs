use crate::domain::{ConvertError, ConvertResult};
use serde_json::Value;

pub const CARD_SIZE: usize = 80;

const KEYWORD_WIDTH: usize = 8;
const FIXED_VALUE_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CardValue {
    /// Converts a scalar configuration value. Arrays, objects and nulls have
    /// no single-card encoding.
    pub fn from_json(key: &str, value: &Value) -> ConvertResult<Self> {
        match value {
            Value::Bool(flag) => Ok(Self::Logical(*flag)),
            Value::String(text) => Ok(Self::Text(text.clone())),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Float))
                .ok_or_else(|| invalid(key, "number is out of range")),
            Value::Null => Err(invalid(key, "null has no header encoding")),
            Value::Array(_) | Value::Object(_) => {
                Err(invalid(key, "only scalar values can be stamped"))
            }
        }
    }

    fn render(&self, key: &str, fixed: bool) -> ConvertResult<String> {
        let rendered = match self {
            Self::Logical(flag) => (if *flag { "T" } else { "F" }).to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => format_float(key, *value)?,
            Self::Text(text) => return quote(key, text),
        };

        if fixed {
            Ok(format!("{rendered:>FIXED_VALUE_WIDTH$}"))
        } else {
            Ok(rendered)
        }
    }
}

impl From<bool> for CardValue {
    fn from(value: bool) -> Self {
        Self::Logical(value)
    }
}

impl From<i64> for CardValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for CardValue {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for CardValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CardValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CardValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One keyword = value record. Short keys of letters, digits, `-` and `_` are
/// upper-cased into the 8-character keyword field; any other key is written
/// with the `HIERARCH` convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    key: String,
    value: CardValue,
    comment: Option<String>,
}

impl Card {
    pub fn new(key: impl Into<String>, value: impl Into<CardValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &CardValue {
        &self.value
    }

    pub fn is_hierarch(&self) -> bool {
        !is_standard_keyword(&self.key)
    }

    pub fn render(&self) -> ConvertResult<String> {
        if self.key.is_empty() || !is_printable(&self.key) || self.key.contains('=') {
            return Err(invalid(&self.key, "keyword must be printable ASCII without '='"));
        }

        let mut card = if self.is_hierarch() {
            format!(
                "HIERARCH {} = {}",
                self.key,
                self.value.render(&self.key, false)?
            )
        } else {
            format!(
                "{:<KEYWORD_WIDTH$}= {}",
                self.key.to_ascii_uppercase(),
                self.value.render(&self.key, true)?
            )
        };

        if let Some(comment) = &self.comment {
            if !is_printable(comment) {
                return Err(invalid(&self.key, "comment must be printable ASCII"));
            }
            card.push_str(" / ");
            card.push_str(comment);
        }

        if card.len() > CARD_SIZE {
            return Err(invalid(
                &self.key,
                &format!("card needs {} characters, at most {CARD_SIZE} fit", card.len()),
            ));
        }
        Ok(format!("{card:<CARD_SIZE$}"))
    }
}

/// Ordered card list of one HDU.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, key: &str) -> Option<&CardValue> {
        self.cards
            .iter()
            .find(|card| card.key == key)
            .map(Card::value)
    }

    /// Renders every card followed by `END`, padded with spaces to `block`.
    pub fn encode(&self, block: usize) -> ConvertResult<Vec<u8>> {
        let mut bytes = Vec::with_capacity((self.cards.len() + 1) * CARD_SIZE);
        for card in &self.cards {
            bytes.extend_from_slice(card.render()?.as_bytes());
        }
        bytes.extend_from_slice(format!("{:<CARD_SIZE$}", "END").as_bytes());

        let padded = bytes.len().div_ceil(block) * block;
        bytes.resize(padded, b' ');
        Ok(bytes)
    }
}

fn is_standard_keyword(key: &str) -> bool {
    key.len() <= KEYWORD_WIDTH
        && key
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

fn is_printable(text: &str) -> bool {
    text.bytes().all(|byte| (b' '..=b'~').contains(&byte))
}

fn quote(key: &str, text: &str) -> ConvertResult<String> {
    if !is_printable(text) {
        return Err(invalid(key, "string values must be printable ASCII"));
    }
    let escaped = text.replace('\'', "''");
    Ok(format!("'{escaped:<KEYWORD_WIDTH$}'"))
}

fn format_float(key: &str, value: f64) -> ConvertResult<String> {
    if !value.is_finite() {
        return Err(invalid(key, "non-finite numbers have no header encoding"));
    }

    let shortest = format!("{value:?}").to_ascii_uppercase();
    if shortest.len() <= FIXED_VALUE_WIDTH {
        Ok(shortest)
    } else {
        Ok(format!("{value:.13E}"))
    }
}

fn invalid(key: &str, reason: &str) -> ConvertError {
    ConvertError::InvalidHeaderCard {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
