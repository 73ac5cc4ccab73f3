//! Feature parameters and their value codecs

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A parsed parameter value
///
/// The variant is decided by the parameter's codec; values of different
/// parameters never share structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Signed(i64),
    Unsigned(u64),
    Text(String),
    Flag(bool),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Signed(v) => Some(*v),
            Self::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(*v),
            Self::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

/// Converts between the textual form written into the namespace and
/// [`ParamValue`]
pub trait ParamCodec: Send + Sync + fmt::Debug {
    /// Parse one trimmed, non-empty token
    fn parse(&self, token: &str) -> Result<ParamValue, String>;

    /// Render a value previously produced by [`ParamCodec::parse`]
    fn stringify(&self, value: &ParamValue) -> String;
}

/// Parse a boolean token
///
/// Accepts `0/1/y/n/yes/no/true/false/on/off`, case-insensitive, with
/// surrounding whitespace (including the trailing newline of `echo`).
pub fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "1" | "y" | "yes" | "true" | "on" => Some(true),
        "0" | "n" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Signed decimal integers
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedCodec;

impl ParamCodec for SignedCodec {
    fn parse(&self, token: &str) -> Result<ParamValue, String> {
        token
            .parse::<i64>()
            .map(ParamValue::Signed)
            .map_err(|e| e.to_string())
    }

    fn stringify(&self, value: &ParamValue) -> String {
        stringify_fallback(value)
    }
}

/// Unsigned integers, decimal or `0x`-prefixed hexadecimal
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsignedCodec;

impl ParamCodec for UnsignedCodec {
    fn parse(&self, token: &str) -> Result<ParamValue, String> {
        let parsed = match token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => token.parse::<u64>(),
        };
        parsed.map(ParamValue::Unsigned).map_err(|e| e.to_string())
    }

    fn stringify(&self, value: &ParamValue) -> String {
        stringify_fallback(value)
    }
}

/// Free-form text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl ParamCodec for TextCodec {
    fn parse(&self, token: &str) -> Result<ParamValue, String> {
        Ok(ParamValue::Text(token.to_string()))
    }

    fn stringify(&self, value: &ParamValue) -> String {
        stringify_fallback(value)
    }
}

/// Booleans, same token set as `activate`
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagCodec;

impl ParamCodec for FlagCodec {
    fn parse(&self, token: &str) -> Result<ParamValue, String> {
        parse_bool(token)
            .map(ParamValue::Flag)
            .ok_or_else(|| "expected a boolean".to_string())
    }

    fn stringify(&self, value: &ParamValue) -> String {
        match value {
            ParamValue::Flag(b) => u8::from(*b).to_string(),
            other => stringify_fallback(other),
        }
    }
}

fn stringify_fallback(value: &ParamValue) -> String {
    match value {
        ParamValue::Signed(v) => v.to_string(),
        ParamValue::Unsigned(v) => v.to_string(),
        ParamValue::Text(s) => s.clone(),
        ParamValue::Flag(b) => b.to_string(),
    }
}

/// A named setting declared by a feature
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    codec: Arc<dyn ParamCodec>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, codec: impl ParamCodec + 'static) -> Self {
        Self {
            name: name.into(),
            codec: Arc::new(codec),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &dyn ParamCodec {
        self.codec.as_ref()
    }
}
