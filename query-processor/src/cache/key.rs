use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

use apollo_compiler::ast;
use itertools::Itertools;
use serde_json_bytes::Value;
use sha2::Digest;
use sha2::Sha256;

use crate::context::LANGUAGE_CONTEXT_PREFIX;
use crate::json_ext::Object;

/// Hash of an operation's document and variables.
///
/// The document is hashed in its printed form, so whitespace, comments and
/// source locations never change the hash. Variables are hashed with object
/// keys in sorted order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(document: &ast::Document, variables: &Object) -> Self {
        let mut digest = Sha256::new();
        update_bytes(&mut digest, document.to_string().as_bytes());
        hash(&mut digest, variables);

        Self(hex::encode(digest.finalize().as_slice()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length-prefixed, so that adjacent items cannot run into each other.
fn update_bytes(state: &mut Sha256, bytes: &[u8]) {
    state.update((bytes.len() as u64).to_le_bytes());
    state.update(bytes);
}

/// Hashes the fields of an object, sorted by key.
fn hash(state: &mut Sha256, object: &Object) {
    state.update((object.len() as u64).to_le_bytes());
    object.iter().sorted_by(|a, b| a.0.cmp(b.0)).for_each(|(k, v)| {
        update_bytes(state, k.as_str().as_bytes());
        hash_value(state, v);
    });
}

fn hash_value(state: &mut Sha256, value: &Value) {
    match value {
        Value::Object(obj) => {
            state.update(b"o");
            hash(state, obj);
        }
        Value::Array(values) => {
            state.update(b"a");
            state.update((values.len() as u64).to_le_bytes());
            for value in values {
                hash_value(state, value);
            }
        }
        // tagged so that "1" and 1 differ
        Value::String(s) => {
            state.update(b"s");
            update_bytes(state, s.as_str().as_bytes());
        }
        Value::Number(n) => {
            state.update(b"n");
            update_bytes(state, n.to_string().as_bytes());
        }
        Value::Bool(b) => state.update(if *b { b"t" } else { b"f" }),
        Value::Null => state.update(b"z"),
    }
}

/// Turns abstract cache contexts into key fragments for the current request.
///
/// A resolver returns exactly one fragment per token, in token order.
pub trait ContextResolver: Send + Sync {
    fn convert_tokens_to_keys(&self, tokens: &[&str]) -> Vec<String>;
}

impl<F> ContextResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn convert_tokens_to_keys(&self, tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|token| self(token)).collect()
    }
}

/// Resolves tokens from a fixed table, producing `[token]=value` fragments.
///
/// Unknown tokens resolve to an empty value.
#[derive(Clone, Debug, Default)]
pub struct StaticContextResolver {
    values: HashMap<String, String>,
}

impl StaticContextResolver {
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(token, value)| (token.into(), value.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.values.insert(token.into(), value.into());
    }
}

impl ContextResolver for StaticContextResolver {
    fn convert_tokens_to_keys(&self, tokens: &[&str]) -> Vec<String> {
        tokens
            .iter()
            .map(|token| {
                let value = self.values.get(*token).map(String::as_str).unwrap_or_default();
                format!("[{token}]={value}")
            })
            .collect()
    }
}

pub(crate) fn context_key(hash: &ContentHash) -> String {
    format!("ctx:{hash}")
}

/// `res:<hash>` followed by one `:`-separated fragment per non-language token.
pub(crate) fn result_key<'a, I>(
    hash: &ContentHash,
    tokens: I,
    resolver: &dyn ContextResolver,
) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let tokens: Vec<&str> = tokens
        .into_iter()
        .map(String::as_str)
        .filter(|token| !token.starts_with(LANGUAGE_CONTEXT_PREFIX))
        .collect();
    let mut key = format!("res:{hash}");
    if !tokens.is_empty() {
        for fragment in resolver.convert_tokens_to_keys(&tokens) {
            let _ = write!(&mut key, ":{fragment}");
        }
    }
    key
}
