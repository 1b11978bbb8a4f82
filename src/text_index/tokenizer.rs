//! N-gram tokenizer
//!
//! text → pre-hook → case fold → split on ' ' → sliding window of
//! `gram_len` chars per word → post-hook.
//!
//! Words shorter than `gram_len` produce no tokens. They are not padded.

use std::fmt;
use std::sync::Arc;

use super::errors::{TextIndexError, TextIndexResult};
use super::options::TextIndexOptions;

/// Rewrites text before tokenization
pub type PreHook = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Receives the original text and the generated tokens, returns the tokens to
/// index (may replace them entirely)
pub type PostHook = Arc<dyn Fn(&str, Vec<String>) -> Vec<String> + Send + Sync>;

/// Optional tokenization hooks, shared by an index and all of its shards
#[derive(Clone, Default)]
pub struct TokenizerHooks {
    pub pre: Option<PreHook>,
    pub post: Option<PostHook>,
}

impl TokenizerHooks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_pre(mut self, hook: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.pre = Some(Arc::new(hook));
        self
    }

    pub fn with_post(
        mut self,
        hook: impl Fn(&str, Vec<String>) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.post = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for TokenizerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenizerHooks")
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .finish()
    }
}

/// Stateless n-gram tokenizer
#[derive(Debug, Clone)]
pub struct Tokenizer {
    gram_len: usize,
    to_lower_case: bool,
    hooks: TokenizerHooks,
}

impl Tokenizer {
    /// Fails when `gram_len` is zero.
    pub fn new(gram_len: usize, to_lower_case: bool, hooks: TokenizerHooks) -> TextIndexResult<Self> {
        if gram_len == 0 {
            return Err(TextIndexError::InvalidOptions(
                "gram_len must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            gram_len,
            to_lower_case,
            hooks,
        })
    }

    /// Options must already be validated.
    pub(crate) fn from_options(options: &TextIndexOptions, hooks: TokenizerHooks) -> Self {
        Self {
            gram_len: options.gram_len,
            to_lower_case: options.to_lower_case,
            hooks,
        }
    }

    pub fn gram_len(&self) -> usize {
        self.gram_len
    }

    pub fn hooks(&self) -> &TokenizerHooks {
        &self.hooks
    }

    /// Tokenizes a single text.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let prepared = match &self.hooks.pre {
            Some(pre) => pre(text),
            None => text.to_string(),
        };
        let folded = if self.to_lower_case {
            prepared.to_lowercase()
        } else {
            prepared
        };

        let mut tokens = Vec::new();
        for word in folded.split(' ') {
            let chars: Vec<char> = word.chars().collect();
            if chars.len() < self.gram_len {
                continue;
            }
            for window in chars.windows(self.gram_len) {
                tokens.push(window.iter().collect());
            }
        }

        match &self.hooks.post {
            Some(post) => post(text, tokens),
            None => tokens,
        }
    }

    /// Tokenizes each text and concatenates the results in order.
    pub fn tokenize_all<I, S>(&self, texts: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        texts
            .into_iter()
            .flat_map(|text| self.tokenize(text.as_ref()))
            .collect()
    }
}
