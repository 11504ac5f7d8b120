use crate::error::RankError;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Admission and reduction parameters for the signature stage.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// Documents with fewer raw tokens than this are rejected with
    /// `TooShort` and excluded from the corpus.
    pub min_word_count: usize,
    /// Tokens shorter than this (in chars) carry no similarity signal.
    pub min_token_len: usize,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            min_word_count: 10_000,
            min_token_len: 3,
        }
    }
}

/// Compact comparable representation of one document: the set of its
/// normalized, stemmed significant terms.
#[derive(Debug, Clone)]
pub struct Signature {
    pub id: String,
    pub terms: HashSet<String>,
    pub word_count: usize,
}

/// Reduce raw text to a [`Signature`] using NFKC normalization, lowercasing,
/// stopword removal, and stemming.
///
/// The word count is taken before any filtering, so stopword-heavy prose is
/// not penalized by the admission rule.
pub fn build_signature(
    id: &str,
    text: &str,
    config: &SignatureConfig,
) -> Result<Signature, RankError> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut terms = HashSet::new();
    let mut word_count = 0usize;
    for mat in RE.find_iter(&normalized) {
        word_count += 1;
        let token = mat.as_str();
        if token.chars().count() < config.min_token_len || is_stopword(token) {
            continue;
        }
        terms.insert(STEMMER.stem(token).to_string());
    }
    if word_count < config.min_word_count {
        return Err(RankError::TooShort {
            id: id.to_string(),
            word_count,
            minimum: config.min_word_count,
        });
    }
    Ok(Signature {
        id: id.to_string(),
        terms,
        word_count,
    })
}
