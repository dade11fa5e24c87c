//! Bag-of-n-grams TF-IDF vectorizer with a bounded vocabulary.

use std::collections::{HashMap, HashSet};

use ndarray::Array2;

use super::stopwords::is_stop_word;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TfIdfConfig {
    pub max_features: usize,
    /// Terms present in more than this share of documents are dropped.
    pub max_document_frequency: f64,
    pub min_ngram: usize,
    pub max_ngram: usize,
}

impl Default for TfIdfConfig {
    fn default() -> Self {
        Self { max_features: 200, max_document_frequency: 0.8, min_ngram: 1, max_ngram: 3 }
    }
}

/// Document-term matrix with L2-normalized rows.
#[derive(Debug, Clone)]
pub struct TermMatrix {
    pub vocabulary: Vec<String>,
    pub weights: Array2<f64>,
}

impl TermMatrix {
    /// Pairwise cosine similarity. Rows are unit length, so this is a plain Gram matrix;
    /// documents with no surviving terms are similar to nothing.
    pub fn cosine_similarity(&self) -> Array2<f64> {
        self.weights.dot(&self.weights.t())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TfIdfVectorizer {
    config: TfIdfConfig,
}

impl TfIdfVectorizer {
    pub fn new(config: TfIdfConfig) -> Self {
        Self { config }
    }

    pub fn fit_transform(&self, documents: &[&str]) -> TermMatrix {
        let terms_per_document: Vec<Vec<String>> =
            documents.iter().map(|document| self.terms(document)).collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for terms in &terms_per_document {
            let unique: HashSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let document_count = documents.len();
        let max_count = self.config.max_document_frequency * document_count as f64;
        let mut ranked: Vec<(&str, usize)> = document_frequency
            .into_iter()
            .filter(|(_, frequency)| *frequency as f64 <= max_count)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.config.max_features);

        let mut vocabulary: Vec<(String, usize)> =
            ranked.into_iter().map(|(term, frequency)| (term.to_string(), frequency)).collect();
        vocabulary.sort_by(|a, b| a.0.cmp(&b.0));

        let columns: HashMap<&str, usize> =
            vocabulary.iter().enumerate().map(|(column, (term, _))| (term.as_str(), column)).collect();
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|(_, frequency)| smoothed_idf(document_count, *frequency))
            .collect();

        let mut weights = Array2::<f64>::zeros((document_count, vocabulary.len()));
        for (row, terms) in terms_per_document.iter().enumerate() {
            for term in terms {
                if let Some(&column) = columns.get(term.as_str()) {
                    weights[[row, column]] += idf[column];
                }
            }

            let norm = weights.row(row).iter().map(|value| value * value).sum::<f64>().sqrt();
            if norm > 0.0 {
                weights.row_mut(row).mapv_inplace(|value| value / norm);
            }
        }

        TermMatrix { vocabulary: vocabulary.into_iter().map(|(term, _)| term).collect(), weights }
    }

    /// Every n-gram of the document within the configured range, repeats included.
    pub fn terms(&self, document: &str) -> Vec<String> {
        let tokens = tokenize(document);
        let mut terms = Vec::new();
        for size in self.config.min_ngram.max(1)..=self.config.max_ngram {
            if tokens.len() < size {
                break;
            }
            terms.extend(tokens.windows(size).map(|window| window.join(" ")));
        }
        terms
    }
}

/// Lowercase word tokens of at least two characters, stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|token| !is_stop_word(token))
        .collect()
}

fn smoothed_idf(document_count: usize, document_frequency: usize) -> f64 {
    ((1.0 + document_count as f64) / (1.0 + document_frequency as f64)).ln() + 1.0
}
