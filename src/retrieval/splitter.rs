use std::collections::VecDeque;

use crate::config::ConfigError;
use super::store::Document;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Recursive character splitter.
///
/// Splits on the first separator that occurs in the text (paragraphs, then
/// lines, then words, then characters), recursing into pieces that are still
/// too long, and merges adjacent pieces back up to `chunk_size` characters
/// with up to `chunk_overlap` characters repeated between neighbouring chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: vec!["\n\n".into(), "\n".into(), " ".into(), "".into()],
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidConfig("chunk_size must be greater than 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split `text` into documents with ids `<source>-<n>`.
    pub fn split_documents(&self, source: &str, text: &str) -> Vec<Document> {
        self.split_text(text)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Document::new(format!("{}-{}", source, i), chunk).with_source(source))
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().cloned().unwrap_or_default();
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = String::new();
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.clone();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut short = Vec::new();
        for split in splits {
            if char_len(&split) < self.chunk_size {
                short.push(split);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge(&short, &separator));
                short.clear();
            }
            if remaining.is_empty() {
                chunks.push(split);
            } else {
                chunks.extend(self.split_recursive(&split, remaining));
            }
        }
        if !short.is_empty() {
            chunks.extend(self.merge(&short, &separator));
        }
        chunks
    }

    fn merge(&self, splits: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            let joiner = if current.is_empty() { 0 } else { sep_len };
            if total + len + joiner > self.chunk_size && !current.is_empty() {
                push_joined(&mut chunks, &current, separator);
                // drop from the front until what is left fits as overlap
                while let Some(front) = current.front() {
                    let too_long = total > self.chunk_overlap
                        || (total + len + sep_len > self.chunk_size && total > 0);
                    if !too_long {
                        break;
                    }
                    let dec = char_len(front) + if current.len() > 1 { sep_len } else { 0 };
                    current.pop_front();
                    total = total.saturating_sub(dec);
                }
            }
            current.push_back(split);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }
        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, parts: &VecDeque<&str>, separator: &str) {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
