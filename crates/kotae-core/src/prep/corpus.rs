//! # Corpus Loader
//!
//! Reads a segmented span-extraction corpus:
//!
//! ```json
//! {"data": [{"paragraphs": [{
//!     "context": "...", "segmented_context": ["..."],
//!     "qas": [{"id": "...", "question": "...", "segmented_question": ["..."],
//!              "answers": [{"text": "...", "answer_span": [start, end]}]}]
//! }]}]}
//! ```
//!
//! One pass yields the examples, their eval records and the vocabulary
//! counts.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::error::Result;
use crate::prep::aligner::align_spans;
use crate::prep::vocab::VocabBuilder;
use crate::types::{EvalFile, EvalRecord, Example};

#[derive(Debug, Deserialize)]
pub struct RawCorpus {
    pub data: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
pub struct RawArticle {
    pub paragraphs: Vec<RawParagraph>,
}

#[derive(Debug, Deserialize)]
pub struct RawParagraph {
    pub context: String,
    pub segmented_context: Vec<String>,
    pub qas: Vec<RawQa>,
}

#[derive(Debug, Deserialize)]
pub struct RawQa {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub question: String,
    pub segmented_question: Vec<String>,
    pub answers: Vec<RawAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct RawAnswer {
    pub text: String,
    /// Token positions; the first is the start, the last the end.
    pub answer_span: Vec<usize>,
}

/// Dataset question ids are usually strings, some corpora use integers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Examples and eval records of one corpus file.
#[derive(Debug, Default)]
pub struct CorpusExamples {
    pub examples: Vec<Example>,
    pub eval: EvalFile,
}

/// Load and process a corpus file.
///
/// # Errors
///
/// Any failure (unreadable file, malformed JSON, alignment mismatch) is
/// wrapped in [`KotaeError::Corpus`](crate::KotaeError::Corpus) naming `path`.
pub fn process_file(path: &Path, vocab: &mut VocabBuilder) -> Result<CorpusExamples> {
    let processed = read_corpus(path)
        .and_then(|corpus| process_corpus(&corpus, vocab))
        .map_err(|e| e.in_corpus(path))?;
    info!(
        path = %path.display(),
        examples = processed.examples.len(),
        "Processed corpus"
    );
    Ok(processed)
}

/// Parse a corpus file without processing it.
pub fn read_corpus(path: &Path) -> Result<RawCorpus> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Traverse a parsed corpus, counting vocabulary and building examples.
///
/// Ids start at 1 and follow encounter order. A question without any
/// usable answer is skipped and takes no id.
pub fn process_corpus(corpus: &RawCorpus, vocab: &mut VocabBuilder) -> Result<CorpusExamples> {
    let mut out = CorpusExamples::default();
    let mut next_id = 0u64;

    for article in &corpus.data {
        for para in &article.paragraphs {
            let spans = align_spans(&para.context, &para.segmented_context)?;
            let context_chars: Vec<char> = para.context.chars().collect();
            vocab.add_context(&para.segmented_context, para.qas.len());

            for qa in &para.qas {
                vocab.add_question(&qa.segmented_question);

                let mut y1s = Vec::with_capacity(qa.answers.len());
                let mut y2s = Vec::with_capacity(qa.answers.len());
                let mut answer_texts = Vec::with_capacity(qa.answers.len());
                for answer in &qa.answers {
                    if let (Some(&start), Some(&end)) =
                        (answer.answer_span.first(), answer.answer_span.last())
                    {
                        y1s.push(start);
                        y2s.push(end);
                    }
                    answer_texts.push(answer.text.clone());
                }
                if y1s.is_empty() {
                    warn!(question = %qa.id, "Skipping question without answer spans");
                    continue;
                }

                next_id += 1;
                out.examples.push(Example {
                    context_tokens: para.segmented_context.clone(),
                    context_chars: context_chars.clone(),
                    ques_tokens: qa.segmented_question.clone(),
                    ques_chars: qa.question.chars().collect(),
                    y1s,
                    y2s,
                    id: next_id,
                });
                out.eval.insert(
                    next_id,
                    EvalRecord {
                        context: para.context.clone(),
                        spans: spans.clone(),
                        answers: answer_texts,
                        uuid: qa.id.clone(),
                    },
                );
            }
        }
    }

    Ok(out)
}

/// Deterministic Fisher-Yates shuffle.
pub fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = oorandom::Rand64::new(seed as u128);
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KotaeError;

    const CORPUS: &str = r#"{
        "data": [{
            "title": "ignored",
            "paragraphs": [{
                "context": "Paris is the capital of France.",
                "segmented_context": ["Paris", "is", "the", "capital", "of", "France", "."],
                "qas": [
                    {"id": "q1", "question": "What is the capital?",
                     "segmented_question": ["What", "is", "the", "capital", "?"],
                     "answers": [{"text": "Paris", "answer_span": [0, 0]}]},
                    {"id": 17, "question": "Capital of what?",
                     "segmented_question": ["Capital", "of", "what", "?"],
                     "answers": [{"text": "France", "answer_span": [5, 5]},
                                 {"text": "of France", "answer_span": [4, 5]}]},
                    {"id": "q3", "question": "Unanswerable?",
                     "segmented_question": ["Unanswerable", "?"],
                     "answers": []}
                ]
            }]
        }]
    }"#;

    fn load() -> (CorpusExamples, crate::prep::vocab::Vocabulary) {
        let corpus: RawCorpus = serde_json::from_str(CORPUS).unwrap();
        let mut vocab = VocabBuilder::new();
        let out = process_corpus(&corpus, &mut vocab).unwrap();
        (out, vocab.freeze())
    }

    #[test]
    fn builds_examples_with_sequential_ids() {
        let (out, _) = load();
        assert_eq!(out.examples.len(), 2);
        assert_eq!(out.examples[0].id, 1);
        assert_eq!(out.examples[1].id, 2);
        assert_eq!(out.examples[1].y1s, vec![5, 4]);
        assert_eq!(out.examples[1].y2s, vec![5, 5]);
        assert_eq!(out.examples[0].context_chars.len(), 31);
        assert_eq!(out.examples[0].ques_chars.len(), 20);
    }

    #[test]
    fn builds_eval_records() {
        let (out, _) = load();
        let rec = &out.eval[&2];
        assert_eq!(rec.uuid, "17");
        assert_eq!(rec.answers, vec!["France", "of France"]);
        assert_eq!(rec.spans.len(), 7);
        assert_eq!(rec.answer_text(5, 5), "France");
        assert!(!out.eval.contains_key(&3));
    }

    #[test]
    fn counts_context_per_question() {
        let (_, vocab) = load();
        // three questions in the paragraph, plus one in a question
        assert_eq!(vocab.words.get("Paris"), Some(3));
        assert_eq!(vocab.words.get("capital"), Some(4));
        assert_eq!(vocab.words.get("Unanswerable"), Some(1));
    }

    #[test]
    fn alignment_failure_aborts() {
        let corpus: RawCorpus = serde_json::from_str(
            r#"{"data": [{"paragraphs": [{"context": "abc", "segmented_context": ["abd"], "qas": []}]}]}"#,
        )
        .unwrap();
        let mut vocab = VocabBuilder::new();
        let err = process_corpus(&corpus, &mut vocab).unwrap_err();
        assert!(matches!(err, KotaeError::Alignment { .. }));
    }

    #[test]
    fn process_file_names_the_file_on_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"data\": 5}").unwrap();
        let mut vocab = VocabBuilder::new();
        let err = process_file(&path, &mut vocab).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn shuffle_is_deterministic_permutation() {
        let mut a: Vec<u32> = (0..50).collect();
        let mut b = a.clone();
        shuffle(&mut a, 9);
        shuffle(&mut b, 9);
        assert_eq!(a, b);
        assert_ne!(a, (0..50).collect::<Vec<_>>());
        a.sort_unstable();
        assert_eq!(a, (0..50).collect::<Vec<_>>());
    }
}
