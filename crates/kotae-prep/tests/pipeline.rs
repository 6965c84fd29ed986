use std::collections::HashMap;
use std::fs;
use std::path::Path;

use kotae_core::config::{Paths, PrepareConfig, Split};
use kotae_core::store::{RecordReader, check_shape};
use kotae_core::types::EncodedFeature;
use kotae_prep::{inspect_store, prepare, run_evaluation};

const TRAIN: &str = r#"{"data": [{"paragraphs": [{
    "context": "Paris is the capital of France.",
    "segmented_context": ["Paris", "is", "the", "capital", "of", "France", "."],
    "qas": [
        {"id": "t-1", "question": "What is the capital of France?",
         "segmented_question": ["What", "is", "the", "capital", "of", "France", "?"],
         "answers": [{"text": "Paris", "answer_span": [0, 0]}]},
        {"id": "t-2", "question": "Where is Paris?",
         "segmented_question": ["Where", "is", "Paris", "?"],
         "answers": [{"text": "France", "answer_span": [5, 5]}]},
        {"id": "t-3", "question": "What is Paris?",
         "segmented_question": ["What", "is", "Paris", "?"],
         "answers": [{"text": "the capital of France", "answer_span": [2, 5]}]}
    ]
}]}]}"#;

const DEV: &str = r#"{"data": [{"paragraphs": [{
    "context": "Rome is in Italy.",
    "segmented_context": ["Rome", "is", "in", "Italy", "."],
    "qas": [
        {"id": "d-1", "question": "Where is Rome?",
         "segmented_question": ["Where", "is", "Rome", "?"],
         "answers": [{"text": "Italy", "answer_span": [3, 3]},
                     {"text": "in Italy", "answer_span": [2, 3]}]}
    ]
}]}]}"#;

const TEST: &str = r#"{"data": [{"paragraphs": [{
    "context": "Tokyo is large.",
    "segmented_context": ["Tokyo", "is", "large", "."],
    "qas": [
        {"id": "x-1", "question": "Is Tokyo large?",
         "segmented_question": ["Is", "Tokyo", "large", "?"],
         "answers": [{"text": "large", "answer_span": [2, 2]}]}
    ]
}]}]}"#;

fn write_corpora(dir: &Path) -> Paths {
    let paths = Paths::under(dir);
    fs::write(&paths.train_file, TRAIN).unwrap();
    fs::write(&paths.dev_file, DEV).unwrap();
    fs::write(&paths.test_file, TEST).unwrap();
    paths
}

fn config(paths: Paths) -> PrepareConfig {
    PrepareConfig::new()
        .with_limits(400, 50, 1)
        .with_vec_size(4)
        .with_seed(7)
        .with_paths(paths)
}

fn read_records(path: &Path) -> Vec<EncodedFeature> {
    RecordReader::open(path)
        .unwrap()
        .collect::<kotae_core::Result<_>>()
        .unwrap()
}

#[test]
fn prepare_writes_stores_and_side_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = config(write_corpora(dir.path()));
    let paths = &config.paths;

    let report = prepare(&config, false).unwrap();
    // The third train question has an answer span longer than the limit.
    assert_eq!(report.train.total, 3);
    assert_eq!(report.dev.total, 1);
    assert_eq!(report.test.total, 1);

    let train = read_records(&paths.train_record_file);
    assert_eq!(train.len(), 2);
    for feature in &train {
        check_shape(feature, &config.limits(Split::Train), config.char_row_width()).unwrap();
    }

    // Word indices map back to the original tokens.
    let dictionary: HashMap<String, i32> =
        serde_json::from_str(&fs::read_to_string(&paths.word_dictionary).unwrap()).unwrap();
    let inverse: HashMap<i32, String> = dictionary.into_iter().map(|(t, i)| (i, t)).collect();
    let first = train.iter().find(|f| f.id == 1).unwrap();
    let tokens: Vec<&str> = first
        .context_idxs
        .iter()
        .take_while(|&&i| i != 0)
        .map(|i| inverse[i].as_str())
        .collect();
    assert_eq!(tokens, ["Paris", "is", "the", "capital", "of", "France", "."]);
    assert_eq!(first.y1[0], 1.0);
    let second = train.iter().find(|f| f.id == 2).unwrap();
    assert_eq!(second.y2[5], 1.0);

    let test = read_records(&paths.test_record_file);
    assert_eq!(test[0].context_idxs.len(), config.test_para_limit);

    assert!(!paths.train_meta.exists());
    assert_eq!(fs::read_to_string(&paths.dev_meta).unwrap(), r#"{"total":1}"#);

    let word_emb: Vec<Vec<f32>> =
        serde_json::from_str(&fs::read_to_string(&paths.word_emb_file).unwrap()).unwrap();
    assert_eq!(word_emb.len(), report.word_vocab);
    assert!(word_emb[0].iter().all(|v| *v == 0.0));
    assert!(word_emb[1].iter().all(|v| *v == 0.0));
    assert_eq!(word_emb[2].len(), 4);
    assert!(paths.char_emb_file.exists());
    assert!(fs::metadata(&paths.emb_safetensors_file).unwrap().len() > 0);

    let eval: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.train_eval_file).unwrap()).unwrap();
    assert_eq!(eval["3"]["uuid"], "t-3");
}

#[test]
fn evaluate_scores_model_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = config(write_corpora(dir.path()));
    prepare(&config, false).unwrap();

    let predictions = dir.path().join("dev_scores.jsonl");
    fs::write(
        &predictions,
        "{\"id\": 1, \"start_scores\": [0, 0, 5, 0, 0, 9], \"end_scores\": [0, 0, 0, 5, 0, 9]}\n",
    )
    .unwrap();

    let report = run_evaluation(
        config.paths.eval(Split::Dev),
        &predictions,
        &config.paths.answer_file,
        false,
    )
    .unwrap();
    assert_eq!(report.answered, 1);
    assert_eq!(report.metrics.exact_match, 100.0);
    assert_eq!(report.metrics.f1, 100.0);

    let answers: HashMap<String, String> =
        serde_json::from_str(&fs::read_to_string(&config.paths.answer_file).unwrap()).unwrap();
    assert_eq!(answers["d-1"], "in Italy");
}

#[test]
fn word_fallback_skips_char_outputs() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = config(write_corpora(dir.path())).with_char_emb(false);
    let report = prepare(&config, false).unwrap();
    assert_eq!(report.char_vocab, None);
    assert!(!config.paths.char_emb_file.exists());

    let dev = read_records(&config.paths.dev_record_file);
    assert_eq!(dev[0].context_char_idxs, dev[0].context_idxs);

    let stats = inspect_store(
        &config.paths.dev_record_file,
        &config.limits(Split::Dev),
        config.char_row_width(),
        1,
    )
    .unwrap();
    assert_eq!(stats.records, 1);
    assert_eq!(stats.shape_errors, 0);
    assert!(stats.batch_dims.contains(&("context_char_idxs".to_string(), vec![1, 400])));
}

#[test]
fn misaligned_corpus_names_the_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let paths = write_corpora(dir.path());
    fs::write(&paths.dev_file, DEV.replace("\"Italy\", \".\"", "\"Spain\", \".\"")).unwrap();

    let err = prepare(&config(paths), false).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("dev.json"), "{message}");
    assert!(message.contains("Spain"), "{message}");
}

#[test]
fn invalid_config_fails_before_reading() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = PrepareConfig::new()
        .with_vec_size(300)
        .with_paths(Paths::under(dir.path()));
    let err = prepare(&config, false).unwrap_err();
    assert!(err.to_string().contains("vec_size"));
}
