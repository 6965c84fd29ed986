use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kotae_core::config::Limits;
use kotae_core::eval::SpanDecoder;
use kotae_core::prep::{EmbeddingTable, ExampleEncoder, VocabBuilder};
use kotae_core::types::Example;

const CONTEXT: &str = "The Normans were the people who in the 10th and 11th centuries gave their name \
     to Normandy , a region in France . They were descended from Norse raiders and pirates \
     from Denmark , Iceland and Norway who , under their leader Rollo , agreed to swear \
     fealty to King Charles III of West Francia .";

fn example() -> Example {
    let context_tokens: Vec<String> = CONTEXT.split_whitespace().map(str::to_string).collect();
    let question = "In what country is Normandy located ?";
    Example {
        context_chars: CONTEXT.chars().collect(),
        ques_tokens: question.split_whitespace().map(str::to_string).collect(),
        ques_chars: question.chars().collect(),
        y1s: vec![21],
        y2s: vec![21],
        context_tokens,
        id: 1,
    }
}

fn bench_encode(c: &mut Criterion) {
    let example = example();
    let mut builder = VocabBuilder::new();
    builder.add_context(&example.context_tokens, 1);
    builder.add_question(&example.ques_tokens);
    let vocab = builder.freeze();
    let words = EmbeddingTable::random(&vocab.words, -1, 50, 13).unwrap();
    let chars = EmbeddingTable::random(&vocab.chars, -1, 20, 13).unwrap();
    let limits = Limits {
        para: 400,
        ques: 50,
        ans: 30,
        char: 16,
    };

    let grid = ExampleEncoder::new(&words, &chars, limits, true);
    c.bench_function("encode_char_grid", |b| {
        b.iter(|| grid.encode(black_box(&example)));
    });

    let fallback = ExampleEncoder::new(&words, &chars, limits, false);
    c.bench_function("encode_word_fallback", |b| {
        b.iter(|| fallback.encode(black_box(&example)));
    });
}

fn bench_decode(c: &mut Criterion) {
    let decoder = SpanDecoder::new();
    let start: Vec<f32> = (0..400).map(|i| ((i * 37) % 101) as f32 / 10.0).collect();
    let end: Vec<f32> = (0..400).map(|i| ((i * 53) % 97) as f32 / 10.0).collect();

    c.bench_function("decode_span_400", |b| {
        b.iter(|| decoder.decode(black_box(&start), black_box(&end), 350).unwrap());
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
