#![allow(dead_code)]

use pad_changeset::{deserialize_ops, make_atext, AText, AttributePool, Changeset};
use pad_changeset::fuzzer::Fuzzer;

pub fn cs(s: &str) -> Changeset {
    Changeset::parse(s).unwrap_or_else(|e| panic!("{s:?}: {e}"))
}

/// A random document ending in a newline.
pub fn random_doc(fuzzer: &mut Fuzzer) -> String {
    format!("{}\n", fuzzer.random_multiline(10, 20))
}

/// A random document whose attribution carries attributes from the fuzzer's
/// two-property pool, made by applying a random attributed changeset to a
/// plain document.
pub fn random_atext(fuzzer: &mut Fuzzer, pool: &mut AttributePool) -> AText {
    let start = make_atext(&random_doc(fuzzer), None);
    let (seed_cs, _) = fuzzer.random_changeset(&start.text, true);
    pad_changeset::apply_to_atext(&seed_cs, &start, pool).unwrap()
}

/// The sorted attribute pairs of every character of an attribution string.
/// Independent of how runs are split into ops.
pub fn char_attribs(attribution: &str, pool: &AttributePool) -> Vec<Vec<(String, String)>> {
    let mut out = Vec::new();
    for op in deserialize_ops(attribution) {
        let op = op.unwrap();
        let mut pairs: Vec<(String, String)> = op
            .attribs
            .resolve(pool)
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.sort();
        for _ in 0..op.chars {
            out.push(pairs.clone());
        }
    }
    out
}

pub fn assert_same_atext(actual: &AText, expected: &AText, pool: &AttributePool) {
    assert_eq!(actual.text, expected.text);
    assert_eq!(
        char_attribs(&actual.attribs, pool),
        char_attribs(&expected.attribs, pool),
        "attribution {:?} vs {:?}",
        actual.attribs,
        expected.attribs
    );
}
